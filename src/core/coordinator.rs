//! The coordinator: registers nodes, wires subscriptions and drives the run.
//!
//! A run goes through take, setup, run and teardown. Each phase is a barrier:
//! every enabled node (plus the coordinator's [`Supervisor`]) finishes one
//! phase before the next starts. The run phase ends per [`CompletionPolicy`],
//! on [`HaltHandle::halt`], or on ctrl-c when interrupt handling is enabled.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use uuid::Uuid;

use crate::core::config::{CompletionPolicy, CoordinatorConfig};
use crate::core::describe_tags;
use crate::core::error::{NodeError, RunError, TaskFailure, WiringError};
use crate::core::message::now_secs;
use crate::core::node::{node_type_tag, Node};
use crate::core::subscription::{Converter, Edge, Subscription};
use crate::core::telemetry::{Phase, TaskOutcome, Telemetry, TraceEntry};
use crate::core::validation::ValidationResult;

/// Run-wide shutdown flag shared by the coordinator and every node.
#[derive(Debug, Clone)]
pub struct ExitFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl ExitFlag {
    /// A flag that is not yet set.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn set(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the run has been told to stop.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the flag is set. Safe to race against inbox reads in `select!`.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // the sender outlives `rx`, so this only returns once the flag is set
        let _ = rx.wait_for(|set| *set).await;
    }
}

impl Default for ExitFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle that asks a running coordinator to halt.
#[derive(Debug, Clone)]
pub struct HaltHandle {
    exit: ExitFlag,
}

impl HaltHandle {
    /// Idempotent.
    pub fn halt(&self) {
        self.exit.set();
    }

    /// Whether a halt has been requested, by this handle or otherwise.
    pub fn is_halted(&self) -> bool {
        self.exit.is_set()
    }
}

/// Handle to a registered node. Only [`Coordinator::add_node`] hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Registration order of the node, starting at 0.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Wiring,
    Setup,
    Running,
    Halting,
    Done,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordinatorState::Idle => "idle",
            CoordinatorState::Wiring => "wiring",
            CoordinatorState::Setup => "in setup",
            CoordinatorState::Running => "running",
            CoordinatorState::Halting => "halting",
            CoordinatorState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why the running phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// First-to-finish: the named loop returned or failed.
    TaskFinished(String),
    /// All-must-finish: every node loop returned or failed.
    AllFinished,
    /// A [`HaltHandle`] was used.
    Halted,
    /// Ctrl-c, with interrupt handling enabled.
    Interrupted,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::TaskFinished(name) => write!(f, "'{}' finished", name),
            HaltReason::AllFinished => write!(f, "all loops finished"),
            HaltReason::Halted => write!(f, "halt requested"),
            HaltReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Summary of a run that got past setup.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub halt_reason: HaltReason,
    /// Loop outcome per enabled node, then the coordinator's own loop.
    pub outcomes: Vec<(String, TaskOutcome)>,
    pub teardown_failures: Vec<TaskFailure>,
}

impl RunReport {
    /// The run-phase outcome of the node (or supervisor) called `name`.
    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.outcomes
            .iter()
            .find(|(node, _)| node == name)
            .map(|(_, outcome)| outcome)
    }

    /// True when no loop failed and every teardown succeeded.
    pub fn is_clean(&self) -> bool {
        self.teardown_failures.is_empty() && !self.outcomes.iter().any(|(_, o)| o.is_failure())
    }
}

/// The coordinator's own lifecycle hooks, run alongside the nodes'.
#[async_trait]
pub trait Supervisor: Send {
    async fn setup(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Never returns by default, so it never ends a first-to-finish run.
    async fn run(&mut self, exit: ExitFlag) -> Result<(), NodeError> {
        let _ = exit;
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), NodeError> {
        Ok(())
    }
}

/// A supervisor with no behaviour of its own.
pub struct IdleSupervisor;

impl Supervisor for IdleSupervisor {}

type Pending<'a> = FuturesUnordered<BoxFuture<'a, (usize, Result<(), NodeError>)>>;

/// Owns the node graph, wires it, and drives the run lifecycle.
///
/// Every hook of every node is polled on the task that calls [`run`](Self::run).
/// Nothing is spawned; halting drops the unfinished loops at their current `.await`.
pub struct Coordinator {
    config: CoordinatorConfig,
    nodes: Vec<Box<dyn Node>>,
    supervisor: Box<dyn Supervisor>,
    telemetry: Option<Arc<dyn Telemetry>>,
    state: CoordinatorState,
    exit: ExitFlag,
    run_id: Uuid,
    /// Subscribes that were skipped because an endpoint was disabled.
    skipped: Vec<(NodeId, String)>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl Coordinator {
    /// Creates an idle coordinator with a fresh run id and an idle supervisor.
    ///
    /// # Arguments
    /// * `config` - Name, completion policy and run options
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            supervisor: Box::new(IdleSupervisor),
            telemetry: None,
            state: CoordinatorState::Idle,
            exit: ExitFlag::new(),
            run_id: Uuid::new_v4(),
            skipped: Vec::new(),
        }
    }

    /// Replaces the coordinator's own hooks, which run alongside the nodes' hooks.
    pub fn with_supervisor(mut self, supervisor: impl Supervisor + 'static) -> Self {
        self.supervisor = Box::new(supervisor);
        self
    }

    /// Records a trace entry for every hook that finishes.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Identifier stamped on every trace entry of this run.
    pub fn run_id(&self) -> String {
        self.run_id.to_string()
    }

    /// A cloneable handle that can halt the run from inside a node or another task.
    pub fn halt_handle(&self) -> HaltHandle {
        HaltHandle {
            exit: self.exit.clone(),
        }
    }

    /// Requests a halt. Idempotent; a no-op once the run is done.
    pub fn halt(&self) {
        if self.state != CoordinatorState::Done {
            self.exit.set();
        }
    }

    /// Registers a node and returns its handle.
    pub fn add_node(&mut self, node: impl Node + 'static) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    /// Registers an already boxed node.
    ///
    /// # Arguments
    /// * `node` - The node to register; disabled nodes are kept but never wired or run
    ///
    /// # Returns
    /// The handle used to wire the node
    pub fn add_boxed(&mut self, node: Box<dyn Node>) -> NodeId {
        if self.state == CoordinatorState::Idle {
            self.state = CoordinatorState::Wiring;
        }
        let id = NodeId(self.nodes.len());
        log::debug!("Registered node '{}' as {}", node.name(), id);
        self.nodes.push(node);
        id
    }

    /// Registers several boxed nodes, returning their handles in the same order.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = Box<dyn Node>>) -> Vec<NodeId> {
        nodes.into_iter().map(|node| self.add_boxed(node)).collect()
    }

    /// The first registered node with this name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name() == name).map(NodeId)
    }

    /// The node registered as `id`.
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id.0).map(|n| &**n)
    }

    /// Mutable access to the node registered as `id`, e.g. to declare more subscriptions before wiring.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn Node + 'static)> {
        self.nodes.get_mut(id.0).map(|n| &mut **n)
    }

    /// Downcasts a registered node to its concrete type.
    pub fn node_as<N: Node + 'static>(&self, id: NodeId) -> Option<&N> {
        self.node(id).and_then(|n| n.as_any().downcast_ref::<N>())
    }

    /// Every registered node, in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &dyn Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), &**n))
    }

    /// Binds `consumer`'s subscription `tag` to `producer` on the service it requested.
    pub fn subscribe(
        &mut self,
        producer: NodeId,
        consumer: NodeId,
        tag: &str,
    ) -> Result<(), WiringError> {
        self.subscribe_with(producer, consumer, tag, None, None)
    }

    /// Like [`subscribe`](Self::subscribe), optionally overriding the service
    /// and converting each message before it enters the edge.
    pub fn subscribe_with(
        &mut self,
        producer: NodeId,
        consumer: NodeId,
        tag: &str,
        service: Option<&str>,
        converter: Option<Converter>,
    ) -> Result<(), WiringError> {
        match self.state {
            CoordinatorState::Idle | CoordinatorState::Wiring => {
                self.state = CoordinatorState::Wiring;
            }
            state => {
                return Err(WiringError::Closed {
                    state: state.to_string(),
                });
            }
        }

        let source = self
            .nodes
            .get(producer.0)
            .ok_or(WiringError::UnknownNode(producer.0))?;
        let sink = self
            .nodes
            .get(consumer.0)
            .ok_or(WiringError::UnknownNode(consumer.0))?;

        if !source.is_enabled() || !sink.is_enabled() {
            log::warn!(
                "Skipping subscription {}.{} <- {}: an endpoint is disabled",
                sink.name(),
                tag,
                source.name()
            );
            self.skipped.push((consumer, tag.to_string()));
            return Ok(());
        }

        let subscription = sink
            .core()
            .subscription(tag)
            .cloned()
            .ok_or_else(|| WiringError::UnknownTag {
                consumer: sink.name().to_string(),
                tag: tag.to_string(),
            })?;
        if let Some(bound) = sink.core().producer_of(tag) {
            return Err(WiringError::AlreadyBound {
                producer: bound.to_string(),
                consumer: sink.name().to_string(),
                tag: tag.to_string(),
            });
        }

        let service = service
            .unwrap_or_else(|| subscription.requested_service())
            .to_string();
        check_producer(&**source, sink.name(), &subscription, &service)?;

        if converter.is_none() && !subscription.message_types().is_empty() {
            if let Some(carried) = source.core().service_type(&service) {
                if !subscription.message_types().contains(&carried) {
                    log::warn!(
                        "Service '{}' of '{}' carries {}, but {}.{} accepts only {}",
                        service,
                        source.name(),
                        carried,
                        sink.name(),
                        tag,
                        describe_tags(subscription.message_types())
                    );
                }
            }
        }

        let producer_name = source.name().to_string();
        let consumer_name = sink.name().to_string();
        let (edge, inbox) = Edge::bind(
            &subscription,
            &service,
            &producer_name,
            &consumer_name,
            converter,
        );
        log::debug!("Wired {:?}", edge);
        self.nodes[producer.0].core_mut().bind_outbound(edge);
        self.nodes[consumer.0]
            .core_mut()
            .bind_inbound(tag, &producer_name, inbox);
        Ok(())
    }

    /// Checks the wired graph without changing it.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (index, node) in self.nodes.iter().enumerate() {
            if !node.is_enabled() {
                continue;
            }
            let core = node.core();
            for subscription in core.subscriptions() {
                let tag = subscription.tag();
                if core.is_subscribed(tag) {
                    continue;
                }
                let skipped = self
                    .skipped
                    .iter()
                    .any(|(id, skipped_tag)| id.0 == index && skipped_tag == tag);
                if skipped {
                    result.add_warning(format!(
                        "'{}.{}' is unbound because its producer is disabled",
                        node.name(),
                        tag
                    ));
                } else if subscription.is_required() {
                    result.add_error(format!(
                        "'{}' requires subscription '{}', which was never wired",
                        node.name(),
                        tag
                    ));
                } else {
                    result.add_warning(format!(
                        "optional subscription '{}.{}' is unbound",
                        node.name(),
                        tag
                    ));
                }
            }

            let has_inbound = core.subscriptions().any(|s| core.is_subscribed(s.tag()));
            if self.nodes.len() > 1 && !has_inbound && core.outbound_edges().is_empty() {
                result.add_warning(format!("'{}' is not connected to any node", node.name()));
            }
        }
        result
    }

    /// Runs the full lifecycle once: take, setup, running, halting, done.
    pub async fn run(&mut self) -> Result<RunReport, RunError> {
        match self.state {
            CoordinatorState::Idle | CoordinatorState::Wiring => {}
            _ => return Err(RunError::AlreadyRun),
        }
        let run_id = self.run_id.to_string();

        if self.config.validate_before_run {
            let validation = self.validate();
            validation.log_summary();
            if !validation.is_safe() {
                self.state = CoordinatorState::Done;
                return Err(RunError::Validation(validation.errors()));
            }
        }

        if self.exit.is_set() {
            log::info!("Run {} halted before it started", run_id);
            self.state = CoordinatorState::Done;
            return Ok(RunReport {
                run_id,
                halt_reason: HaltReason::Halted,
                outcomes: Vec::new(),
                teardown_failures: Vec::new(),
            });
        }

        log::info!(
            "Coordinator '{}' starting run {} with {} node(s)",
            self.config.name,
            run_id,
            self.nodes.len()
        );
        self.take_all()?;

        self.state = CoordinatorState::Setup;
        let setup_failures = self.setup_all().await;
        if !setup_failures.is_empty() {
            self.state = CoordinatorState::Halting;
            self.exit.set();
            self.teardown_all().await;
            self.state = CoordinatorState::Done;
            self.flush();
            return Err(RunError::Setup(setup_failures));
        }

        self.state = CoordinatorState::Running;
        log::info!("All setups finished, running loops");
        let (halt_reason, outcomes) = self.run_all().await;

        self.state = CoordinatorState::Halting;
        log::info!("Halting run {}: {}", run_id, halt_reason);
        let teardown_failures = self.teardown_all().await;
        self.state = CoordinatorState::Done;
        self.flush();
        log::info!("Run {} done", run_id);

        Ok(RunReport {
            run_id,
            halt_reason,
            outcomes,
            teardown_failures,
        })
    }

    fn take_all(&mut self) -> Result<(), WiringError> {
        let run_id = self.run_id.to_string();
        for node in self.nodes.iter_mut().filter(|n| n.is_enabled()) {
            node.core_mut().begin_take(self.exit.clone())?;
            node.take();
            record(&self.telemetry, &run_id, node.name(), Phase::Take, TaskOutcome::Completed);
        }
        Ok(())
    }

    /// Returns the failed or interrupted setups, empty if all succeeded.
    async fn setup_all(&mut self) -> Vec<TaskFailure> {
        let run_id = self.run_id.to_string();
        let telemetry = &self.telemetry;
        let halt = halt_requested(self.exit.clone(), self.config.handle_interrupt);
        tokio::pin!(halt);

        let mut labels = Vec::new();
        let mut pending: Pending<'_> = FuturesUnordered::new();
        for node in self.nodes.iter_mut().filter(|n| n.is_enabled()) {
            let index = labels.len();
            labels.push(node.name().to_string());
            pending.push(Box::pin(async move { (index, node.setup().await) }));
        }
        let index = labels.len();
        labels.push(self.config.name.clone());
        let supervisor = &mut self.supervisor;
        pending.push(Box::pin(async move { (index, supervisor.setup().await) }));

        let mut finished = vec![false; labels.len()];
        let mut failures = Vec::new();
        loop {
            // A halt wins over a setup finishing in the same poll.
            tokio::select! {
                biased;
                reason = &mut halt => {
                    for (index, done) in finished.iter().enumerate() {
                        if *done {
                            continue;
                        }
                        log::error!("Setup of '{}' did not finish: {}", labels[index], reason);
                        failures.push(TaskFailure {
                            node: labels[index].clone(),
                            reason: format!("setup did not finish ({})", reason),
                        });
                        record(telemetry, &run_id, &labels[index], Phase::Setup, TaskOutcome::Cancelled);
                    }
                    break;
                }
                next = pending.next() => {
                    let Some((index, result)) = next else { break };
                    finished[index] = true;
                    let outcome = match result {
                        Ok(()) => TaskOutcome::Completed,
                        Err(err) => {
                            log::error!("Setup of '{}' failed: {:?}", labels[index], err);
                            failures.push(TaskFailure {
                                node: labels[index].clone(),
                                reason: err.to_string(),
                            });
                            TaskOutcome::Failed(err.to_string())
                        }
                    };
                    record(telemetry, &run_id, &labels[index], Phase::Setup, outcome);
                }
            }
        }
        failures
    }

    async fn run_all(&mut self) -> (HaltReason, Vec<(String, TaskOutcome)>) {
        let run_id = self.run_id.to_string();
        let policy = self.config.completion;
        let halt = halt_requested(self.exit.clone(), self.config.handle_interrupt);
        tokio::pin!(halt);

        let mut labels = Vec::new();
        let mut pending: Pending<'_> = FuturesUnordered::new();
        for node in self.nodes.iter_mut().filter(|n| n.is_enabled()) {
            let index = labels.len();
            labels.push(node.name().to_string());
            pending.push(Box::pin(async move { (index, node.run().await) }));
        }
        let node_count = labels.len();
        labels.push(self.config.name.clone());
        let supervisor = &mut self.supervisor;
        let exit = self.exit.clone();
        pending.push(Box::pin(async move { (node_count, supervisor.run(exit).await) }));

        let mut outcomes: Vec<Option<TaskOutcome>> = vec![None; labels.len()];
        let mut remaining = node_count;
        let reason = loop {
            if policy == CompletionPolicy::AllMustFinish && remaining == 0 {
                break HaltReason::AllFinished;
            }
            // Loops often end because the exit flag was set, so the halt is polled first.
            tokio::select! {
                biased;
                reason = &mut halt => break reason,
                next = pending.next() => {
                    let Some((index, result)) = next else { break HaltReason::AllFinished };
                    let outcome = match result {
                        Ok(()) => {
                            log::info!("Loop of '{}' finished", labels[index]);
                            TaskOutcome::Completed
                        }
                        Err(err) => {
                            log::error!("Loop of '{}' failed: {:?}", labels[index], err);
                            TaskOutcome::Failed(err.to_string())
                        }
                    };
                    outcomes[index] = Some(outcome);
                    if index < node_count {
                        remaining -= 1;
                    }
                    if policy == CompletionPolicy::FirstToFinish {
                        break HaltReason::TaskFinished(labels[index].clone());
                    }
                }
            }
        };

        self.exit.set();
        drop(pending);

        let outcomes = labels
            .into_iter()
            .zip(outcomes)
            .map(|(label, outcome)| {
                let outcome = outcome.unwrap_or(TaskOutcome::Cancelled);
                record(&self.telemetry, &run_id, &label, Phase::Run, outcome.clone());
                (label, outcome)
            })
            .collect();
        (reason, outcomes)
    }

    /// Tears down every enabled node and the supervisor, concurrently.
    async fn teardown_all(&mut self) -> Vec<TaskFailure> {
        let run_id = self.run_id.to_string();
        let mut labels = Vec::new();
        let mut tasks: Vec<BoxFuture<'_, Result<(), NodeError>>> = Vec::new();
        for node in self.nodes.iter_mut().filter(|n| n.is_enabled()) {
            labels.push(node.name().to_string());
            tasks.push(node.teardown());
        }
        labels.push(self.config.name.clone());
        tasks.push(self.supervisor.teardown());

        let results = join_all(tasks).await;
        let mut failures = Vec::new();
        for (label, result) in labels.into_iter().zip(results) {
            let outcome = match result {
                Ok(()) => TaskOutcome::Completed,
                Err(err) => {
                    log::error!("Teardown of '{}' failed: {:?}", label, err);
                    failures.push(TaskFailure {
                        node: label.clone(),
                        reason: err.to_string(),
                    });
                    TaskOutcome::Failed(err.to_string())
                }
            };
            record(&self.telemetry, &run_id, &label, Phase::Teardown, outcome);
        }
        failures
    }

    fn flush(&self) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.flush();
        }
    }
}

/// Service, attribute, method and producer-type checks, in that order.
fn check_producer(
    producer: &dyn Node,
    consumer: &str,
    subscription: &Subscription,
    service: &str,
) -> Result<(), WiringError> {
    let core = producer.core();
    let tag = subscription.tag();
    if !core.has_service(service) {
        return Err(WiringError::MissingService {
            producer: producer.name().to_string(),
            consumer: consumer.to_string(),
            tag: tag.to_string(),
            service: service.to_string(),
        });
    }
    if let Some(attribute) = subscription
        .required_attrs()
        .iter()
        .find(|a| !core.has_attribute(a))
    {
        return Err(WiringError::MissingAttribute {
            producer: producer.name().to_string(),
            consumer: consumer.to_string(),
            tag: tag.to_string(),
            attribute: attribute.clone(),
        });
    }
    if let Some(method) = subscription
        .required_methods()
        .iter()
        .find(|m| !core.has_method(m))
    {
        return Err(WiringError::MissingMethod {
            producer: producer.name().to_string(),
            consumer: consumer.to_string(),
            tag: tag.to_string(),
            method: method.clone(),
        });
    }
    let accepted = subscription.producer_types();
    let actual = node_type_tag(producer);
    if !accepted.is_empty() && !accepted.contains(&actual) {
        return Err(WiringError::ProducerType {
            producer: producer.name().to_string(),
            consumer: consumer.to_string(),
            tag: tag.to_string(),
            expected: describe_tags(accepted),
            actual: actual.name().to_string(),
        });
    }
    Ok(())
}

/// Resolves when the exit flag is set or, if enabled, on ctrl-c.
async fn halt_requested(exit: ExitFlag, handle_interrupt: bool) -> HaltReason {
    let interrupt = async {
        if handle_interrupt && tokio::signal::ctrl_c().await.is_ok() {
            return;
        }
        futures::future::pending::<()>().await;
    };
    tokio::select! {
        _ = exit.wait() => HaltReason::Halted,
        _ = interrupt => HaltReason::Interrupted,
    }
}

fn record(
    telemetry: &Option<Arc<dyn Telemetry>>,
    run_id: &str,
    node: &str,
    phase: Phase,
    outcome: TaskOutcome,
) {
    if let Some(telemetry) = telemetry {
        telemetry.record(TraceEntry {
            timestamp: now_secs(),
            run_id: run_id.to_string(),
            node: node.to_string(),
            phase,
            outcome,
        });
    }
}
