//! Nodes and their shared core.
//!
//! A node type embeds a [`NodeCore`] and implements [`Node`]. The core carries
//! what the coordinator checks at wiring time (subscriptions, services,
//! attributes and capability methods) and, once wired, the outbound edges that
//! [`NodeCore::broadcast`] fans a message out to.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::coordinator::ExitFlag;
use crate::core::error::{BroadcastError, NodeError, WiringError};
use crate::core::message::Message;
use crate::core::subscription::{Edge, Inbox, Subscription, DEFAULT_SERVICE};
use crate::core::{short_type_name, AsAny, TypeTag};

/// A unit of work in the dataflow graph.
///
/// A node owns a [`NodeCore`] holding its declared subscriptions, services and
/// capabilities, and implements up to four hooks that the
/// [`Coordinator`](crate::Coordinator) drives in order:
/// 1. **Take**: fetch the concrete [`Inbox`] handles for bound subscriptions (sync, exactly once)
/// 2. **Setup**: acquire resources; every node's setup finishes before any loop starts
/// 3. **Run**: the node's main loop, until it returns, fails or is cancelled
/// 4. **Teardown**: release resources; always called once setup has been attempted
///
/// All hooks of all nodes are multiplexed on one task. A `run` that never
/// reaches an `.await` starves every other node.
#[async_trait]
pub trait Node: AsAny + Send {
    fn core(&self) -> &NodeCore;

    fn core_mut(&mut self) -> &mut NodeCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn is_enabled(&self) -> bool {
        self.core().is_enabled()
    }

    /// The implementing type's name, used by producer-type constraints.
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Store whatever inboxes this node needs, via [`NodeCore::take_inbox`].
    fn take(&mut self) {}

    async fn setup(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// The node's main loop. The default never returns, so a node without a
    /// loop of its own never ends the run.
    async fn run(&mut self) -> Result<(), NodeError> {
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), NodeError> {
        Ok(())
    }
}

pub(crate) fn node_type_tag(node: &dyn Node) -> TypeTag {
    TypeTag::from_parts(node.as_any().type_id(), node.type_name())
}

struct InboundSlot {
    subscription: Subscription,
    producer: Option<String>,
    inbox: Option<Inbox>,
}

/// Identity, declarations and bound edges of one node.
pub struct NodeCore {
    name: String,
    enabled: bool,
    inbound: Vec<InboundSlot>,
    services: BTreeMap<String, Option<TypeTag>>,
    attributes: BTreeSet<String>,
    methods: BTreeSet<String>,
    outbound: Vec<Arc<Edge>>,
    taken: bool,
    exit: ExitFlag,
}

impl NodeCore {
    /// Creates an enabled core that offers the default service.
    ///
    /// # Arguments
    /// * `name` - The node's name, used in logs, wiring errors and run reports
    pub fn new(name: impl Into<String>) -> Self {
        let mut services = BTreeMap::new();
        services.insert(DEFAULT_SERVICE.to_string(), None);
        Self {
            name: name.into(),
            enabled: true,
            inbound: Vec::new(),
            services,
            attributes: BTreeSet::new(),
            methods: BTreeSet::new(),
            outbound: Vec::new(),
            taken: false,
            exit: ExitFlag::new(),
        }
    }

    /// A core named after the node type `N`.
    pub fn named_after<N: ?Sized + 'static>() -> Self {
        Self::new(short_type_name(std::any::type_name::<N>()))
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the node takes part in wiring and the lifecycle.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled node is inert: it is never wired and none of its hooks run.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Declares an inbound edge slot. Tags are unique per node.
    pub fn declare_subscription(
        &mut self,
        subscription: Subscription,
    ) -> Result<&Subscription, WiringError> {
        if self.slot(subscription.tag()).is_some() {
            return Err(WiringError::DuplicateTag {
                node: self.name.clone(),
                tag: subscription.tag().to_string(),
            });
        }
        if subscription.has_conflicting_mode() {
            return Err(WiringError::CallbackWithCapacity {
                tag: subscription.tag().to_string(),
            });
        }
        log::debug!("{} declares subscription {:?}", self.name, subscription);
        self.inbound.push(InboundSlot {
            subscription,
            producer: None,
            inbox: None,
        });
        Ok(&self.inbound[self.inbound.len() - 1].subscription)
    }

    /// Declares an outbound service and, optionally, the message type it carries.
    pub fn declare_service(&mut self, name: impl Into<String>, message_type: Option<TypeTag>) {
        self.services.insert(name.into(), message_type);
    }

    /// Advertises an attribute that subscriptions may require of this producer.
    pub fn provide_attribute(&mut self, attribute: impl Into<String>) {
        self.attributes.insert(attribute.into());
    }

    /// Advertises a method that subscriptions may require of this producer.
    pub fn provide_method(&mut self, method: impl Into<String>) {
        self.methods.insert(method.into());
    }

    /// Declared subscriptions, in declaration order.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.inbound.iter().map(|slot| &slot.subscription)
    }

    /// The subscription declared under `tag`, if any.
    pub fn subscription(&self, tag: &str) -> Option<&Subscription> {
        self.slot(tag).map(|slot| &slot.subscription)
    }

    /// Whether the node offers `service`.
    pub fn has_service(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    /// The message type advertised for `service`. `None` when unknown or undeclared.
    pub fn service_type(&self, service: &str) -> Option<TypeTag> {
        self.services.get(service).copied().flatten()
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Whether the node declared `attribute`. Checked against a subscription's `require_attr`.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Whether the node declared the capability `method`.
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    /// True once the coordinator has bound `tag` to a producer.
    pub fn is_subscribed(&self, tag: &str) -> bool {
        self.slot(tag).is_some_and(|slot| slot.producer.is_some())
    }

    /// The producer bound to `tag`, if any.
    pub fn producer_of(&self, tag: &str) -> Option<&str> {
        self.slot(tag).and_then(|slot| slot.producer.as_deref())
    }

    /// Hands out the inbox for a bound channel-mode subscription, once.
    pub fn take_inbox(&mut self, tag: &str) -> Option<Inbox> {
        self.inbound
            .iter_mut()
            .find(|slot| slot.subscription.tag() == tag)
            .and_then(|slot| slot.inbox.take())
    }

    /// Edges for which this node is the producer, in wiring order.
    pub fn outbound_edges(&self) -> &[Arc<Edge>] {
        &self.outbound
    }

    /// The run-wide exit flag. Set when the coordinator starts halting.
    pub fn exit_flag(&self) -> &ExitFlag {
        &self.exit
    }

    /// Offers `message` to every enabled edge bound on `service`, in wiring order.
    ///
    /// Each edge converts from the original message and type-checks its own
    /// copy. A full bounded channel suspends the caller until the consumer
    /// makes room. An error on one edge leaves earlier deliveries in place.
    /// Returns the number of matched edges.
    pub async fn broadcast(
        &self,
        message: &dyn Message,
        service: &str,
    ) -> Result<usize, BroadcastError> {
        let mut matched = 0;
        for edge in self.matching(service) {
            let outgoing = edge.prepare(message)?;
            edge.deliver(outgoing).await?;
            matched += 1;
        }
        log::trace!(
            "{} broadcast {} on '{}' to {} edge(s)",
            self.name,
            message.log_summary(),
            service,
            matched
        );
        Ok(matched)
    }

    /// Like [`broadcast`](Self::broadcast), but never waits: a full bounded
    /// channel drops the message (logged) or fails, per the edge's overflow policy.
    pub fn broadcast_nowait(
        &self,
        message: &dyn Message,
        service: &str,
    ) -> Result<usize, BroadcastError> {
        let mut matched = 0;
        for edge in self.matching(service) {
            let outgoing = edge.prepare(message)?;
            edge.deliver_nowait(outgoing)?;
            matched += 1;
        }
        Ok(matched)
    }

    fn matching<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a Arc<Edge>> {
        self.outbound
            .iter()
            .filter(move |edge| edge.is_enabled() && edge.service() == service)
    }

    fn slot(&self, tag: &str) -> Option<&InboundSlot> {
        self.inbound.iter().find(|slot| slot.subscription.tag() == tag)
    }

    pub(crate) fn is_bound(&self, tag: &str) -> bool {
        self.is_subscribed(tag)
    }

    pub(crate) fn bind_outbound(&mut self, edge: Arc<Edge>) {
        self.outbound.push(edge);
    }

    pub(crate) fn bind_inbound(&mut self, tag: &str, producer: &str, inbox: Option<Inbox>) {
        if let Some(slot) = self
            .inbound
            .iter_mut()
            .find(|slot| slot.subscription.tag() == tag)
        {
            slot.producer = Some(producer.to_string());
            slot.inbox = inbox;
        }
    }

    /// Marks the core as taken for this run and installs the run's exit flag.
    pub(crate) fn begin_take(&mut self, exit: ExitFlag) -> Result<(), WiringError> {
        if self.taken {
            return Err(WiringError::AlreadyTaken {
                node: self.name.clone(),
            });
        }
        self.taken = true;
        self.exit = exit;
        Ok(())
    }
}

impl std::fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCore")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field(
                "subscriptions",
                &self.subscriptions().map(Subscription::tag).collect::<Vec<_>>(),
            )
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("outbound", &self.outbound.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subscription::{converter, OverflowPolicy};
    use std::time::Duration;
    use tokio::time::timeout;

    crate::message! {
        pub struct Reading {
            pub value: f64,
        }
    }

    crate::message! {
        pub struct Scaled {
            pub value: f64,
        }
    }

    fn reading(value: f64) -> Reading {
        Reading {
            value,
            ..Default::default()
        }
    }

    struct Sensor {
        core: NodeCore,
    }

    impl Node for Sensor {
        fn core(&self) -> &NodeCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }
    }

    /// Binds `sub` from `producer` and returns the consumer side.
    fn wire(producer: &mut NodeCore, sub: Subscription, convert: Option<crate::Converter>) -> Option<Inbox> {
        let (edge, inbox) = Edge::bind(&sub, sub.requested_service(), producer.name(), "consumer", convert);
        producer.bind_outbound(edge);
        inbox
    }

    #[test]
    fn test_default_name_and_service() {
        let sensor = Sensor {
            core: NodeCore::named_after::<Sensor>(),
        };
        assert_eq!(sensor.name(), "Sensor");
        assert_eq!(sensor.type_name(), "Sensor");
        assert!(sensor.is_enabled());
        assert!(sensor.core().has_service(DEFAULT_SERVICE));
        assert_eq!(node_type_tag(&sensor), TypeTag::of::<Sensor>());
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let mut core = NodeCore::new("fusion");
        core.declare_subscription(Subscription::new("imu")).unwrap();
        match core.declare_subscription(Subscription::new("imu").capacity(3)) {
            Err(WiringError::DuplicateTag { node, tag }) => {
                assert_eq!(node, "fusion");
                assert_eq!(tag, "imu");
            }
            other => panic!("expected duplicate tag error, got {:?}", other.map(|s| s.tag().to_string())),
        }
        assert_eq!(core.subscriptions().count(), 1);
    }

    #[test]
    fn test_callback_with_capacity_is_rejected() {
        let mut core = NodeCore::new("n");
        let result = core.declare_subscription(Subscription::new("x").capacity(2).callback(|_| Ok(())));
        assert!(matches!(result, Err(WiringError::CallbackWithCapacity { .. })));
    }

    #[test]
    fn test_declared_is_not_subscribed() {
        let mut core = NodeCore::new("n");
        core.declare_subscription(Subscription::new("in")).unwrap();
        assert!(!core.is_subscribed("in"));
        core.bind_inbound("in", "p", None);
        assert!(core.is_subscribed("in"));
        assert_eq!(core.producer_of("in"), Some("p"));
        assert!(!core.is_subscribed("other"));
    }

    #[tokio::test]
    async fn test_broadcast_fans_out_to_matching_service_only() {
        let mut producer = NodeCore::new("camera");
        producer.declare_service("raw", None);
        let mut inboxes: Vec<Inbox> = (0..3)
            .map(|i| wire(&mut producer, Subscription::new(format!("in{i}")), None).unwrap())
            .collect();
        let mut raw = wire(&mut producer, Subscription::new("raw").service("raw"), None).unwrap();

        assert_eq!(producer.broadcast(&reading(1.0), DEFAULT_SERVICE).await.unwrap(), 3);
        for inbox in &mut inboxes {
            assert_eq!(inbox.recv_as::<Reading>().await.unwrap().value, 1.0);
        }
        assert!(raw.try_recv().is_none());

        assert_eq!(producer.broadcast(&reading(2.0), "unknown").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disabled_edge_is_skipped() {
        let mut producer = NodeCore::new("p");
        let mut live = wire(&mut producer, Subscription::new("a"), None).unwrap();
        let mut muted = wire(&mut producer, Subscription::new("b"), None).unwrap();
        muted.set_enabled(false);

        assert_eq!(producer.broadcast_nowait(&reading(1.0), DEFAULT_SERVICE).unwrap(), 1);
        assert!(live.try_recv().is_some());
        assert!(muted.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_conversions_start_from_the_original() {
        let mut producer = NodeCore::new("p");
        let scale = converter(|r: &Reading| Scaled {
            value: r.value * 10.0,
            ..Default::default()
        });
        let mut converted = wire(
            &mut producer,
            Subscription::new("a").message_type::<Scaled>(),
            Some(scale.clone()),
        )
        .unwrap();
        let mut plain = wire(&mut producer, Subscription::new("b").message_type::<Reading>(), None).unwrap();
        let mut converted_again = wire(&mut producer, Subscription::new("c"), Some(scale)).unwrap();

        let original = reading(1.5);
        assert_eq!(producer.broadcast(&original, DEFAULT_SERVICE).await.unwrap(), 3);
        assert_eq!(converted.recv_as::<Scaled>().await.unwrap().value, 15.0);
        assert_eq!(plain.recv_as::<Reading>().await.unwrap().value, 1.5);
        assert_eq!(converted_again.recv_as::<Scaled>().await.unwrap().value, 15.0);
        assert_eq!(original.value, 1.5);
    }

    #[tokio::test]
    async fn test_failure_on_later_edge_keeps_earlier_deliveries() {
        let mut producer = NodeCore::new("p");
        let mut first = wire(&mut producer, Subscription::new("a"), None).unwrap();
        let mut strict = wire(&mut producer, Subscription::new("b").message_type::<Scaled>(), None).unwrap();
        let mut third = wire(&mut producer, Subscription::new("c"), None).unwrap();

        let err = producer.broadcast(&reading(1.0), DEFAULT_SERVICE).await.unwrap_err();
        assert!(matches!(err, BroadcastError::TypeMismatch { .. }));
        assert!(first.try_recv().is_some());
        assert!(strict.try_recv().is_none());
        assert!(third.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_blocking_broadcast_applies_backpressure() {
        let mut producer = NodeCore::new("p");
        let mut inbox = wire(
            &mut producer,
            Subscription::new("in")
                .capacity(1)
                .overflow_policy(OverflowPolicy::Error)
                .message_type::<Reading>(),
            None,
        )
        .unwrap();

        assert_eq!(producer.broadcast(&reading(1.0), DEFAULT_SERVICE).await.unwrap(), 1);

        let second_reading = reading(2.0);
        let second = producer.broadcast(&second_reading, DEFAULT_SERVICE);
        tokio::pin!(second);
        assert!(timeout(Duration::from_millis(20), &mut second).await.is_err());

        assert_eq!(inbox.recv_as::<Reading>().await.unwrap().value, 1.0);
        assert_eq!(second.await.unwrap(), 1);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox.recv_as::<Reading>().await.unwrap().value, 2.0);
    }

    #[tokio::test]
    async fn test_nowait_broadcast_drops_or_raises_when_full() {
        let mut producer = NodeCore::new("p");
        let mut dropping = wire(
            &mut producer,
            Subscription::new("drop").capacity(1).overflow_policy(OverflowPolicy::DropAndLog),
            None,
        )
        .unwrap();
        assert_eq!(producer.broadcast_nowait(&reading(1.0), DEFAULT_SERVICE).unwrap(), 1);
        assert_eq!(producer.broadcast_nowait(&reading(2.0), DEFAULT_SERVICE).unwrap(), 1);
        assert_eq!(dropping.len(), 1);
        assert_eq!(dropping.recv_as::<Reading>().await.unwrap().value, 1.0);

        let mut strict = NodeCore::new("q");
        let _inbox = wire(
            &mut strict,
            Subscription::new("err").capacity(1).overflow_policy(OverflowPolicy::Error),
            None,
        );
        strict.broadcast_nowait(&reading(1.0), DEFAULT_SERVICE).unwrap();
        assert!(matches!(
            strict.broadcast_nowait(&reading(2.0), DEFAULT_SERVICE),
            Err(BroadcastError::Overflow { .. })
        ));
    }

    #[tokio::test]
    async fn test_nowait_broadcast_drops_under_default_policy() {
        let mut producer = NodeCore::new("p");
        let sub = Subscription::new("in").capacity(1);
        assert_eq!(sub.policy(), OverflowPolicy::Block);
        let mut inbox = wire(&mut producer, sub, None).unwrap();

        assert_eq!(producer.broadcast_nowait(&reading(1.0), DEFAULT_SERVICE).unwrap(), 1);
        assert_eq!(producer.broadcast_nowait(&reading(2.0), DEFAULT_SERVICE).unwrap(), 1);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox.recv_as::<Reading>().await.unwrap().value, 1.0);
    }

    #[test]
    fn test_take_inbox_only_once() {
        let mut core = NodeCore::new("c");
        core.declare_subscription(Subscription::new("in")).unwrap();
        let (_edge, inbox) = Edge::bind(&Subscription::new("in"), DEFAULT_SERVICE, "p", "c", None);
        core.bind_inbound("in", "p", inbox);
        assert!(core.take_inbox("in").is_some());
        assert!(core.take_inbox("in").is_none());
    }

    #[test]
    fn test_begin_take_twice_fails() {
        let mut core = NodeCore::new("c");
        core.begin_take(ExitFlag::new()).unwrap();
        assert!(matches!(
            core.begin_take(ExitFlag::new()),
            Err(WiringError::AlreadyTaken { .. })
        ));
    }
}
