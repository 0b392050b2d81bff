//! Subscriptions (consumer-side edge declarations), bound edges, and inboxes.
//!
//! A consumer declares a [`Subscription`] under a tag. When the coordinator
//! wires it to a producer, the declaration becomes an [`Edge`] shared with the
//! producer's outbound set, and (in channel mode) an [`Inbox`] the consumer
//! fetches in its `take` hook.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::core::error::{BroadcastError, NodeError};
use crate::core::message::Message;
use crate::core::{describe_tags, TypeTag};

/// The service every node offers implicitly.
pub const DEFAULT_SERVICE: &str = "default";

/// What a non-blocking send does when a bounded channel is full.
///
/// Blocking sends ignore this and always apply backpressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Backpressure only. A non-blocking send that finds the channel full drops, as with `DropAndLog`.
    #[default]
    Block,
    DropAndLog,
    /// A non-blocking send that finds the channel full fails with `BroadcastError::Overflow`.
    Error,
}

/// Transforms the producer's message into what the consumer expects.
/// Returns `None` when handed a message type it does not understand.
pub type Converter = Arc<dyn Fn(&dyn Message) -> Option<Box<dyn Message>> + Send + Sync>;

/// Invoked synchronously for every message broadcast on a callback-mode edge.
pub type Callback = Arc<dyn Fn(Box<dyn Message>) -> Result<(), NodeError> + Send + Sync>;

/// Builds a [`Converter`] from a typed function.
pub fn converter<A, B, F>(f: F) -> Converter
where
    A: Message + 'static,
    B: Message + 'static,
    F: Fn(&A) -> B + Send + Sync + 'static,
{
    Arc::new(move |message: &dyn Message| {
        message
            .as_any()
            .downcast_ref::<A>()
            .map(|typed| Box::new(f(typed)) as Box<dyn Message>)
    })
}

/// How an edge hands messages to its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Queue into a channel; capacity 0 means unbounded.
    Channel { capacity: usize },
    Callback,
}

/// An inbound edge slot declared by a consumer node.
#[derive(Clone)]
pub struct Subscription {
    tag: String,
    service: String,
    required: bool,
    message_types: Vec<TypeTag>,
    producer_types: Vec<TypeTag>,
    capacity: Option<usize>,
    overflow_policy: OverflowPolicy,
    required_attrs: Vec<String>,
    required_methods: Vec<String>,
    callback: Option<Callback>,
}

impl Subscription {
    /// A required subscription on the default service with an unbounded channel.
    ///
    /// # Arguments
    /// * `tag` - The name of the slot, unique within the consumer
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            service: DEFAULT_SERVICE.to_string(),
            required: true,
            message_types: Vec::new(),
            producer_types: Vec::new(),
            capacity: None,
            overflow_policy: OverflowPolicy::default(),
            required_attrs: Vec::new(),
            required_methods: Vec::new(),
            callback: None,
        }
    }

    /// Requests a named service on the producer instead of `"default"`.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Marks the slot as optional: leaving it unbound is only a warning.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Accepts messages of type `M`. Repeatable; no call means any type.
    pub fn message_type<M: Message + 'static>(mut self) -> Self {
        self.message_types.push(TypeTag::of::<M>());
        self
    }

    /// Accepts only producers of type `N`. Repeatable; no call means any producer.
    pub fn producer_type<N: 'static>(mut self) -> Self {
        self.producer_types.push(TypeTag::of::<N>());
        self
    }

    /// Bounded channel of `capacity` messages; 0 means unbounded.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// What `broadcast_nowait` does when this edge's bounded channel is full.
    /// Blocking sends always wait for room.
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Accepts only producers that declared `attribute`. Repeatable.
    pub fn require_attr(mut self, attribute: impl Into<String>) -> Self {
        self.required_attrs.push(attribute.into());
        self
    }

    /// Accepts only producers that declared the capability `method`. Repeatable.
    pub fn require_method(mut self, method: impl Into<String>) -> Self {
        self.required_methods.push(method.into());
        self
    }

    /// Switches the edge to callback mode. Arguments are whatever `f` captures.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(Box<dyn Message>) -> Result<(), NodeError> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The producer service this subscription asks for.
    pub fn requested_service(&self) -> &str {
        &self.service
    }

    /// Whether leaving the slot unbound fails validation.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn message_types(&self) -> &[TypeTag] {
        &self.message_types
    }

    pub fn producer_types(&self) -> &[TypeTag] {
        &self.producer_types
    }

    pub fn required_attrs(&self) -> &[String] {
        &self.required_attrs
    }

    pub fn required_methods(&self) -> &[String] {
        &self.required_methods
    }

    /// The overflow policy for non-blocking sends.
    pub fn policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Callback when a callback was given, otherwise a channel (capacity 0 is unbounded).
    pub fn mode(&self) -> DeliveryMode {
        match (&self.callback, self.capacity) {
            (Some(_), None) => DeliveryMode::Callback,
            (_, capacity) => DeliveryMode::Channel {
                capacity: capacity.unwrap_or(0),
            },
        }
    }

    /// A callback together with an explicit capacity is contradictory.
    pub(crate) fn has_conflicting_mode(&self) -> bool {
        self.callback.is_some() && self.capacity.is_some()
    }

    pub(crate) fn callback_fn(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("tag", &self.tag)
            .field("service", &self.service)
            .field("required", &self.required)
            .field("message_types", &self.message_types)
            .field("producer_types", &self.producer_types)
            .field("mode", &self.mode())
            .field("overflow_policy", &self.overflow_policy)
            .finish_non_exhaustive()
    }
}

enum Outlet {
    Bounded(mpsc::Sender<Box<dyn Message>>),
    Unbounded(mpsc::UnboundedSender<Box<dyn Message>>),
    Callback(Callback),
}

enum Intake {
    Bounded(mpsc::Receiver<Box<dyn Message>>),
    Unbounded(mpsc::UnboundedReceiver<Box<dyn Message>>),
}

/// A bound producer -> consumer connection.
pub struct Edge {
    tag: String,
    service: String,
    producer: String,
    consumer: String,
    message_types: Vec<TypeTag>,
    overflow_policy: OverflowPolicy,
    capacity: usize,
    converter: Option<Converter>,
    enabled: Arc<AtomicBool>,
    outlet: Outlet,
}

impl Edge {
    /// Creates the edge and its channel. The inbox is `None` for callback-mode edges.
    pub(crate) fn bind(
        subscription: &Subscription,
        service: &str,
        producer: &str,
        consumer: &str,
        converter: Option<Converter>,
    ) -> (Arc<Edge>, Option<Inbox>) {
        let enabled = Arc::new(AtomicBool::new(true));
        let (outlet, intake, capacity) = match (subscription.mode(), subscription.callback_fn()) {
            (DeliveryMode::Callback, Some(callback)) => (Outlet::Callback(callback.clone()), None, 0),
            (DeliveryMode::Channel { capacity }, _) if capacity > 0 => {
                let (tx, rx) = mpsc::channel(capacity);
                (Outlet::Bounded(tx), Some(Intake::Bounded(rx)), capacity)
            }
            _ => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Outlet::Unbounded(tx), Some(Intake::Unbounded(rx)), 0)
            }
        };

        let edge = Arc::new(Edge {
            tag: subscription.tag().to_string(),
            service: service.to_string(),
            producer: producer.to_string(),
            consumer: consumer.to_string(),
            message_types: subscription.message_types().to_vec(),
            overflow_policy: subscription.policy(),
            capacity,
            converter,
            enabled: enabled.clone(),
            outlet,
        });
        let inbox = intake.map(|intake| Inbox {
            tag: subscription.tag().to_string(),
            producer: producer.to_string(),
            intake,
            enabled,
        });
        (edge, inbox)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// False once the consumer muted its inbox; broadcasts then skip this edge.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> DeliveryMode {
        match self.outlet {
            Outlet::Callback(_) => DeliveryMode::Callback,
            _ => DeliveryMode::Channel {
                capacity: self.capacity,
            },
        }
    }

    /// Converts from the original message (never from another edge's output)
    /// and checks the result against the accepted types.
    pub(crate) fn prepare(&self, original: &dyn Message) -> Result<Box<dyn Message>, BroadcastError> {
        let outgoing = match &self.converter {
            Some(convert) => convert(original).ok_or_else(|| BroadcastError::Conversion {
                producer: self.producer.clone(),
                consumer: self.consumer.clone(),
                tag: self.tag.clone(),
                actual: original.type_tag().name().to_string(),
            })?,
            None => original.clone_message(),
        };

        if !self.message_types.is_empty() {
            let actual = (*outgoing).type_tag();
            if !self.message_types.contains(&actual) {
                return Err(BroadcastError::TypeMismatch {
                    producer: self.producer.clone(),
                    consumer: self.consumer.clone(),
                    tag: self.tag.clone(),
                    expected: describe_tags(&self.message_types),
                    actual: actual.name().to_string(),
                });
            }
        }
        Ok(outgoing)
    }

    /// Delivers, waiting for room on a full bounded channel.
    pub(crate) async fn deliver(&self, message: Box<dyn Message>) -> Result<(), BroadcastError> {
        match &self.outlet {
            Outlet::Bounded(tx) => {
                if tx.send(message).await.is_err() {
                    self.log_closed();
                }
                Ok(())
            }
            _ => self.deliver_nowait(message),
        }
    }

    /// Delivers without waiting; a full bounded channel is handled per the overflow policy.
    pub(crate) fn deliver_nowait(&self, message: Box<dyn Message>) -> Result<(), BroadcastError> {
        match &self.outlet {
            Outlet::Bounded(tx) => match tx.try_send(message) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    if self.overflow_policy == OverflowPolicy::Error {
                        return Err(BroadcastError::Overflow {
                            producer: self.producer.clone(),
                            consumer: self.consumer.clone(),
                            tag: self.tag.clone(),
                            capacity: self.capacity,
                        });
                    }
                    log::warn!(
                        "Edge {} -> {} ('{}') is full, dropping {}",
                        self.producer,
                        self.consumer,
                        self.tag,
                        dropped.log_summary()
                    );
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.log_closed();
                    Ok(())
                }
            },
            Outlet::Unbounded(tx) => {
                if tx.send(message).is_err() {
                    self.log_closed();
                }
                Ok(())
            }
            Outlet::Callback(callback) => callback(message).map_err(|e| BroadcastError::Callback {
                producer: self.producer.clone(),
                consumer: self.consumer.clone(),
                tag: self.tag.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn log_closed(&self) {
        log::warn!(
            "Edge {} -> {} ('{}') has no receiver left, message discarded",
            self.producer,
            self.consumer,
            self.tag
        );
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("producer", &self.producer)
            .field("consumer", &self.consumer)
            .field("tag", &self.tag)
            .field("service", &self.service)
            .field("mode", &self.mode())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// The consumer's receive handle for one channel-mode edge.
pub struct Inbox {
    tag: String,
    producer: String,
    intake: Intake,
    enabled: Arc<AtomicBool>,
}

impl Inbox {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    /// Waits for the next message. `None` once the producer side is gone.
    pub async fn recv(&mut self) -> Option<Box<dyn Message>> {
        match &mut self.intake {
            Intake::Bounded(rx) => rx.recv().await,
            Intake::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Takes the next message if one is queued.
    pub fn try_recv(&mut self) -> Option<Box<dyn Message>> {
        match &mut self.intake {
            Intake::Bounded(rx) => rx.try_recv().ok(),
            Intake::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Waits for the next message of type `M`.
    ///
    /// Messages of other types are logged and skipped; declare the
    /// subscription with `message_type::<M>()` and this never happens.
    pub async fn recv_as<M: Message + 'static>(&mut self) -> Option<M> {
        loop {
            let message = self.recv().await?;
            let summary = message.log_summary();
            match message.into_any().downcast::<M>() {
                Ok(typed) => return Some(*typed),
                Err(_) => log::warn!(
                    "Inbox '{}' skipped {}: not a {}",
                    self.tag,
                    summary,
                    TypeTag::of::<M>()
                ),
            }
        }
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        match &self.intake {
            Intake::Bounded(rx) => rx.len(),
            Intake::Unbounded(rx) => rx.len(),
        }
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A disabled edge is skipped by the producer's broadcasts.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("tag", &self.tag)
            .field("producer", &self.producer)
            .field("queued", &self.len())
            .finish()
    }
}
