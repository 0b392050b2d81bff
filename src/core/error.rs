use thiserror::Error;

use crate::core::message::FieldKind;

/// Errors raised while declaring or wiring the dataflow graph.
///
/// These are always local and synchronous: they surface from
/// `declare_subscription`, `subscribe` or the take step, never from a running loop.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("node '{node}' already declares a subscription tagged '{tag}'")]
    DuplicateTag { node: String, tag: String },

    #[error("subscription '{tag}' cannot combine a callback with an explicit capacity")]
    CallbackWithCapacity { tag: String },

    #[error("node '{consumer}' declares no subscription tagged '{tag}'")]
    UnknownTag { consumer: String, tag: String },

    #[error("no node registered under id {0}")]
    UnknownNode(usize),

    #[error("producer '{producer}' offers no service '{service}' (requested by '{consumer}.{tag}')")]
    MissingService {
        producer: String,
        consumer: String,
        tag: String,
        service: String,
    },

    #[error("producer '{producer}' lacks attribute '{attribute}' required by '{consumer}.{tag}'")]
    MissingAttribute {
        producer: String,
        consumer: String,
        tag: String,
        attribute: String,
    },

    #[error("producer '{producer}' lacks method '{method}' required by '{consumer}.{tag}'")]
    MissingMethod {
        producer: String,
        consumer: String,
        tag: String,
        method: String,
    },

    #[error("producer '{producer}' is a {actual}, but '{consumer}.{tag}' accepts only {expected}")]
    ProducerType {
        producer: String,
        consumer: String,
        tag: String,
        expected: String,
        actual: String,
    },

    #[error("subscription '{consumer}.{tag}' is already bound to producer '{producer}'")]
    AlreadyBound {
        producer: String,
        consumer: String,
        tag: String,
    },

    #[error("node '{node}' had its edges taken twice in one run")]
    AlreadyTaken { node: String },

    #[error("the graph can no longer be changed once the coordinator is {state}")]
    Closed { state: String },
}

/// Errors raised by `broadcast` / `broadcast_nowait` while delivering a message.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error(
        "edge {producer} -> {consumer} ('{tag}') expected {expected} but received {actual}"
    )]
    TypeMismatch {
        producer: String,
        consumer: String,
        tag: String,
        expected: String,
        actual: String,
    },

    #[error("converter on edge {producer} -> {consumer} ('{tag}') does not accept {actual}")]
    Conversion {
        producer: String,
        consumer: String,
        tag: String,
        actual: String,
    },

    #[error("edge {producer} -> {consumer} ('{tag}') is full (capacity {capacity})")]
    Overflow {
        producer: String,
        consumer: String,
        tag: String,
        capacity: usize,
    },

    #[error("callback on edge {producer} -> {consumer} ('{tag}') failed: {reason}")]
    Callback {
        producer: String,
        consumer: String,
        tag: String,
        reason: String,
    },
}

/// Errors raised by message schemas, rendering and replay parsing.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid schema for {type_name}: {reason}")]
    Schema { type_name: String, reason: String },

    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("field '{field}' could not be read as {kind}: '{raw}'")]
    Coerce {
        field: String,
        kind: FieldKind,
        raw: String,
    },

    #[error("field '{field}' expects {expected} but was given {actual}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        actual: FieldKind,
    },

    #[error("{type_name} has no field named '{field}'")]
    UnknownField { type_name: String, field: String },
}

/// The error type returned by node and supervisor lifecycle hooks.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Wiring(#[from] WiringError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl NodeError {
    pub fn msg(message: impl Into<String>) -> Self {
        NodeError::Other(message.into())
    }
}

/// One failed (or never finished) lifecycle task, by node name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub node: String,
    pub reason: String,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.node, self.reason)
    }
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned from [`Coordinator::run`](crate::Coordinator::run).
#[derive(Debug, Error)]
pub enum RunError {
    #[error("graph validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Wiring(#[from] WiringError),

    #[error("{} setup task(s) failed: {}", .0.len(), join_failures(.0))]
    Setup(Vec<TaskFailure>),

    #[error("the coordinator has already completed a run")]
    AlreadyRun,
}
