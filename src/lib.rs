//! # Relay
//!
//! A small in-process dataflow engine for robotics: independent nodes (sensor
//! readers, camera drivers, log replayers, algorithms) exchange typed messages
//! over named channels, and one coordinator wires them and drives them through
//! setup, run and teardown.
//!
//! ## Features
//!
//! - **Typed edges**: subscriptions constrain message types, producer types, attributes and methods, checked at wiring time
//! - **Explicit backpressure**: bounded channels suspend the producer; non-blocking sends drop or fail per edge
//! - **Ordered lifecycle**: every setup finishes before any loop runs, and teardown always follows setup
//! - **Cooperative scheduling**: all hooks share one task; halting cancels loops at their next `.await`
//! - **Replay**: messages render to one text line and parse back without hand-written parsers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay::prelude::*;
//!
//! relay::message! {
//!     pub struct Reading {
//!         pub value: f64,
//!     }
//! }
//!
//! struct Sensor {
//!     core: NodeCore,
//! }
//!
//! #[async_trait::async_trait]
//! impl Node for Sensor {
//!     fn core(&self) -> &NodeCore { &self.core }
//!     fn core_mut(&mut self) -> &mut NodeCore { &mut self.core }
//!
//!     async fn run(&mut self) -> Result<(), NodeError> {
//!         for i in 0..10 {
//!             let reading = Reading { value: i as f64, ..Default::default() };
//!             self.core.broadcast(&reading, DEFAULT_SERVICE).await?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct Logger {
//!     core: NodeCore,
//!     inbox: Option<Inbox>,
//! }
//!
//! #[async_trait::async_trait]
//! impl Node for Logger {
//!     fn core(&self) -> &NodeCore { &self.core }
//!     fn core_mut(&mut self) -> &mut NodeCore { &mut self.core }
//!
//!     fn take(&mut self) {
//!         self.inbox = self.core.take_inbox("readings");
//!     }
//!
//!     async fn run(&mut self) -> Result<(), NodeError> {
//!         let Some(inbox) = self.inbox.as_mut() else { return Ok(()) };
//!         while let Some(reading) = inbox.recv_as::<Reading>().await {
//!             println!("{}", reading.render());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut logger = Logger { core: NodeCore::new("logger"), inbox: None };
//! logger.core.declare_subscription(Subscription::new("readings").capacity(4))?;
//!
//! let mut coordinator = Coordinator::new(CoordinatorConfig::default());
//! let sensor = coordinator.add_node(Sensor { core: NodeCore::new("sensor") });
//! let logger = coordinator.add_node(logger);
//! coordinator.subscribe(sensor, logger, "readings")?;
//! let report = coordinator.run().await?;
//! println!("run ended: {}", report.halt_reason);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`replay`]: the replay registry and the log replayer node
//! - [`prelude`]: Commonly used types and traits (import with `use relay::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub mod replay;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Core types
pub use core::{AsAny, TypeTag};

// Messages
pub use core::message::{
    message_to_json, FieldKind, FieldSpec, FieldType, FieldValue, Header, Message, Record, Schema,
};

// Subscriptions and edges
pub use core::subscription::{
    converter, Callback, Converter, DeliveryMode, Edge, Inbox, OverflowPolicy, Subscription,
    DEFAULT_SERVICE,
};

// Nodes
pub use core::node::{Node, NodeCore};

// Coordinator
pub use core::config::{CompletionPolicy, CoordinatorConfig};
pub use core::coordinator::{
    Coordinator, CoordinatorState, ExitFlag, HaltHandle, HaltReason, IdleSupervisor, NodeId,
    RunReport, Supervisor,
};
pub use core::validation::{ValidationIssue, ValidationResult};

// Errors
pub use core::error::{
    BroadcastError, MessageError, NodeError, RunError, TaskFailure, WiringError,
};

// Telemetry
pub use core::telemetry::{
    LogTelemetry, MemoryTelemetry, Phase, TaskOutcome, Telemetry, TraceEntry,
};

// Replay
pub use replay::{LogReplayer, ReplayConfig, ReplayRegistry, Replayed};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything you need to declare, wire and run nodes.
///
/// # Example
/// ```rust
/// use relay::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Coordinator
        CompletionPolicy,
        Coordinator,
        CoordinatorConfig,
        // Subscriptions
        DEFAULT_SERVICE,
        Header,
        Inbox,
        // Messages
        Message,
        // Nodes
        Node,
        NodeCore,
        NodeError,
        OverflowPolicy,
        Record,
        Subscription,
        converter,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
