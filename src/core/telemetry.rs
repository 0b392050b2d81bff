use std::fmt;
use std::sync::Mutex;

/// The lifecycle step a trace entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Take,
    Setup,
    Run,
    Teardown,
}

/// How one lifecycle task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    /// Still running when the coordinator started halting.
    Cancelled,
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Completed => write!(f, "completed"),
            TaskOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            TaskOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single entry in the lifecycle trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Seconds since the UNIX epoch.
    pub timestamp: f64,
    pub run_id: String,
    pub node: String,
    pub phase: Phase,
    pub outcome: TaskOutcome,
}

/// Trait for recording lifecycle traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: TraceEntry);

    fn flush(&self) {}
}

/// Simple in-memory collector for traces.
#[derive(Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<TraceEntry>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<TraceEntry> {
        self.traces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Entries for one phase, in the order they were recorded.
    pub fn phase(&self, phase: Phase) -> Vec<TraceEntry> {
        self.get_traces()
            .into_iter()
            .filter(|entry| entry.phase == phase)
            .collect()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: TraceEntry) {
        self.traces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

/// Forwards every entry to the `log` facade at debug level.
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, entry: TraceEntry) {
        log::debug!(
            "[run {}] {:?} {}: {}",
            entry.run_id,
            entry.phase,
            entry.node,
            entry.outcome
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(node: &str, phase: Phase) -> TraceEntry {
        TraceEntry {
            timestamp: 0.0,
            run_id: "r".into(),
            node: node.into(),
            phase,
            outcome: TaskOutcome::Completed,
        }
    }

    #[test]
    fn test_memory_telemetry_keeps_order_and_filters() {
        let telemetry = MemoryTelemetry::new();
        telemetry.record(entry("a", Phase::Take));
        telemetry.record(entry("a", Phase::Setup));
        telemetry.record(entry("b", Phase::Take));

        let traces = telemetry.get_traces();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[1].phase, Phase::Setup);

        let takes: Vec<_> = telemetry.phase(Phase::Take).into_iter().map(|e| e.node).collect();
        assert_eq!(takes, vec!["a", "b"]);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TaskOutcome::Failed("boom".into()).to_string(), "failed: boom");
        assert!(TaskOutcome::Failed(String::new()).is_failure());
        assert!(!TaskOutcome::Cancelled.is_failure());
    }
}
