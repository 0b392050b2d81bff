/// Decides when the running phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompletionPolicy {
    /// The first loop to return or fail ends the phase, the coordinator's own included.
    #[default]
    FirstToFinish,
    /// The phase ends once every node loop has returned or failed.
    AllMustFinish,
}

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoordinatorConfig {
    /// Name used for the coordinator's own hooks in logs and traces.
    pub name: String,
    pub completion: CompletionPolicy,
    /// Halt on ctrl-c.
    pub handle_interrupt: bool,
    /// Refuse to run a graph with unwired required subscriptions.
    pub validate_before_run: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "coordinator".to_string(),
            completion: CompletionPolicy::default(),
            handle_interrupt: false,
            validate_before_run: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_completion(mut self, completion: CompletionPolicy) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_interrupt_handling(mut self, enabled: bool) -> Self {
        self.handle_interrupt = enabled;
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_before_run = enabled;
        self
    }
}
