/// Represents an issue found while validating the wired graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A hard error: the run must not start.
    Error(String),
    /// A warning: the graph runs, but probably not as intended.
    Warning(String),
}

/// The result of a graph validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Error(msg.into()));
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Warning(msg.into()));
    }

    pub fn is_safe(&self) -> bool {
        !self.issues.iter().any(|i| matches!(i, ValidationIssue::Error(_)))
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| matches!(i, ValidationIssue::Warning(_)))
    }

    pub fn errors(&self) -> Vec<String> {
        self.issues
            .iter()
            .filter_map(|i| match i {
                ValidationIssue::Error(msg) => Some(msg.clone()),
                ValidationIssue::Warning(_) => None,
            })
            .collect()
    }

    pub fn log_summary(&self) {
        if self.is_safe() && !self.has_warnings() {
            log::info!("Graph validation passed: every required subscription is wired.");
            return;
        }

        for issue in &self.issues {
            match issue {
                ValidationIssue::Error(msg) => log::error!("Graph error: {}", msg),
                ValidationIssue::Warning(msg) => log::warn!("Graph warning: {}", msg),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_keep_result_safe() {
        let mut result = ValidationResult::new();
        assert!(result.is_safe());
        result.add_warning("loose end");
        assert!(result.is_safe());
        assert!(result.has_warnings());
        result.add_error("missing edge");
        assert!(!result.is_safe());
        assert_eq!(result.errors(), vec!["missing edge".to_string()]);
    }
}
