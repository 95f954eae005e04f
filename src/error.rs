use thiserror::Error;

/// Failures reported by a configured [`Driver`](crate::run::Driver).
///
/// Errors raised by effects themselves travel inside the effect context's result
/// type and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("pipeline did not complete within {limit} reduction steps")]
    StepLimit { limit: u64 },
    #[error("pipeline stalled after {steps} reduction steps: no stage consumes unit signals")]
    Stalled { steps: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit_message() {
        let err = RunError::StepLimit { limit: 12 };
        assert_eq!(err.to_string(), "pipeline did not complete within 12 reduction steps");
    }

    #[test]
    fn test_stalled_message() {
        let err = RunError::Stalled { steps: 4 };
        assert!(err.to_string().starts_with("pipeline stalled after 4 reduction steps"));
    }
}
