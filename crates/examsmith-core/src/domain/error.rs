// domain/error.rs
// Pipeline error taxonomy and the user-safe mapping.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Blueprint failed validation after repair: {0}")]
    BlueprintInvalid(String),

    #[error("Writer committed {produced} of {expected} items")]
    WriterIncomplete { expected: usize, produced: usize },

    #[error("Language model unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Daily usage limit reached ({used}/{limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    #[error("Usage accounting unavailable: {0}")]
    UsageCapRead(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Pipeline deadline exceeded")]
    PipelineDeadline,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Categories exposed to teachers. Internal violation codes never
/// surface verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFacingError {
    Quota,
    ServiceUnavailable,
    InvalidRequest,
    Internal,
}

impl UserFacingError {
    pub fn message(&self) -> &'static str {
        match self {
            UserFacingError::Quota => "You have reached today's generation limit.",
            UserFacingError::ServiceUnavailable => {
                "The generation service is temporarily unavailable. Please try again."
            }
            UserFacingError::InvalidRequest => {
                "The request could not be understood. Please check the form and retry."
            }
            UserFacingError::Internal => "Something went wrong while building the assessment.",
        }
    }
}

impl PipelineError {
    pub fn user_facing(&self) -> UserFacingError {
        match self {
            PipelineError::QuotaExceeded { .. } => UserFacingError::Quota,
            PipelineError::LlmUnavailable(_) => UserFacingError::ServiceUnavailable,
            PipelineError::InvalidIntent(_) => UserFacingError::InvalidRequest,
            PipelineError::UsageCapRead(_)
            | PipelineError::Cancelled
            | PipelineError::PipelineDeadline
            | PipelineError::BlueprintInvalid(_)
            | PipelineError::WriterIncomplete { .. }
            | PipelineError::Storage(_) => UserFacingError::Internal,
        }
    }

    /// Process exit code for the CLI surface.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InvalidIntent(_) => 2,
            PipelineError::WriterIncomplete { .. }
            | PipelineError::BlueprintInvalid(_)
            | PipelineError::Cancelled
            | PipelineError::PipelineDeadline => 3,
            PipelineError::LlmUnavailable(_) => 4,
            PipelineError::QuotaExceeded { .. } | PipelineError::UsageCapRead(_) => 5,
            PipelineError::Storage(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_codes_do_not_leak_to_users() {
        let err = PipelineError::WriterIncomplete {
            expected: 10,
            produced: 7,
        };
        assert_eq!(err.user_facing(), UserFacingError::Internal);
        assert!(!err.user_facing().message().contains("mcq"));
    }

    #[test]
    fn exit_codes_match_the_cli_contract() {
        assert_eq!(PipelineError::InvalidIntent("x".into()).exit_code(), 2);
        assert_eq!(
            PipelineError::WriterIncomplete {
                expected: 3,
                produced: 1
            }
            .exit_code(),
            3
        );
        assert_eq!(PipelineError::LlmUnavailable("down".into()).exit_code(), 4);
        assert_eq!(
            PipelineError::QuotaExceeded { used: 5, limit: 5 }.exit_code(),
            5
        );
    }
}
