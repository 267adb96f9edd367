//! Error types for the scheduler and the timed cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Task Error ==
/// Outcome of a scheduled task that did not produce a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError<E> {
    /// The task ran and returned its own error
    #[error("task failed: {0}")]
    Failed(E),

    /// The task panicked before producing an outcome
    #[error("task panicked before producing a result")]
    Panicked,

    /// The runtime shut down before the task could finish
    #[error("task was cancelled by runtime shutdown")]
    Cancelled,
}

impl<E> TaskError<E> {
    /// Returns the task's own error, if it produced one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(err) => Some(err),
            TaskError::Panicked | TaskError::Cancelled => None,
        }
    }
}

// == Call Error ==
/// Outcome of a cached call that did not produce a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    /// The producer execution this call was joined to returned an error
    #[error("producer failed: {0}")]
    Producer(E),

    /// The producer execution panicked and was abandoned
    #[error("producer execution was abandoned before settling")]
    Abandoned,
}

impl<E> CallError<E> {
    /// Returns the producer's own error, if it produced one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            CallError::Producer(err) => Some(err),
            CallError::Abandoned => None,
        }
    }
}

// == Config Error ==
/// Errors raised while building a scheduler from options.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Concurrency limit must be a positive integer
    #[error("Invalid concurrency: {0} (must be at least 1)")]
    InvalidConcurrency(usize),
}

// == Result Type Alias ==
/// Convenience Result type for fallible construction.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_into_failure() {
        assert_eq!(TaskError::Failed("boom").into_failure(), Some("boom"));
        assert_eq!(TaskError::<&str>::Panicked.into_failure(), None);
        assert_eq!(TaskError::<&str>::Cancelled.into_failure(), None);
    }

    #[test]
    fn test_call_error_display_passes_inner_through() {
        let err = CallError::Producer("upstream down".to_string());
        assert_eq!(err.to_string(), "producer failed: upstream down");
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::InvalidConcurrency(0).to_string(),
            "Invalid concurrency: 0 (must be at least 1)"
        );
    }
}
