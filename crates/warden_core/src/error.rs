//! Error types for WARDEN task outcomes.

use crate::fault::Fault;

/// Task result type
pub type TaskResult<T> = Result<T, TaskError>;

/// Why a task handle did not complete
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The work was cancelled
    #[error("task was canceled")]
    Canceled,

    /// The work failed; escalation has already run
    #[error("task faulted: {0}")]
    Faulted(Fault),
}

impl TaskError {
    /// True for [`TaskError::Canceled`]
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
