//! Handle lifecycle states and terminal outcomes.

use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};
use crate::fault::Fault;

/// Lifecycle state of a launched work item.
///
/// States only move forward: `Created → Scheduled → Running → terminal`.
/// `Running` is skipped when the scheduler abandons a job that was cancelled
/// while still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskState {
    /// Handle exists, nothing handed to the scheduler yet
    Created = 0,
    /// Handed to the scheduler
    Scheduled = 1,
    /// Executing on a scheduler context
    Running = 2,
    /// Returned normally
    Completed = 3,
    /// Failed; escalation has fired
    Faulted = 4,
    /// Cancelled cooperatively or before start
    Canceled = 5,
}

impl TaskState {
    /// True for `Completed`, `Faulted` and `Canceled`
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Faulted | Self::Canceled)
    }

    /// Decode from the raw discriminant
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Created),
            1 => Some(Self::Scheduled),
            2 => Some(Self::Running),
            3 => Some(Self::Completed),
            4 => Some(Self::Faulted),
            5 => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Created, Self::Scheduled)
            | (Self::Scheduled, Self::Running)
            | (Self::Scheduled, Self::Canceled) => true,
            (Self::Running, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// Stable lowercase name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Faulted => "faulted",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome delivered through a task handle
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Work returned normally with this value
    Completed(T),
    /// Work was cancelled
    Canceled,
    /// Work failed and the failure was escalated
    Faulted(Fault),
}

impl<T> Outcome<T> {
    /// Terminal state this outcome settles a handle into
    #[must_use]
    pub const fn state(&self) -> TaskState {
        match self {
            Self::Completed(_) => TaskState::Completed,
            Self::Canceled => TaskState::Canceled,
            Self::Faulted(_) => TaskState::Faulted,
        }
    }

    /// True if completed
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// True if canceled
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// True if faulted
    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }

    /// The fault, if any
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    /// Map the completed value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Canceled => Outcome::Canceled,
            Self::Faulted(fault) => Outcome::Faulted(fault),
        }
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Canceled`] or [`TaskError::Faulted`] for the
    /// non-completed outcomes.
    pub fn into_result(self) -> TaskResult<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Canceled => Err(TaskError::Canceled),
            Self::Faulted(fault) => Err(TaskError::Faulted(fault)),
        }
    }
}
