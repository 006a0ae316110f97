//! Exception guard for synchronous work.
//!
//! The guard runs a work item, captures whatever escapes it (an `Err` or a
//! panic) and routes the fault through the escalator before the handle can
//! settle. The guarded call never returns the raw fault and only unwinds if
//! the escalator itself panics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};
use warden_core::{FatalSignal, Fault, Outcome, TaskId};

use crate::escalator::FatalityEscalator;
use crate::signal::CancelSignal;

/// Result of a guarded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    /// Work returned normally
    Ok(T),
    /// Work failed with cancellation while the signal was active
    Cancelled,
    /// Work failed fatally; the escalator has already reported it
    FatalEscalated,
}

impl<T> GuardOutcome<T> {
    /// Terminal outcome for the enclosing handle.
    ///
    /// `FatalEscalated` becomes `Faulted(Fault::Unreachable)`: only visible
    /// when the escalator returned instead of terminating the process.
    #[must_use]
    pub fn into_outcome(self) -> Outcome<T> {
        match self {
            Self::Ok(value) => Outcome::Completed(value),
            Self::Cancelled => Outcome::Canceled,
            Self::FatalEscalated => Outcome::Faulted(Fault::Unreachable),
        }
    }
}

/// Wraps synchronous work so no failure escapes unclassified
#[derive(Clone)]
pub struct ExceptionGuard {
    escalator: Arc<dyn FatalityEscalator>,
    signal: CancelSignal,
    task_id: Option<TaskId>,
}

impl ExceptionGuard {
    /// Create a guard classifying faults against `signal`
    #[must_use]
    pub fn new(escalator: Arc<dyn FatalityEscalator>, signal: CancelSignal) -> Self {
        Self {
            escalator,
            signal,
            task_id: None,
        }
    }

    /// Attach a task id to log lines
    #[must_use]
    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Run `work` under the guard
    pub fn run<T>(&self, work: impl FnOnce() -> anyhow::Result<T>) -> GuardOutcome<T> {
        let fault = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => return GuardOutcome::Ok(value),
            Ok(Err(err)) => Fault::from_error(err),
            Err(payload) => Fault::from_panic(payload),
        };
        self.intercept(&fault)
    }

    /// Wrap `work` into a guarded callable
    pub fn wrap<T, F>(self, work: F) -> impl FnOnce() -> GuardOutcome<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        move || self.run(work)
    }

    fn intercept<T>(&self, fault: &Fault) -> GuardOutcome<T> {
        let task_id = self.task_id.map(|id| id.to_string()).unwrap_or_default();
        match self.escalator.report_unless_cancelled(fault, &self.signal) {
            FatalSignal::CancellationCompatible => {
                debug!(task_id = %task_id, "work item observed cancellation");
                GuardOutcome::Cancelled
            }
            FatalSignal::Fatal => {
                warn!(task_id = %task_id, fault = %fault, "work item failure escalated");
                GuardOutcome::FatalEscalated
            }
        }
    }
}

impl std::fmt::Debug for ExceptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionGuard")
            .field("signal", &self.signal)
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}
