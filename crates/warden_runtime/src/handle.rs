//! Task handles.
//!
//! A launch produces two halves: the caller keeps a [`TaskHandle`], the
//! scheduled job owns a [`Completer`]. The completer is consumed by
//! [`Completer::settle`], so a handle can only ever receive one outcome.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use warden_core::{Fault, Outcome, TaskId, TaskState};

/// Terminal fault hook run while a handle settles as `Faulted`
pub type FaultHook = Box<dyn FnOnce(&Fault) + Send + 'static>;

/// Atomic, forward-only task state
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(TaskState::Created as u8))
    }

    pub(crate) fn load(&self) -> TaskState {
        // Only valid discriminants are ever stored.
        TaskState::from_u8(self.0.load(Ordering::Acquire)).unwrap_or(TaskState::Created)
    }

    /// Move to `next` if that is a legal forward transition from the current state
    pub(crate) fn advance(&self, next: TaskState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let Some(state) = TaskState::from_u8(current) else {
                return false;
            };
            if !state.can_advance_to(next) {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Caller-side view of a launched work item.
///
/// Await it to get the [`Outcome`]. Dropping it does not cancel the work.
#[derive(Debug)]
#[must_use = "a task handle does nothing unless awaited or inspected"]
pub struct TaskHandle<T> {
    id: TaskId,
    state: Arc<StateCell>,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> TaskHandle<T> {
    /// Id of the launched work item
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle state.
    ///
    /// `Faulted` is only stored after the fault hook has returned, so an
    /// observer never sees it ahead of escalation.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.load()
    }

    /// True once a terminal state has been reached
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The job was dropped without settling, e.g. the runtime shut down.
            Poll::Ready(Err(_)) => {
                self.state.advance(TaskState::Canceled);
                let outcome = match self.state.load() {
                    TaskState::Faulted => Outcome::Faulted(Fault::Unreachable),
                    _ => Outcome::Canceled,
                };
                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Settling half of a task handle
pub(crate) struct Completer<T> {
    id: TaskId,
    state: Arc<StateCell>,
    tx: Option<oneshot::Sender<Outcome<T>>>,
    on_faulted: Option<FaultHook>,
}

impl<T> Completer<T> {
    pub(crate) const fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn mark_scheduled(&self) -> bool {
        self.state.advance(TaskState::Scheduled)
    }

    pub(crate) fn mark_running(&self) -> bool {
        self.state.advance(TaskState::Running)
    }

    /// Attach the terminal fault hook; replaces any earlier hook
    pub(crate) fn on_faulted(&mut self, hook: FaultHook) {
        debug_assert!(self.on_faulted.is_none(), "fault hook attached twice");
        self.on_faulted = Some(hook);
    }

    /// Publish the outcome.
    ///
    /// The fault hook runs first, then the state moves, then the outcome is
    /// sent. Whoever awaits the handle or reads its state therefore observes
    /// the hook's effects. If the hook panics the outcome is still published
    /// before the panic resumes.
    pub(crate) fn settle(mut self, outcome: Outcome<T>) {
        let hooked = match (&outcome, self.on_faulted.take()) {
            (Outcome::Faulted(fault), Some(hook)) => {
                panic::catch_unwind(AssertUnwindSafe(|| hook(fault)))
            }
            _ => Ok(()),
        };
        self.state.advance(outcome.state());
        if let Some(tx) = self.tx.take() {
            // A dropped handle is not an error; the work already ran.
            let _ = tx.send(outcome);
        }
        if let Err(payload) = hooked {
            panic::resume_unwind(payload);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        // Dropped unsettled: the job never ran to completion.
        if self.tx.is_some() {
            self.state.advance(TaskState::Canceled);
        }
    }
}

/// Create a connected completer/handle pair in the `Created` state
pub(crate) fn pair<T>(id: TaskId) -> (Completer<T>, TaskHandle<T>) {
    let state = Arc::new(StateCell::new());
    let (tx, rx) = oneshot::channel();
    (
        Completer {
            id,
            state: Arc::clone(&state),
            tx: Some(tx),
            on_faulted: None,
        },
        TaskHandle { id, state, rx },
    )
}
