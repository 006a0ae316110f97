//! Task launcher: the only way background work should be started.
//!
//! Four launch operations share one guarantee: a failure escaping the work
//! item is either absorbed as cancellation or escalated exactly once.
//!
//! Synchronous work is wrapped in an [`ExceptionGuard`], so escalation runs on
//! the executing thread before the handle settles. Asynchronous work cannot be
//! intercepted inline; instead the handle carries a terminal fault hook that
//! reports unconditionally while the handle settles as `Faulted`.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, trace};
use warden_core::{CreationFlags, Fault, Outcome, TaskId};

use crate::escalator::FatalityEscalator;
use crate::guard::{ExceptionGuard, GuardOutcome};
use crate::handle::{self, Completer, TaskHandle};
use crate::monitor::LaunchMetrics;
use crate::scheduler::{Admission, BoxedWork, Job, Scheduler};
use crate::signal::CancelSignal;

/// Launches guarded background work onto a [`Scheduler`]
#[derive(Clone)]
pub struct TaskLauncher {
    escalator: Arc<dyn FatalityEscalator>,
    metrics: Arc<LaunchMetrics>,
    name: Arc<str>,
}

impl TaskLauncher {
    /// Create a launcher reporting fatal faults to `escalator`
    #[must_use]
    pub fn new(escalator: Arc<dyn FatalityEscalator>) -> Self {
        Self {
            escalator,
            metrics: Arc::new(LaunchMetrics::new()),
            name: Arc::from("warden"),
        }
    }

    /// Name used in log fields
    #[must_use]
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    /// Launcher name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Escalator shared by every launch
    #[must_use]
    pub fn escalator(&self) -> &Arc<dyn FatalityEscalator> {
        &self.escalator
    }

    /// Launch counters
    #[must_use]
    pub fn metrics(&self) -> &LaunchMetrics {
        &self.metrics
    }

    /// Launch a synchronous action with default flags
    pub fn launch_action<F>(
        &self,
        work: F,
        cancel: &CancelSignal,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.launch_action_with_flags(work, cancel, CreationFlags::NONE, scheduler)
    }

    /// Launch a synchronous action
    pub fn launch_action_with_flags<F>(
        &self,
        work: F,
        cancel: &CancelSignal,
        flags: CreationFlags,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.launch_guarded("action", work, cancel, flags, scheduler)
    }

    /// Launch a synchronous function with default flags
    pub fn launch_func<T, F>(
        &self,
        work: F,
        cancel: &CancelSignal,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.launch_func_with_flags(work, cancel, CreationFlags::NONE, scheduler)
    }

    /// Launch a synchronous function
    pub fn launch_func_with_flags<T, F>(
        &self,
        work: F,
        cancel: &CancelSignal,
        flags: CreationFlags,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.launch_guarded("func", work, cancel, flags, scheduler)
    }

    /// Launch an asynchronous action with default flags
    pub fn launch_async_action<F, Fut>(
        &self,
        factory: F,
        cancel: &CancelSignal,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.launch_async_action_with_flags(factory, cancel, CreationFlags::NONE, scheduler)
    }

    /// Launch an asynchronous action
    pub fn launch_async_action_with_flags<F, Fut>(
        &self,
        factory: F,
        cancel: &CancelSignal,
        flags: CreationFlags,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.launch_unwrapped("async_action", factory, cancel, flags, scheduler)
    }

    /// Launch an asynchronous function with default flags
    pub fn launch_async_func<T, F, Fut>(
        &self,
        factory: F,
        cancel: &CancelSignal,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.launch_async_func_with_flags(factory, cancel, CreationFlags::NONE, scheduler)
    }

    /// Launch an asynchronous function
    pub fn launch_async_func_with_flags<T, F, Fut>(
        &self,
        factory: F,
        cancel: &CancelSignal,
        flags: CreationFlags,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.launch_unwrapped("async_func", factory, cancel, flags, scheduler)
    }

    fn launch_guarded<T, F>(
        &self,
        kind: &'static str,
        work: F,
        cancel: &CancelSignal,
        flags: CreationFlags,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let id = TaskId::new();
        let (completer, handle) = handle::pair::<T>(id);
        let guard = ExceptionGuard::new(Arc::clone(&self.escalator), cancel.clone()).with_task(id);
        let metrics = Arc::clone(&self.metrics);

        self.record_launch(id, kind, flags);
        completer.mark_scheduled();

        let job = Job::inline(id, move |admission| {
            let mut unwinding = None;
            let outcome = match admission {
                Admission::Abandon => Outcome::Canceled,
                Admission::Run => {
                    completer.mark_running();
                    match panic::catch_unwind(AssertUnwindSafe(|| guard.run(work))) {
                        Ok(guarded) => {
                            if matches!(guarded, GuardOutcome::FatalEscalated) {
                                metrics.record_escalation();
                            }
                            guarded.into_outcome()
                        }
                        // Only the escalator can unwind out of the guard.
                        Err(payload) => {
                            metrics.record_escalation();
                            unwinding = Some(payload);
                            Outcome::Faulted(Fault::Unreachable)
                        }
                    }
                }
            };
            settle(completer, outcome, &metrics);
            if let Some(payload) = unwinding {
                panic::resume_unwind(payload);
            }
        });

        // The one and only place synchronous work reaches a scheduler.
        scheduler.start(job, cancel, flags);
        handle
    }

    fn launch_unwrapped<T, F, Fut>(
        &self,
        kind: &'static str,
        factory: F,
        cancel: &CancelSignal,
        flags: CreationFlags,
        scheduler: &dyn Scheduler,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let id = TaskId::new();
        let (mut completer, handle) = handle::pair::<T>(id);
        let metrics = Arc::clone(&self.metrics);

        let escalator = Arc::clone(&self.escalator);
        let hook_metrics = Arc::clone(&self.metrics);
        completer.on_faulted(Box::new(move |fault: &Fault| {
            hook_metrics.record_escalation();
            escalator.report(fault);
        }));

        self.record_launch(id, kind, flags);
        completer.mark_scheduled();

        let job = Job::deferred(id, move |admission| -> BoxedWork {
            match admission {
                Admission::Abandon => {
                    settle(completer, Outcome::Canceled, &metrics);
                    Box::pin(futures::future::ready(()))
                }
                Admission::Run => Box::pin(async move {
                    completer.mark_running();
                    // The factory runs inside the guarded future so a panic
                    // while building the computation is captured as well.
                    let result = AssertUnwindSafe(async move { factory().await })
                        .catch_unwind()
                        .await;
                    settle(completer, flatten(result), &metrics);
                }),
            }
        });

        // The one and only place asynchronous work reaches a scheduler.
        scheduler.start(job, cancel, flags);
        handle
    }

    fn record_launch(&self, id: TaskId, kind: &'static str, flags: CreationFlags) {
        self.metrics.record_launch();
        debug!(
            launcher = %self.name,
            task_id = %id,
            kind,
            flags = flags.bits(),
            "launching work item"
        );
    }
}

impl std::fmt::Debug for TaskLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLauncher")
            .field("name", &self.name)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

/// Map a caught async result to a terminal outcome.
///
/// Cancellation surfaces as its own terminal state, so no classification
/// against the signal happens here.
fn flatten<T>(result: Result<anyhow::Result<T>, Box<dyn Any + Send>>) -> Outcome<T> {
    let fault = match result {
        Ok(Ok(value)) => return Outcome::Completed(value),
        Ok(Err(err)) => Fault::from_error(err),
        Err(payload) => Fault::from_panic(payload),
    };
    if fault.is_cancellation() {
        Outcome::Canceled
    } else {
        Outcome::Faulted(fault)
    }
}

fn settle<T>(completer: Completer<T>, outcome: Outcome<T>, metrics: &LaunchMetrics) {
    trace!(task_id = %completer.id(), state = %outcome.state(), "settling");
    metrics.record_settled(outcome.state());
    completer.settle(outcome);
}
