//! Schedulers: where launched jobs actually run.
//!
//! The launcher hands each wrapped work item to a [`Scheduler`] exactly once.
//! A scheduler either runs the [`Job`] or abandons it; abandoning settles the
//! job's handle as `Canceled` without running any caller code.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};
use warden_core::{CreationFlags, TaskId};

use crate::signal::CancelSignal;

/// Boxed unit future produced by an async job
pub type BoxedWork = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Whether a job is being run or abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Run,
    Abandon,
}

enum JobKind {
    Inline(Box<dyn FnOnce(Admission) + Send + 'static>),
    Async(Box<dyn FnOnce(Admission) -> BoxedWork + Send + 'static>),
}

/// A wrapped work item ready for execution.
///
/// Every job must be consumed exactly once through [`Job::run_inline`],
/// [`Job::into_future`] or [`Job::abandon`]. A job that is dropped instead
/// settles its handle as `Canceled`.
pub struct Job {
    id: TaskId,
    kind: JobKind,
}

impl Job {
    pub(crate) fn inline(id: TaskId, body: impl FnOnce(Admission) + Send + 'static) -> Self {
        Self {
            id,
            kind: JobKind::Inline(Box::new(body)),
        }
    }

    pub(crate) fn deferred(
        id: TaskId,
        body: impl FnOnce(Admission) -> BoxedWork + Send + 'static,
    ) -> Self {
        Self {
            id,
            kind: JobKind::Async(Box::new(body)),
        }
    }

    /// Id of the work item this job wraps
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// True if the job produces a future
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self.kind, JobKind::Async(_))
    }

    /// Settle the handle as `Canceled` without running the work
    pub fn abandon(self) {
        match self.kind {
            JobKind::Inline(body) => body(Admission::Abandon),
            // Abandoning settles synchronously; the returned future is empty.
            JobKind::Async(body) => drop(body(Admission::Abandon)),
        }
    }

    /// Run on the current thread, blocking on async work until it finishes
    pub fn run_inline(self) {
        match self.kind {
            JobKind::Inline(body) => body(Admission::Run),
            JobKind::Async(body) => futures::executor::block_on(body(Admission::Run)),
        }
    }

    /// Convert into a future that runs the job when polled
    #[must_use]
    pub fn into_future(self) -> BoxedWork {
        match self.kind {
            JobKind::Inline(body) => Box::pin(async move { body(Admission::Run) }),
            JobKind::Async(body) => body(Admission::Run),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("is_async", &self.is_async())
            .finish()
    }
}

/// Execution context for launched jobs
pub trait Scheduler: Send + Sync {
    /// Take ownership of `job` and eventually run or abandon it.
    ///
    /// Must not block the caller. Jobs whose `cancel` signal fires before
    /// they start should be abandoned.
    fn start(&self, job: Job, cancel: &CancelSignal, flags: CreationFlags);
}

/// Scheduler backed by a tokio runtime.
///
/// Inline jobs run as tokio tasks, or on the blocking pool when
/// [`CreationFlags::LONG_RUNNING`] is set. Async jobs always run as tasks.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Schedule onto the given runtime
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Schedule onto the runtime driving the current thread
    ///
    /// # Errors
    ///
    /// Returns error if called outside a tokio runtime
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        tokio::runtime::Handle::try_current().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn start(&self, job: Job, cancel: &CancelSignal, flags: CreationFlags) {
        if cancel.is_cancellation_requested() {
            debug!(task_id = %job.id(), "cancelled before scheduling, abandoning");
            job.abandon();
            return;
        }

        let cancel = cancel.clone();
        if !job.is_async() && flags.contains(CreationFlags::LONG_RUNNING) {
            trace!(task_id = %job.id(), "starting on blocking pool");
            self.handle.spawn_blocking(move || {
                if cancel.is_cancellation_requested() {
                    job.abandon();
                } else {
                    job.run_inline();
                }
            });
        } else {
            trace!(task_id = %job.id(), "starting as runtime task");
            self.handle.spawn(async move {
                if cancel.is_cancellation_requested() {
                    job.abandon();
                } else {
                    job.into_future().await;
                }
            });
        }
    }
}

struct Queued {
    job: Job,
    cancel: CancelSignal,
    flags: CreationFlags,
}

/// Deterministic scheduler that queues jobs until explicitly drained.
///
/// Jobs run on the thread calling [`ManualScheduler::run_next`] or
/// [`ManualScheduler::run_all`]; async jobs are driven with
/// `futures::executor::block_on`, so they must not depend on a tokio reactor.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<Queued>>,
}

impl ManualScheduler {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued jobs
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Flags the next queued job was started with
    #[must_use]
    pub fn peek_flags(&self) -> Option<CreationFlags> {
        self.lock().front().map(|queued| queued.flags)
    }

    /// Run or abandon the oldest queued job. Returns false if the queue is empty.
    pub fn run_next(&self) -> bool {
        // Release the lock before running; jobs may launch more work.
        let Some(queued) = self.lock().pop_front() else {
            return false;
        };
        if queued.cancel.is_cancellation_requested() {
            debug!(task_id = %queued.job.id(), "cancelled while queued, abandoning");
            queued.job.abandon();
        } else {
            queued.job.run_inline();
        }
        true
    }

    /// Drain the queue, including jobs enqueued while draining. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Queued>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, job: Job, cancel: &CancelSignal, flags: CreationFlags) {
        trace!(task_id = %job.id(), pending = self.pending(), "queued");
        self.lock().push_back(Queued {
            job,
            cancel: cancel.clone(),
            flags,
        });
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    fn counting_job(runs: &Arc<AtomicUsize>, abandons: &Arc<AtomicUsize>) -> Job {
        let runs = Arc::clone(runs);
        let abandons = Arc::clone(abandons);
        Job::inline(TaskId::new(), move |admission| match admission {
            Admission::Run => {
                runs.fetch_add(1, Ordering::SeqCst);
            }
            Admission::Abandon => {
                abandons.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[test]
    fn test_manual_runs_in_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            let job = Job::inline(TaskId::new(), move |_| order.lock().unwrap().push(i));
            scheduler.start(job, &CancelSignal::none(), CreationFlags::NONE);
        }

        assert_eq!(scheduler.pending(), 3);
        assert_eq!(scheduler.run_all(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(!scheduler.run_next());
    }

    #[test]
    fn test_manual_abandons_cancelled_jobs() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let abandons = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        scheduler.start(
            counting_job(&runs, &abandons),
            &CancelSignal::new(token.clone()),
            CreationFlags::NONE,
        );
        scheduler.start(counting_job(&runs, &abandons), &CancelSignal::none(), CreationFlags::NONE);
        token.cancel();
        scheduler.run_all();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(abandons.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_keeps_flags() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let abandons = Arc::new(AtomicUsize::new(0));
        scheduler.start(
            counting_job(&runs, &abandons),
            &CancelSignal::none(),
            CreationFlags::LONG_RUNNING,
        );
        assert_eq!(scheduler.peek_flags(), Some(CreationFlags::LONG_RUNNING));
    }

    #[test]
    fn test_async_job_run_inline() {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&runs);
        let job = Job::deferred(TaskId::new(), move |admission| -> BoxedWork {
            Box::pin(async move {
                if admission == Admission::Run {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })
        });
        assert!(job.is_async());
        job.run_inline();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tokio_runs_job() {
        let scheduler = TokioScheduler::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let job = Job::inline(TaskId::new(), move |_| {
            let _ = tx.send(std::thread::current().id());
        });
        scheduler.start(job, &CancelSignal::none(), CreationFlags::NONE);
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_tokio_long_running_uses_blocking_pool() {
        let scheduler = TokioScheduler::current().unwrap();
        let caller = std::thread::current().id();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let job = Job::inline(TaskId::new(), move |_| {
            let _ = tx.send(std::thread::current().id());
        });
        scheduler.start(job, &CancelSignal::none(), CreationFlags::LONG_RUNNING);
        assert_ne!(rx.await.unwrap(), caller);
    }

    #[tokio::test]
    async fn test_tokio_abandons_pre_cancelled() {
        let scheduler = TokioScheduler::current().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let abandons = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        token.cancel();

        scheduler.start(
            counting_job(&runs, &abandons),
            &CancelSignal::new(token),
            CreationFlags::NONE,
        );

        // Abandoning a pre-cancelled job happens synchronously inside start.
        assert_eq!(abandons.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tokio_current_outside_runtime() {
        assert!(TokioScheduler::current().is_err());
    }
}
