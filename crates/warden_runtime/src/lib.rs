//! WARDEN Runtime
//!
//! Guarded launch of background work. Every failure that escapes a launched
//! work item is either absorbed as cooperative cancellation or escalated
//! exactly once to an injected [`FatalityEscalator`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod escalator;
pub mod guard;
pub mod handle;
pub mod launcher;
pub mod monitor;
pub mod scheduler;
pub mod signal;

pub use config::{ConfigError, EscalationConfig, EscalationPolicy};
pub use escalator::{FatalityEscalator, ProcessEscalator, RecordingEscalator};
pub use guard::{ExceptionGuard, GuardOutcome};
pub use handle::{FaultHook, TaskHandle};
pub use launcher::TaskLauncher;
pub use monitor::{LaunchMetrics, MetricsSnapshot};
pub use scheduler::{BoxedWork, Job, ManualScheduler, Scheduler, TokioScheduler};
pub use signal::CancelSignal;

pub use warden_core::{
    Cancelled, CreationFlags, FatalSignal, Fault, Outcome, TaskError, TaskId, TaskState,
};
