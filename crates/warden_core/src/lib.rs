//! WARDEN Core Types
//!
//! Pure types shared by the launcher and its collaborators.
//! Nothing in this crate schedules work or performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod error;
pub mod fault;
pub mod flags;
pub mod id;
pub mod state;

// Re-exports
pub use classify::{FatalSignal, classify};
pub use error::{TaskError, TaskResult};
pub use fault::{Cancelled, Fault};
pub use flags::CreationFlags;
pub use id::TaskId;
pub use state::{Outcome, TaskState};
