//! Failure payloads captured from background work.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Marker error raised by work that observed cooperative cancellation.
///
/// Work items return it (directly or wrapped in context) from
/// `CancelSignal::check`, or panic with it as the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, thiserror::Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

/// A failure that escaped a work item.
///
/// Cloning is cheap and preserves identity: every clone of an `Error` or
/// `Panic` fault points at the same allocation, see [`Fault::same_as`].
#[derive(Debug, Clone)]
pub enum Fault {
    /// The work item returned an error
    Error(Arc<anyhow::Error>),
    /// The work item panicked
    Panic {
        /// Panic message, or a placeholder for non-string payloads
        message: Arc<str>,
    },
    /// Left on a synchronous handle after escalation has already run.
    ///
    /// Carries nothing actionable; the escalator saw the real fault.
    Unreachable,
}

impl Fault {
    /// Wrap an error returned by a work item
    #[must_use]
    pub fn from_error(err: impl Into<anyhow::Error>) -> Self {
        Self::Error(Arc::new(err.into()))
    }

    /// Convert a payload caught by `catch_unwind`
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if payload.is::<Cancelled>() {
            return Self::from_error(Cancelled);
        }
        let message: Arc<str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("Box<dyn Any>")
        };
        Self::Panic { message }
    }

    /// True when the error chain contains [`Cancelled`]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Error(err) => err.chain().any(|cause| cause.is::<Cancelled>()),
            Self::Panic { .. } | Self::Unreachable => false,
        }
    }

    /// True for the post-escalation placeholder
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable)
    }

    /// Identity comparison: both values are clones of the same captured fault.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Error(a), Self::Error(b)) => Arc::ptr_eq(a, b),
            (Self::Panic { message: a }, Self::Panic { message: b }) => Arc::ptr_eq(a, b),
            (Self::Unreachable, Self::Unreachable) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => write!(f, "{:#}", err),
            Self::Panic { message } => write!(f, "panicked: {}", message),
            Self::Unreachable => write!(f, "unreachable: failure already escalated"),
        }
    }
}
