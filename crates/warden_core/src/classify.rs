//! Cancellation-vs-fatal classification.
//!
//! Classification is a pure total function over the captured fault and the
//! state of the cancellation signal. Escalation side effects live with the
//! escalator, not here.

use serde::{Deserialize, Serialize};

use crate::fault::Fault;

/// Verdict over a captured fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FatalSignal {
    /// Cooperative cancellation; benign and silent
    CancellationCompatible,
    /// Anything else; must be escalated
    Fatal,
}

impl FatalSignal {
    /// True for [`FatalSignal::Fatal`]
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Classify a fault.
///
/// A fault is cancellation-compatible only when it carries [`crate::Cancelled`]
/// and the signal supplied with the work has actually been cancelled. A
/// `Cancelled` raised under a signal that never fired is a bug in the work
/// item and is treated as fatal.
#[must_use]
pub fn classify(fault: &Fault, cancellation_requested: bool) -> FatalSignal {
    if cancellation_requested && fault.is_cancellation() {
        FatalSignal::CancellationCompatible
    } else {
        FatalSignal::Fatal
    }
}
