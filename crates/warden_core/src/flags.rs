//! Creation flags passed through to the scheduler.
//!
//! The launcher never interprets these; schedulers decide what each bit means
//! for their execution context.

use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Opaque creation options for a launched work item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreationFlags(u8);

impl CreationFlags {
    /// No options
    pub const NONE: Self = Self(0);
    /// Work is expected to block for a long time; run it on a dedicated context
    pub const LONG_RUNNING: Self = Self(1 << 0);
    /// Hint that the work should be scheduled in submission order
    pub const PREFER_FAIRNESS: Self = Self(1 << 1);

    /// Create from raw bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit in `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bit is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CreationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CreationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
