//! Launch metrics.
//!
//! Counters are updated from whichever thread settles a handle, so they are
//! plain atomics rather than a locked struct.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use warden_core::TaskState;

/// Live launch counters
#[derive(Debug, Default)]
pub struct LaunchMetrics {
    launched: AtomicU64,
    completed: AtomicU64,
    canceled: AtomicU64,
    faulted: AtomicU64,
    escalated: AtomicU64,
}

impl LaunchMetrics {
    /// Create zeroed metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a launch
    pub fn record_launch(&self) {
        self.launched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handle settling into `state`; non-terminal states are ignored
    pub fn record_settled(&self, state: TaskState) {
        let counter = match state {
            TaskState::Completed => &self.completed,
            TaskState::Canceled => &self.canceled,
            TaskState::Faulted => &self.faulted,
            TaskState::Created | TaskState::Scheduled | TaskState::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one escalation
    pub fn record_escalation(&self) {
        self.escalated.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            launched: self.launched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
            escalated: self.escalated.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.launched,
            &self.completed,
            &self.canceled,
            &self.faulted,
            &self.escalated,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Work items launched
    pub launched: u64,
    /// Handles settled `Completed`
    pub completed: u64,
    /// Handles settled `Canceled`
    pub canceled: u64,
    /// Handles settled `Faulted`
    pub faulted: u64,
    /// Escalations performed
    pub escalated: u64,
}

impl MetricsSnapshot {
    /// Handles that reached a terminal state
    #[must_use]
    pub const fn settled(&self) -> u64 {
        self.completed + self.canceled + self.faulted
    }

    /// Launched but not yet settled
    #[must_use]
    pub const fn in_flight(&self) -> u64 {
        self.launched.saturating_sub(self.settled())
    }

    /// Get success rate (0.0 - 1.0)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let settled = self.settled();
        if settled == 0 {
            return 1.0;
        }
        self.completed as f64 / settled as f64
    }

    /// Get failure rate (0.0 - 1.0)
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let settled = self.settled();
        if settled == 0 {
            return 0.0;
        }
        self.faulted as f64 / settled as f64
    }

    /// Serialize to JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let snapshot = LaunchMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.success_rate(), 1.0);
        assert_eq!(snapshot.failure_rate(), 0.0);
    }

    #[test]
    fn test_record_settled() {
        let metrics = LaunchMetrics::new();
        for _ in 0..4 {
            metrics.record_launch();
        }
        metrics.record_settled(TaskState::Completed);
        metrics.record_settled(TaskState::Completed);
        metrics.record_settled(TaskState::Faulted);
        metrics.record_settled(TaskState::Running);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.faulted, 1);
        assert_eq!(snapshot.settled(), 3);
        assert_eq!(snapshot.in_flight(), 1);
        assert!((snapshot.success_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!((snapshot.failure_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = LaunchMetrics::new();
        metrics.record_launch();
        metrics.record_escalation();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = LaunchMetrics::new();
        metrics.record_launch();
        metrics.record_settled(TaskState::Canceled);
        let json = metrics.snapshot().to_json().unwrap();
        assert!(json.contains("\"canceled\":1"));
        let back: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.launched, 1);
    }
}
