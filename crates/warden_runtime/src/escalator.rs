//! Fatal escalation boundary.
//!
//! The launcher never decides what "fatal" means for the process. It hands
//! captured faults to an injected [`FatalityEscalator`], which classifies and
//! reports them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::error;
use warden_core::{FatalSignal, Fault, classify};

use crate::config::{EscalationConfig, EscalationPolicy};
use crate::signal::CancelSignal;

/// Process-level escalation service
pub trait FatalityEscalator: Send + Sync {
    /// Escalate unconditionally.
    fn report(&self, fault: &Fault);

    /// Classify `fault` against `signal`; escalate if it is fatal.
    ///
    /// On [`FatalSignal::Fatal`] the report has already happened when this
    /// returns.
    fn report_unless_cancelled(&self, fault: &Fault, signal: &CancelSignal) -> FatalSignal {
        let verdict = classify(fault, signal.is_cancellation_requested());
        if verdict.is_fatal() {
            self.report(fault);
        }
        verdict
    }
}

/// Escalator that logs the fault and then applies its [`EscalationPolicy`]
#[derive(Debug, Clone, Default)]
pub struct ProcessEscalator {
    config: EscalationConfig,
}

impl ProcessEscalator {
    /// Create with the given configuration
    #[must_use]
    pub fn new(config: EscalationConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }
}

impl FatalityEscalator for ProcessEscalator {
    fn report(&self, fault: &Fault) {
        error!(
            component = %self.config.component,
            policy = ?self.config.policy,
            fault = %fault,
            "unhandled failure in background work"
        );
        match self.config.policy {
            EscalationPolicy::Abort => std::process::abort(),
            EscalationPolicy::LogOnly => {}
        }
    }
}

/// Escalator that records every call instead of tearing anything down.
///
/// Intended for tests and harnesses that need to observe escalation.
#[derive(Debug, Default)]
pub struct RecordingEscalator {
    reports: Mutex<Vec<Fault>>,
    classifications: AtomicUsize,
}

impl RecordingEscalator {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `report` calls so far
    #[must_use]
    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of `report_unless_cancelled` calls so far
    #[must_use]
    pub fn classification_count(&self) -> usize {
        self.classifications.load(Ordering::SeqCst)
    }

    /// Faults reported so far, in order
    #[must_use]
    pub fn reports(&self) -> Vec<Fault> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl FatalityEscalator for RecordingEscalator {
    fn report(&self, fault: &Fault) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fault.clone());
    }

    fn report_unless_cancelled(&self, fault: &Fault, signal: &CancelSignal) -> FatalSignal {
        self.classifications.fetch_add(1, Ordering::SeqCst);
        let verdict = classify(fault, signal.is_cancellation_requested());
        if verdict.is_fatal() {
            self.report(fault);
        }
        verdict
    }
}
