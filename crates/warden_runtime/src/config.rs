//! Escalation configuration.

use serde::{Deserialize, Serialize};

/// What [`crate::ProcessEscalator`] does after logging a fatal fault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPolicy {
    /// Abort the process
    #[default]
    Abort,
    /// Log and keep running; for harnesses that must observe the fault
    LogOnly,
}

/// Escalation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Policy applied after reporting
    pub policy: EscalationPolicy,
    /// Component name attached to every report
    pub component: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            policy: EscalationPolicy::Abort,
            component: "warden".to_string(),
        }
    }
}

impl EscalationConfig {
    /// Set the policy
    #[must_use]
    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the component name
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Parse from JSON; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed or names an unknown policy
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.component.trim().is_empty() {
            return Err(ConfigError::EmptyComponent);
        }
        Ok(config)
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed JSON
    #[error("invalid escalation config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Component name must not be blank
    #[error("component name must not be empty")]
    EmptyComponent,
}
