//! Error types for the metering control plane

use crate::state::{LifecycleAction, SessionState};
use thiserror::Error;

/// Result type for metering operations
pub type Result<T> = std::result::Result<T, MeterError>;

/// Errors that can occur while configuring or driving a loudness meter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeterError {
    /// Bad sample rate, empty mode set, malformed buffer
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No usable processing endpoint, or an operation the session kind can't serve
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lifecycle action attempted from a state that doesn't allow it
    #[error("Failed to execute '{action}' on 'Needles': The Needles's state is '{state}'.")]
    InvalidState {
        /// The action that was attempted
        action: LifecycleAction,
        /// The state the controller was in (and still is)
        state: SessionState,
    },

    /// The processing backend failed to initialize or has gone away
    #[error("Processing backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl MeterError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_message_names_action_and_state() {
        let err = MeterError::InvalidState {
            action: LifecycleAction::Start,
            state: SessionState::Recording,
        };
        assert_eq!(
            err.to_string(),
            "Failed to execute 'start' on 'Needles': The Needles's state is 'recording'."
        );
    }

    #[test]
    fn helper_constructors() {
        assert_eq!(
            MeterError::configuration("no processing endpoint provided"),
            MeterError::Configuration("no processing endpoint provided".to_string())
        );
        assert!(matches!(
            MeterError::backend_unavailable("gone"),
            MeterError::BackendUnavailable(_)
        ));
    }
}
