//! Session lifecycle types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a loudness session
///
/// `stop` always returns to `Inactive`; a stopped meter can be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Not measuring
    #[default]
    Inactive,

    /// Measuring audio
    Recording,

    /// Session open, audio ignored
    Paused,
}

impl SessionState {
    /// Lowercase name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }

    /// Whether `action` is legal from this state
    pub fn allows(&self, action: LifecycleAction) -> bool {
        match action {
            LifecycleAction::Start => *self == Self::Inactive,
            LifecycleAction::Pause | LifecycleAction::Resume | LifecycleAction::Stop => {
                *self != Self::Inactive
            }
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State-changing action on a session
///
/// `reset` is deliberately absent: it is legal everywhere and never changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl LifecycleAction {
    /// State the session moves to once the action succeeds
    pub fn target(&self) -> SessionState {
        match self {
            Self::Start | Self::Resume => SessionState::Recording,
            Self::Pause => SessionState::Paused,
            Self::Stop => SessionState::Inactive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
