//! Control messages sent to a processing backend
//!
//! The serde form is the wire contract shared with external backends:
//! `{"type": "initialize", "attributes": {"sampleRate": 48000, "modes": [...]}}`,
//! `{"type": "process", "input": [[...], [...]]}`, `{"type": "set", "key": ..., "value": ...}`
//! and bare `{"type": "record"}` style messages for the rest.

use crate::events::ModeSet;
use serde::{Deserialize, Serialize};

/// Key of the offline duration hint (value in milliseconds)
pub const DURATION_KEY: &str = "duration";

/// Settings carried by the `Initialize` message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeAttributes {
    pub sample_rate: f64,
    pub modes: ModeSet,
}

/// Message from the control plane to a processing backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Configure sample rate and requested modes; always the first message
    Initialize { attributes: InitializeAttributes },

    /// One block of planar, K-weighted audio
    Process { input: Vec<Vec<f32>> },

    Record,
    Pause,
    Resume,
    Stop,

    /// Clear accumulators without touching the lifecycle
    Reset,

    /// Backend parameter, e.g. the offline duration hint
    #[serde(rename = "set")]
    SetParam { key: String, value: f64 },
}

impl ControlMessage {
    pub fn initialize(sample_rate: f64, modes: ModeSet) -> Self {
        Self::Initialize {
            attributes: InitializeAttributes { sample_rate, modes },
        }
    }

    pub fn process(input: Vec<Vec<f32>>) -> Self {
        Self::Process { input }
    }

    /// Offline duration hint in milliseconds
    pub fn duration(duration_ms: f64) -> Self {
        Self::SetParam {
            key: DURATION_KEY.to_string(),
            value: duration_ms,
        }
    }

    /// Wire name of the message type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::Process { .. } => "process",
            Self::Record => "record",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::SetParam { .. } => "set",
        }
    }

    /// Frames per channel in a `Process` block
    pub fn block_len(&self) -> Option<usize> {
        match self {
            Self::Process { input } => Some(input.first().map_or(0, Vec::len)),
            _ => None,
        }
    }
}
