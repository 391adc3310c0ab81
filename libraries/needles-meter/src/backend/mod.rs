//! Processing backends
//!
//! A [`Processor`] does the actual loudness accumulation. The control plane
//! never calls it directly: each backend variant hosts one processor on its
//! own thread and talks to it only through [`ControlMessage`]s, receiving
//! [`MeasurementEvent`]s back.
//!
//! Three hosting variants exist, differing in how audio reaches the processor:
//!
//! | Variant | Audio path | Block size |
//! |---------|------------|------------|
//! | [`BackendKind::Worklet`] | rendering thread, fed per render quantum | 128 frames |
//! | [`BackendKind::ScriptProcessor`] | worker thread, fed by a buffering node | 1024 frames |
//! | [`BackendKind::Offline`] | worker thread, fed by the chunked feed | 16384 frames |

mod host;
mod offline;
mod registry;
mod script_processor;
mod worklet;

pub(crate) use host::BackendHost;
pub use host::Emitter;
pub(crate) use offline::OfflineBackend;
pub use registry::{ProcessorFactory, ProcessorRegistry};
pub(crate) use script_processor::ScriptProcessorBackend;
pub(crate) use worklet::WorkletBackend;

pub use script_processor::SCRIPT_PROCESSOR_BUFFER_SIZE;
pub use worklet::RENDER_QUANTUM_FRAMES;

use crate::error::{MeterError, Result};
use crate::message::ControlMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loudness processing algorithm hosted by a backend
///
/// Implementations receive every message in send order, starting with
/// `Initialize`; the host rejects anything sent before it and drops
/// `DataAvailable` events for modes that weren't requested.
pub trait Processor: Send {
    /// Handle one control message, emitting any resulting events
    fn handle(&mut self, message: ControlMessage, emitter: &mut Emitter<'_>);
}

impl<F> Processor for F
where
    F: FnMut(ControlMessage, &mut Emitter<'_>) + Send,
{
    fn handle(&mut self, message: ControlMessage, emitter: &mut Emitter<'_>) {
        self(message, emitter);
    }
}

/// Which hosting strategy a meter ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Non-realtime session; no audio node, messages go straight to the worker
    Offline,
    /// Processor on the audio rendering thread
    Worklet,
    /// Processor on a worker thread behind a buffering node
    ScriptProcessor,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Worklet => "worklet",
            Self::ScriptProcessor => "script-processor",
        }
    }

    /// Name of the thread hosting this variant's processor
    pub(crate) fn thread_name(&self) -> String {
        format!("needles-{}", self.name())
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the backend variant and the endpoint it will load
///
/// Checked in order: offline sessions use the worker endpoint on the
/// offline backend; otherwise a worklet endpoint wins over a worker one.
pub fn select_backend<'a>(
    offline: bool,
    worklet_endpoint: Option<&'a str>,
    worker_endpoint: Option<&'a str>,
) -> Result<(BackendKind, &'a str)> {
    if offline {
        return worker_endpoint
            .map(|endpoint| (BackendKind::Offline, endpoint))
            .ok_or_else(|| {
                MeterError::configuration("offline sessions require a worker endpoint")
            });
    }
    if let Some(endpoint) = worklet_endpoint {
        return Ok((BackendKind::Worklet, endpoint));
    }
    if let Some(endpoint) = worker_endpoint {
        return Ok((BackendKind::ScriptProcessor, endpoint));
    }
    Err(MeterError::configuration("no processing endpoint provided"))
}
