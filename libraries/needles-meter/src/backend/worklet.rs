//! Rendering-thread backend
//!
//! The processor sees audio in render quanta, so pushed blocks are split
//! into 128-frame pieces before they're queued.

use super::{BackendHost, BackendKind, ProcessorRegistry};
use crate::error::Result;
use crate::events::MeasurementEvent;
use crate::message::ControlMessage;
use crossbeam_channel::Sender;

/// Frames per render quantum
pub const RENDER_QUANTUM_FRAMES: usize = 128;

pub(crate) struct WorkletBackend {
    host: BackendHost,
}

impl WorkletBackend {
    pub(crate) fn spawn(
        module: &str,
        registry: &ProcessorRegistry,
        events: Sender<MeasurementEvent>,
    ) -> Result<Self> {
        tracing::debug!(module = %module, "Loading worklet module");
        let host = BackendHost::spawn(
            BackendKind::Worklet.thread_name(),
            module,
            registry,
            events,
            None,
        )?;
        Ok(Self { host })
    }

    pub(crate) fn host(&self) -> &BackendHost {
        &self.host
    }

    /// Queue `block` one render quantum at a time
    ///
    /// Returns the number of `Process` messages sent.
    pub(crate) fn push_audio(&mut self, block: Vec<Vec<f32>>) -> Result<usize> {
        let frames = block.first().map_or(0, Vec::len);
        if frames <= RENDER_QUANTUM_FRAMES {
            if frames > 0 {
                self.host.send(ControlMessage::process(block))?;
                return Ok(1);
            }
            return Ok(0);
        }

        let mut sent = 0;
        for start in (0..frames).step_by(RENDER_QUANTUM_FRAMES) {
            let end = (start + RENDER_QUANTUM_FRAMES).min(frames);
            let quantum = block.iter().map(|c| c[start..end].to_vec()).collect();
            self.host.send(ControlMessage::process(quantum))?;
            sent += 1;
        }
        Ok(sent)
    }
}
