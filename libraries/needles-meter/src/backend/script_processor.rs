//! Worker-thread backend behind a buffering node
//!
//! Audio is accumulated until a full buffer of 1024 frames is available;
//! each full buffer becomes one `Process` message. A partial tail waits
//! for the next push.

use super::{BackendHost, BackendKind, ProcessorRegistry};
use crate::error::Result;
use crate::events::MeasurementEvent;
use crate::message::ControlMessage;
use crossbeam_channel::Sender;

/// Frames per buffering-node callback
pub const SCRIPT_PROCESSOR_BUFFER_SIZE: usize = 1024;

pub(crate) struct ScriptProcessorBackend {
    host: BackendHost,
    pending: Vec<Vec<f32>>,
}

impl ScriptProcessorBackend {
    pub(crate) fn spawn(
        worker: &str,
        registry: &ProcessorRegistry,
        events: Sender<MeasurementEvent>,
    ) -> Result<Self> {
        tracing::debug!(worker = %worker, "Starting worker");
        let host = BackendHost::spawn(
            BackendKind::ScriptProcessor.thread_name(),
            worker,
            registry,
            events,
            None,
        )?;
        Ok(Self {
            host,
            pending: Vec::new(),
        })
    }

    pub(crate) fn host(&self) -> &BackendHost {
        &self.host
    }

    /// Buffer `block` and queue every complete buffer
    ///
    /// Returns the number of `Process` messages sent.
    pub(crate) fn push_audio(&mut self, block: Vec<Vec<f32>>) -> Result<usize> {
        if self.pending.len() != block.len() {
            if self.pending.iter().any(|c| !c.is_empty()) {
                tracing::warn!(
                    from = self.pending.len(),
                    to = block.len(),
                    "Channel count changed, discarding buffered audio"
                );
            }
            self.pending = vec![Vec::with_capacity(SCRIPT_PROCESSOR_BUFFER_SIZE); block.len()];
        }
        for (pending, samples) in self.pending.iter_mut().zip(block) {
            pending.extend(samples);
        }

        let mut sent = 0;
        while self.buffered() >= SCRIPT_PROCESSOR_BUFFER_SIZE {
            let buffer = self
                .pending
                .iter_mut()
                .map(|c| c.drain(..SCRIPT_PROCESSOR_BUFFER_SIZE).collect())
                .collect();
            self.host.send(ControlMessage::process(buffer))?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Frames waiting for a full buffer
    pub(crate) fn buffered(&self) -> usize {
        self.pending.first().map_or(0, Vec::len)
    }
}
