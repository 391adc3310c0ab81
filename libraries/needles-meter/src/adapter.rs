//! Backend adapter
//!
//! Uniform face over the three backend variants. The controller only ever
//! sends messages, pushes live audio and drains events through this type;
//! which variant sits behind it is decided once, at construction.

use crate::backend::{
    select_backend, BackendHost, BackendKind, OfflineBackend, ProcessorRegistry,
    ScriptProcessorBackend, WorkletBackend,
};
use crate::error::{MeterError, Result};
use crate::events::MeasurementEvent;
use crate::message::ControlMessage;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::time::Duration;

enum Backend {
    Offline(OfflineBackend),
    Worklet(WorkletBackend),
    ScriptProcessor(ScriptProcessorBackend),
}

/// Endpoints a meter may load its processor from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    /// Worklet module name (rendering-thread backend)
    pub worklet: Option<String>,
    /// Worker script name (worker-thread and offline backends)
    pub worker: Option<String>,
}

impl Endpoints {
    pub fn worker(name: impl Into<String>) -> Self {
        Self {
            worklet: None,
            worker: Some(name.into()),
        }
    }

    pub fn worklet(name: impl Into<String>) -> Self {
        Self {
            worklet: Some(name.into()),
            worker: None,
        }
    }
}

pub(crate) struct BackendAdapter {
    backend: Backend,
    events: Receiver<MeasurementEvent>,
}

impl BackendAdapter {
    /// Select a variant and start loading its processor
    pub(crate) fn new(
        offline: bool,
        endpoints: &Endpoints,
        registry: &ProcessorRegistry,
    ) -> Result<Self> {
        let (kind, endpoint) = select_backend(
            offline,
            endpoints.worklet.as_deref(),
            endpoints.worker.as_deref(),
        )?;
        tracing::debug!(endpoint = %endpoint, "Using {} backend", kind);

        let (events_tx, events) = unbounded();
        let backend = match kind {
            BackendKind::Offline => {
                Backend::Offline(OfflineBackend::spawn(endpoint, registry, events_tx)?)
            }
            BackendKind::Worklet => {
                Backend::Worklet(WorkletBackend::spawn(endpoint, registry, events_tx)?)
            }
            BackendKind::ScriptProcessor => Backend::ScriptProcessor(
                ScriptProcessorBackend::spawn(endpoint, registry, events_tx)?,
            ),
        };

        Ok(Self { backend, events })
    }

    pub(crate) fn kind(&self) -> BackendKind {
        match self.backend {
            Backend::Offline(_) => BackendKind::Offline,
            Backend::Worklet(_) => BackendKind::Worklet,
            Backend::ScriptProcessor(_) => BackendKind::ScriptProcessor,
        }
    }

    fn host(&self) -> &BackendHost {
        match &self.backend {
            Backend::Offline(b) => b.host(),
            Backend::Worklet(b) => b.host(),
            Backend::ScriptProcessor(b) => b.host(),
        }
    }

    /// Queue one message; delivery order matches call order
    pub(crate) fn send(&self, message: ControlMessage) -> Result<()> {
        tracing::trace!(message = message.type_name(), backend = %self.kind(), "Sending");
        self.host().send(message)
    }

    /// Feed one block of weighted live audio to the backend's input node
    ///
    /// Returns the number of `Process` messages this produced.
    pub(crate) fn push_audio(&mut self, block: Vec<Vec<f32>>) -> Result<usize> {
        match &mut self.backend {
            Backend::Worklet(b) => b.push_audio(block),
            Backend::ScriptProcessor(b) => b.push_audio(block),
            Backend::Offline(_) => Err(MeterError::configuration(
                "offline sessions are fed from their source buffer",
            )),
        }
    }

    pub(crate) fn poll_ready(&self) -> Option<Result<()>> {
        self.host().poll_ready()
    }

    pub(crate) fn wait_ready(&self, timeout: Duration) -> Result<()> {
        self.host().wait_ready(timeout)
    }

    /// Events already produced by the processor, without blocking
    pub(crate) fn try_events(&self) -> Vec<MeasurementEvent> {
        self.events.try_iter().collect()
    }

    /// Wait up to `timeout` for at least one event, then take everything queued
    pub(crate) fn events_timeout(&self, timeout: Duration) -> Vec<MeasurementEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(first) => {
                let mut events = vec![first];
                events.extend(self.events.try_iter());
                events
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }
}
