//! Offline backend
//!
//! No audio node: the controller weights the source buffer itself and feeds
//! it to the worker in fixed-size chunks. The queue holds one chunk, so the
//! feed keeps pace with the worker.

use super::{BackendHost, BackendKind, ProcessorRegistry};
use crate::error::Result;
use crate::events::MeasurementEvent;
use crossbeam_channel::Sender;

/// Messages allowed to wait in the offline worker's queue
const OFFLINE_QUEUE_DEPTH: usize = 1;

pub(crate) struct OfflineBackend {
    host: BackendHost,
}

impl OfflineBackend {
    pub(crate) fn spawn(
        worker: &str,
        registry: &ProcessorRegistry,
        events: Sender<MeasurementEvent>,
    ) -> Result<Self> {
        tracing::debug!(worker = %worker, "Starting offline worker");
        let host = BackendHost::spawn(
            BackendKind::Offline.thread_name(),
            worker,
            registry,
            events,
            Some(OFFLINE_QUEUE_DEPTH),
        )?;
        Ok(Self { host })
    }

    pub(crate) fn host(&self) -> &BackendHost {
        &self.host
    }
}
