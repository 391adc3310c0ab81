//! Processor hosting thread
//!
//! Every backend variant runs its processor on a dedicated thread. Control
//! messages arrive over a FIFO channel and are delivered in send order; events
//! go back over a second, unbounded channel that the controller drains on its
//! own thread, so the processor never blocks on emitting.
//!
//! Live hosts use an unbounded message queue and sends never block. The
//! offline host bounds its queue, so a chunked feed waits for the processor
//! instead of holding the whole buffer in flight.
//!
//! Readiness (the processor was built and registered) is reported once over a
//! bounded channel and memoized on the host side.

use super::{Processor, ProcessorRegistry};
use crate::error::{MeterError, Result};
use crate::events::{EventKind, MeasurementEvent, ModeSet};
use crate::message::ControlMessage;
use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendError, Sender, TryRecvError,
};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Outbound event handle given to a [`Processor`]
///
/// Drops `dataavailable` events for modes the session didn't request.
pub struct Emitter<'a> {
    events: &'a Sender<MeasurementEvent>,
    modes: ModeSet,
    emitted: usize,
}

impl<'a> Emitter<'a> {
    /// Emitter over `events`, accepting values for `modes` only
    ///
    /// Backends get one from their host; this is for driving a processor
    /// directly.
    pub fn new(events: &'a Sender<MeasurementEvent>, modes: ModeSet) -> Self {
        Self {
            events,
            modes,
            emitted: 0,
        }
    }

    /// Publish an event to the control plane
    pub fn emit(&mut self, event: MeasurementEvent) {
        if event.kind() == EventKind::DataAvailable {
            if let Some(mode) = event.mode() {
                if !self.modes.contains(mode) {
                    tracing::trace!(mode = %mode, "Dropping value for unrequested mode");
                    return;
                }
            }
        }

        // Receiver gone means the meter was dropped; nothing left to notify
        if self.events.send(event).is_ok() {
            self.emitted += 1;
        }
    }

    /// Modes requested for this session
    pub fn modes(&self) -> ModeSet {
        self.modes
    }

    /// Events actually delivered through this emitter
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// Wraps a processor and enforces the message contract
///
/// Nothing reaches the processor before `Initialize`, and a second
/// `Initialize` is ignored.
pub(crate) struct ContractGuard {
    processor: Box<dyn Processor>,
    modes: Option<ModeSet>,
}

impl ContractGuard {
    pub(crate) fn new(processor: Box<dyn Processor>) -> Self {
        Self {
            processor,
            modes: None,
        }
    }

    pub(crate) fn deliver(&mut self, message: ControlMessage, events: &Sender<MeasurementEvent>) {
        let modes = match (&message, self.modes) {
            (ControlMessage::Initialize { attributes }, None) => {
                tracing::debug!(
                    sample_rate = attributes.sample_rate,
                    modes = ?attributes.modes,
                    "Processor initialized"
                );
                self.modes = Some(attributes.modes);
                attributes.modes
            }
            (ControlMessage::Initialize { .. }, Some(_)) => {
                tracing::warn!("Ignoring repeated initialize message");
                return;
            }
            (_, None) => {
                tracing::warn!(
                    message = message.type_name(),
                    "Rejecting message sent before initialize"
                );
                return;
            }
            (_, Some(modes)) => modes,
        };

        let mut emitter = Emitter::new(events, modes);
        self.processor.handle(message, &mut emitter);
    }
}

/// Thread hosting one processor
pub(crate) struct BackendHost {
    name: String,
    messages: Option<Sender<ControlMessage>>,
    readiness: Receiver<std::result::Result<(), String>>,
    ready: OnceLock<std::result::Result<(), String>>,
    thread: Option<JoinHandle<()>>,
}

impl BackendHost {
    /// Spawn the hosting thread and start loading `endpoint`
    ///
    /// Returns immediately; loading completes asynchronously and is observed
    /// through [`BackendHost::poll_ready`] or [`BackendHost::wait_ready`].
    /// With a `capacity`, at most that many messages wait in the queue and
    /// [`BackendHost::send`] blocks until the processor catches up.
    pub(crate) fn spawn(
        name: String,
        endpoint: &str,
        registry: &ProcessorRegistry,
        events: Sender<MeasurementEvent>,
        capacity: Option<usize>,
    ) -> Result<Self> {
        let (message_tx, message_rx) = match capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        let (ready_tx, ready_rx) = bounded(1);
        let endpoint = endpoint.to_string();
        let registry = registry.clone();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(endpoint, registry, message_rx, events, ready_tx))
            .map_err(|e| {
                MeterError::backend_unavailable(format!("failed to spawn {}: {}", name, e))
            })?;

        Ok(Self {
            name,
            messages: Some(message_tx),
            readiness: ready_rx,
            ready: OnceLock::new(),
            thread: Some(thread),
        })
    }

    /// Queue a message for the processor
    ///
    /// # Errors
    /// `BackendUnavailable` if loading failed or the thread has exited.
    pub(crate) fn send(&self, message: ControlMessage) -> Result<()> {
        if let Some(Err(e)) = self.poll_ready() {
            return Err(e);
        }

        let sender = self
            .messages
            .as_ref()
            .ok_or_else(|| MeterError::backend_unavailable(format!("{} is shut down", self.name)))?;
        sender.send(message).map_err(|SendError(message)| {
            // A failed load closes the queue; report why it failed
            if let Some(Err(e)) = self.poll_ready() {
                return e;
            }
            MeterError::backend_unavailable(format!(
                "{} stopped accepting messages (dropped '{}')",
                self.name,
                message.type_name()
            ))
        })
    }

    /// Readiness without blocking; `None` while still loading
    pub(crate) fn poll_ready(&self) -> Option<Result<()>> {
        if let Some(result) = self.ready.get() {
            return Some(to_result(result));
        }

        match self.readiness.try_recv() {
            Ok(result) => Some(self.memoize(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.memoize(Err(format!(
                "{} exited before reporting readiness",
                self.name
            )))),
        }
    }

    /// Block until the processor is loaded, or `timeout` elapses
    ///
    /// A timeout is not memoized; a later call may still succeed.
    pub(crate) fn wait_ready(&self, timeout: Duration) -> Result<()> {
        if let Some(result) = self.ready.get() {
            return to_result(result);
        }

        match self.readiness.recv_timeout(timeout) {
            Ok(result) => self.memoize(result),
            Err(RecvTimeoutError::Timeout) => Err(MeterError::backend_unavailable(format!(
                "{} not ready after {:?}",
                self.name, timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => self.memoize(Err(format!(
                "{} exited before reporting readiness",
                self.name
            ))),
        }
    }

    fn memoize(&self, result: std::result::Result<(), String>) -> Result<()> {
        to_result(self.ready.get_or_init(|| result))
    }
}

impl Drop for BackendHost {
    fn drop(&mut self) {
        // Closing the message channel ends the thread's receive loop
        self.messages.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::warn!(backend = %self.name, "Processor thread panicked");
            }
        }
    }
}

fn to_result(result: &std::result::Result<(), String>) -> Result<()> {
    result.clone().map_err(MeterError::BackendUnavailable)
}

fn run(
    endpoint: String,
    registry: ProcessorRegistry,
    messages: Receiver<ControlMessage>,
    events: Sender<MeasurementEvent>,
    ready: Sender<std::result::Result<(), String>>,
) {
    let processor = match registry.instantiate(&endpoint) {
        Ok(processor) => processor,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, "Failed to load processor: {}", e);
            let reason = match e {
                MeterError::BackendUnavailable(reason) => reason,
                other => other.to_string(),
            };
            let _ = ready.send(Err(reason));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    tracing::debug!(endpoint = %endpoint, "Processor registered");

    let mut guard = ContractGuard::new(processor);
    for message in messages.iter() {
        guard.deliver(message, &events);
    }

    tracing::debug!(endpoint = %endpoint, "Processor thread exiting");
}
