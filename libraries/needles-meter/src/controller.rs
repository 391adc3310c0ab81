//! Loudness session controller
//!
//! Owns the session state, the backend adapter and the event bus. Every
//! lifecycle call is validated against the current state, forwarded to the
//! backend as one message, and only then applied locally.

use crate::adapter::{BackendAdapter, Endpoints};
use crate::audio::MeterSource;
use crate::backend::{BackendKind, ProcessorRegistry};
use crate::bus::{EventBus, ListenerId};
use crate::error::{MeterError, Result};
use crate::events::{EventKind, MeasurementEvent, ModeSet};
use crate::filter::FilterCascade;
use crate::message::ControlMessage;
use crate::state::{LifecycleAction, SessionState};
use std::time::Duration;

/// Frames per channel in each offline `Process` message
pub const OFFLINE_CHUNK_FRAMES: usize = 16384;

/// Lifecycle state machine for one metering session
pub struct LoudnessController {
    state: SessionState,
    source: MeterSource,
    cascade: FilterCascade,
    modes: ModeSet,
    adapter: BackendAdapter,
    bus: EventBus,
}

impl LoudnessController {
    /// Select a backend and send it the `Initialize` message
    ///
    /// # Errors
    /// `InvalidParameter` for an empty mode set, `Configuration` when no
    /// endpoint fits the source.
    pub(crate) fn new(
        source: MeterSource,
        cascade: FilterCascade,
        modes: ModeSet,
        endpoints: &Endpoints,
        registry: &ProcessorRegistry,
    ) -> Result<Self> {
        if modes.is_empty() {
            return Err(MeterError::invalid_parameter(
                "at least one measurement mode is required",
            ));
        }

        let adapter = BackendAdapter::new(source.is_offline(), endpoints, registry)?;
        adapter.send(ControlMessage::initialize(source.sample_rate(), modes))?;

        Ok(Self {
            state: SessionState::Inactive,
            source,
            cascade,
            modes,
            adapter,
            bus: EventBus::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn modes(&self) -> ModeSet {
        self.modes
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.adapter.kind()
    }

    /// Begin recording
    ///
    /// Offline sessions then weight the source buffer chunk by chunk and queue
    /// it to the backend before returning. If that feed fails the session
    /// falls back to `Inactive`.
    pub fn start(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Start, ControlMessage::Record)?;
        if !self.source.is_offline() {
            return Ok(());
        }

        if let Err(e) = self.feed() {
            tracing::warn!("Offline feed failed: {}", e);
            self.state = SessionState::Inactive;
            return Err(e);
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Pause, ControlMessage::Pause)
    }

    pub fn resume(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Resume, ControlMessage::Resume)
    }

    /// Stop the session; the controller can be started again afterwards
    ///
    /// The session returns to `Inactive` even when the backend is gone, in
    /// which case the delivery error is still returned.
    pub fn stop(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Stop, ControlMessage::Stop)
    }

    /// Clear the backend's accumulated measurements, keeping the state
    pub fn reset(&mut self) -> Result<()> {
        self.adapter.send(ControlMessage::Reset)?;
        tracing::debug!(state = %self.state, "Reset");
        Ok(())
    }

    fn transition(&mut self, action: LifecycleAction, message: ControlMessage) -> Result<()> {
        if !self.state.allows(action) {
            return Err(MeterError::InvalidState {
                action,
                state: self.state,
            });
        }

        let sent = self.adapter.send(message);
        // Stop always ends the session, even when the backend is gone
        if sent.is_err() && action != LifecycleAction::Stop {
            return sent;
        }

        let from = self.state;
        self.state = action.target();
        tracing::debug!(%action, %from, to = %self.state, "State transition");
        sent
    }

    /// Feed one block of live audio
    ///
    /// `block` holds one slice per source channel, all the same length. The
    /// audio is K-weighted here and handed to the backend's input node.
    /// Returns the number of `Process` messages this produced.
    pub fn process<C: AsRef<[f32]>>(&mut self, block: &[C]) -> Result<usize> {
        let channels = match &self.source {
            MeterSource::Live { channels, .. } => *channels,
            MeterSource::Offline(_) => {
                return Err(MeterError::configuration(
                    "offline sessions are fed from their source buffer",
                ))
            }
        };
        if block.len() != channels {
            return Err(MeterError::invalid_parameter(format!(
                "expected {} channels, got {}",
                channels,
                block.len()
            )));
        }
        let frames = block.first().map_or(0, |c| c.as_ref().len());
        if block.iter().any(|c| c.as_ref().len() != frames) {
            return Err(MeterError::invalid_parameter(
                "all channels in a block must have the same length",
            ));
        }

        let mut weighted: Vec<Vec<f32>> = block.iter().map(|c| c.as_ref().to_vec()).collect();
        self.cascade.process(&mut weighted);
        self.adapter.push_audio(weighted)
    }

    /// Queue the offline buffer: the duration hint, then one K-weighted
    /// `Process` message per chunk
    ///
    /// Each chunk is copied and filtered on its own, carrying filter state
    /// across chunks. Returns the number of `Process` messages sent.
    fn feed(&mut self) -> Result<usize> {
        let MeterSource::Offline(buffer) = &self.source else {
            return Ok(0);
        };
        self.adapter
            .send(ControlMessage::duration(buffer.duration_ms()))?;

        self.cascade.reset();
        let frames = buffer.len();
        let mut sent = 0;
        for start in (0..frames).step_by(OFFLINE_CHUNK_FRAMES) {
            let mut chunk = buffer.copy_block(start, OFFLINE_CHUNK_FRAMES);
            self.cascade.process(&mut chunk);
            self.adapter.send(ControlMessage::process(chunk))?;
            sent += 1;
        }

        tracing::debug!(
            frames,
            chunks = sent,
            duration_ms = buffer.duration_ms(),
            "Offline feed queued"
        );
        Ok(sent)
    }

    /// Block until the backend has loaded its processor
    pub fn wait_ready(&self, timeout: Duration) -> Result<()> {
        self.adapter.wait_ready(timeout)
    }

    /// Backend readiness without blocking; `None` while still loading
    pub fn poll_ready(&self) -> Option<Result<()>> {
        self.adapter.poll_ready()
    }

    /// Dispatch every event the backend has produced so far
    ///
    /// Listeners run on the calling thread. Returns the number of events
    /// dispatched.
    pub fn pump_events(&self) -> usize {
        self.dispatch_all(self.adapter.try_events())
    }

    /// Like [`pump_events`](Self::pump_events), but waits up to `timeout` for
    /// the first event
    pub fn pump_events_timeout(&self, timeout: Duration) -> usize {
        self.dispatch_all(self.adapter.events_timeout(timeout))
    }

    fn dispatch_all(&self, events: Vec<MeasurementEvent>) -> usize {
        for event in &events {
            let listeners = self.bus.dispatch(event);
            tracing::trace!(event = %event.kind(), listeners, "Dispatched");
        }
        events.len()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&MeasurementEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, listener)
    }

    /// Remove one listener, or all listeners of `kind` when `id` is `None`
    pub fn unsubscribe(&self, kind: EventKind, id: Option<ListenerId>) -> usize {
        self.bus.unsubscribe(kind, id)
    }

    pub fn unsubscribe_all(&self) {
        self.bus.unsubscribe_all();
    }

    /// Handle to the listener registry, for listeners that manage their own
    /// subscriptions
    pub fn events(&self) -> EventBus {
        self.bus.clone()
    }
}
