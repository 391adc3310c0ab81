//! Loudness meter
//!
//! Public entry point. Designs the K-weighting cascade for the source, wires
//! it in front of the selected backend and exposes the session lifecycle.
//!
//! ```no_run
//! use needles_meter::{AudioBuffer, EventKind, LoudnessMeter, MeterOptions, ProcessorRegistry};
//! use std::time::Duration;
//!
//! # fn main() -> needles_meter::Result<()> {
//! # let registry = ProcessorRegistry::new();
//! let buffer = AudioBuffer::new(48000.0, vec![vec![0.0; 48000]])?;
//! let mut meter = LoudnessMeter::new(MeterOptions::new(buffer, registry))?;
//! meter.subscribe(EventKind::DataAvailable, |event| println!("{:?}", event.measurement()));
//! meter.start()?;
//! meter.pump_events_timeout(Duration::from_secs(1));
//! # Ok(())
//! # }
//! ```

use crate::backend::BackendKind;
use crate::bus::{EventBus, ListenerId};
use crate::coefficients::FilterCoefficients;
use crate::controller::LoudnessController;
use crate::error::{MeterError, Result};
use crate::events::{EventKind, MeasurementEvent, ModeSet};
use crate::filter::FilterCascade;
use crate::settings::MeterOptions;
use crate::state::SessionState;
use std::time::Duration;

/// Loudness meter attached to one audio source
pub struct LoudnessMeter {
    controller: LoudnessController,
    pre_filter: FilterCoefficients,
    weighting_filter: FilterCoefficients,
}

impl LoudnessMeter {
    /// Build a meter and start loading its backend
    ///
    /// # Errors
    /// `InvalidParameter` for a bad sample rate, channel count or empty mode
    /// set; `Configuration` when no endpoint fits the source.
    pub fn new(options: MeterOptions) -> Result<Self> {
        let endpoints = options.endpoints();
        let MeterOptions {
            source,
            modes,
            registry,
            ..
        } = options;

        if source.channel_count() == 0 {
            return Err(MeterError::invalid_parameter(
                "source must have at least one channel",
            ));
        }

        let cascade = FilterCascade::new(source.sample_rate(), source.channel_count())?;
        let pre_filter = *cascade.pre_coefficients();
        let weighting_filter = *cascade.weighting_coefficients();
        tracing::debug!(
            sample_rate = source.sample_rate(),
            channels = source.channel_count(),
            offline = source.is_offline(),
            "Designed K-weighting cascade"
        );

        let controller = LoudnessController::new(source, cascade, modes, &endpoints, &registry)?;

        Ok(Self {
            controller,
            pre_filter,
            weighting_filter,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.controller.start()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.controller.pause()
    }

    pub fn resume(&mut self) -> Result<()> {
        self.controller.resume()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.controller.stop()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.controller.reset()
    }

    /// Feed one block of live audio (one slice per channel)
    pub fn process<C: AsRef<[f32]>>(&mut self, block: &[C]) -> Result<usize> {
        self.controller.process(block)
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&MeasurementEvent) + Send + Sync + 'static,
    {
        self.controller.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, kind: EventKind, id: Option<ListenerId>) -> usize {
        self.controller.unsubscribe(kind, id)
    }

    pub fn unsubscribe_all(&self) {
        self.controller.unsubscribe_all();
    }

    /// Listener registry handle, for listeners that unsubscribe themselves
    pub fn events(&self) -> EventBus {
        self.controller.events()
    }

    pub fn pump_events(&self) -> usize {
        self.controller.pump_events()
    }

    pub fn pump_events_timeout(&self, timeout: Duration) -> usize {
        self.controller.pump_events_timeout(timeout)
    }

    pub fn wait_ready(&self, timeout: Duration) -> Result<()> {
        self.controller.wait_ready(timeout)
    }

    pub fn poll_ready(&self) -> Option<Result<()>> {
        self.controller.poll_ready()
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn modes(&self) -> ModeSet {
        self.controller.modes()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.controller.backend_kind()
    }

    /// High-shelf stage coefficients for the source sample rate
    pub fn pre_filter(&self) -> &FilterCoefficients {
        &self.pre_filter
    }

    /// High-pass stage coefficients for the source sample rate
    pub fn weighting_filter(&self) -> &FilterCoefficients {
        &self.weighting_filter
    }
}
