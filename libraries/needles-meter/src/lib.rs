//! Needles loudness metering
//!
//! Control plane for ITU-R BS.1770 loudness measurement:
//! - K-weighting filter design ([`design_pre_filter`], [`design_weighting_filter`])
//! - backend selection and message passing to a hosted [`Processor`]
//! - session lifecycle ([`LoudnessController`]) and event dispatch ([`EventBus`])
//!
//! The loudness algorithm itself lives behind the [`Processor`] trait; register
//! an implementation in a [`ProcessorRegistry`] under the endpoint names the
//! meter is configured with.

pub mod adapter;
pub mod audio;
pub mod backend;
pub mod bus;
pub mod coefficients;
pub mod controller;
pub mod error;
pub mod events;
pub mod filter;
pub mod message;
pub mod meter;
pub mod settings;
pub mod state;

pub use adapter::Endpoints;
pub use audio::{AudioBuffer, MeterSource};
pub use backend::{
    select_backend, BackendKind, Emitter, Processor, ProcessorFactory, ProcessorRegistry,
};
pub use bus::{EventBus, Listener, ListenerId};
pub use coefficients::{design_pre_filter, design_weighting_filter, FilterCoefficients};
pub use controller::{LoudnessController, OFFLINE_CHUNK_FRAMES};
pub use error::{MeterError, Result};
pub use events::{EventKind, MeasurementEvent, Mode, ModeSet};
pub use filter::{Biquad, FilterCascade};
pub use message::{ControlMessage, InitializeAttributes, DURATION_KEY};
pub use meter::LoudnessMeter;
pub use settings::{MeterOptions, MeterSettings, DEFAULT_WORKER_ENDPOINT, DEFAULT_WORKLET_ENDPOINT};
pub use state::{LifecycleAction, SessionState};
