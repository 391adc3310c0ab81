//! Meter configuration

use crate::adapter::Endpoints;
use crate::audio::MeterSource;
use crate::backend::ProcessorRegistry;
use crate::events::ModeSet;
use serde::{Deserialize, Serialize};

/// Endpoint the reference processor registers for worker-thread sessions
pub const DEFAULT_WORKER_ENDPOINT: &str = "meter-worker";

/// Endpoint the reference processor registers for rendering-thread sessions
pub const DEFAULT_WORKLET_ENDPOINT: &str = "meter-worklet";

/// Serializable meter settings, e.g. loaded from a config file
///
/// ```toml
/// modes = ["momentary", "integrated"]
/// worker_endpoint = "meter-worker"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSettings {
    pub modes: ModeSet,
    pub worker_endpoint: Option<String>,
    pub worklet_endpoint: Option<String>,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            modes: ModeSet::all(),
            worker_endpoint: Some(DEFAULT_WORKER_ENDPOINT.to_string()),
            worklet_endpoint: None,
        }
    }
}

/// Everything needed to build a [`LoudnessMeter`](crate::LoudnessMeter)
#[derive(Debug, Clone)]
pub struct MeterOptions {
    pub source: MeterSource,
    pub modes: ModeSet,
    pub worker_endpoint: Option<String>,
    pub worklet_endpoint: Option<String>,
    /// Where endpoint names are resolved to processors
    pub registry: ProcessorRegistry,
}

impl MeterOptions {
    /// Options with default settings
    pub fn new(source: impl Into<MeterSource>, registry: ProcessorRegistry) -> Self {
        Self::from_settings(source, &MeterSettings::default(), registry)
    }

    pub fn from_settings(
        source: impl Into<MeterSource>,
        settings: &MeterSettings,
        registry: ProcessorRegistry,
    ) -> Self {
        Self {
            source: source.into(),
            modes: settings.modes,
            worker_endpoint: settings.worker_endpoint.clone(),
            worklet_endpoint: settings.worklet_endpoint.clone(),
            registry,
        }
    }

    #[must_use]
    pub fn with_modes(mut self, modes: impl Into<ModeSet>) -> Self {
        self.modes = modes.into();
        self
    }

    #[must_use]
    pub fn with_worker_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.worker_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_worklet_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.worklet_endpoint = endpoint;
        self
    }

    pub(crate) fn endpoints(&self) -> Endpoints {
        Endpoints {
            worklet: self.worklet_endpoint.clone(),
            worker: self.worker_endpoint.clone(),
        }
    }
}
