/// CLI configuration
use crate::error::{CliError, Result};
use needles_meter::MeterSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` isn't given
pub const DEFAULT_CONFIG_FILE: &str = "needles.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub meter: MeterSettings,

    /// How long to wait for the processor to load
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// How long to wait for a measurement to finish
    #[serde(default = "default_measure_timeout_ms")]
    pub measure_timeout_ms: u64,
}

fn default_ready_timeout_ms() -> u64 {
    5_000
}

fn default_measure_timeout_ms() -> u64 {
    60_000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            meter: MeterSettings::default(),
            ready_timeout_ms: default_ready_timeout_ms(),
            measure_timeout_ms: default_measure_timeout_ms(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `needles.toml` is used if
    /// present. Environment variables prefixed with `NEEDLES_` override the
    /// file, with `__` separating nested keys (`NEEDLES_METER__MODES=integrated`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("NEEDLES")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("meter.modes")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.meter.modes.is_empty() {
            return Err(CliError::Config(
                "at least one measurement mode is required".to_string(),
            ));
        }
        if self.meter.worker_endpoint.is_none() {
            return Err(CliError::Config(
                "file measurement requires a worker endpoint".to_string(),
            ));
        }
        if self.ready_timeout_ms == 0 || self.measure_timeout_ms == 0 {
            return Err(CliError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}
