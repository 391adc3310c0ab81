//! Needles command-line library
//!
//! File measurement and reporting behind the `needles` binary, exposed for
//! testing.

pub mod config;
pub mod error;
pub mod measure;
pub mod report;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use measure::{measure_file, read_wav};
pub use report::{CoefficientReport, Measurement, MeasurementReport};
