/// Measurement output, human-readable or JSON
use needles_meter::{FilterCoefficients, Mode};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub mode: Mode,
    /// LUFS; negative infinity (serialized as `null`) for silence
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementReport {
    pub file: String,
    pub sample_rate: f64,
    pub channels: usize,
    pub duration_ms: f64,
    pub measurements: Vec<Measurement>,
    /// Last integrated value reported
    pub integrated: Option<f64>,
}

impl MeasurementReport {
    pub fn new(
        file: String,
        sample_rate: f64,
        channels: usize,
        duration_ms: f64,
        measurements: Vec<Measurement>,
    ) -> Self {
        let integrated = measurements
            .iter()
            .rev()
            .find(|m| m.mode == Mode::Integrated)
            .map(|m| m.value);
        Self {
            file,
            sample_rate,
            channels,
            duration_ms,
            measurements,
            integrated,
        }
    }

    pub fn last(&self, mode: Mode) -> Option<f64> {
        self.measurements
            .iter()
            .rev()
            .find(|m| m.mode == mode)
            .map(|m| m.value)
    }
}

impl fmt::Display for MeasurementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} Hz, {} channel(s), {:.1} s",
            self.file,
            self.sample_rate,
            self.channels,
            self.duration_ms / 1000.0
        )?;
        for measurement in &self.measurements {
            writeln!(f, "  {:<11} {}", measurement.mode.as_str(), format_lufs(measurement.value))?;
        }
        match self.integrated {
            Some(value) => write!(f, "Integrated loudness: {}", format_lufs(value)),
            None => write!(f, "Integrated loudness: not measured"),
        }
    }
}

fn format_lufs(value: f64) -> String {
    if value.is_finite() {
        format!("{:.1} LUFS", value)
    } else {
        "-inf LUFS".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientReport {
    pub sample_rate: f64,
    pub pre_filter: FilterCoefficients,
    pub weighting_filter: FilterCoefficients,
}

impl fmt::Display for CoefficientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "K-weighting at {} Hz", self.sample_rate)?;
        for (name, coefficients) in [
            ("pre-filter", &self.pre_filter),
            ("weighting filter", &self.weighting_filter),
        ] {
            let [b0, b1, b2] = coefficients.numerators();
            let [a0, a1, a2] = coefficients.denominators();
            writeln!(f, "  {}", name)?;
            writeln!(f, "    b = [{:.14}, {:.14}, {:.14}]", b0, b1, b2)?;
            writeln!(f, "    a = [{:.14}, {:.14}, {:.14}]", a0, a1, a2)?;
        }
        Ok(())
    }
}
