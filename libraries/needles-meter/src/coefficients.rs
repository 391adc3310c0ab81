//! K-weighting filter design
//!
//! Both stages are designed from fixed analog prototypes via the bilinear
//! transform (`K = tan(pi * f0 / fs)`), in double precision. Any deviation
//! here shifts every measured loudness value, so the algebra is kept in the
//! closed form used by ITU-R BS.1770 implementations.

use crate::error::{MeterError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Pre-filter (high shelf) gain in dB
pub const PRE_FILTER_GAIN_DB: f64 = 3.999843853973347;
/// Pre-filter corner frequency in Hz
pub const PRE_FILTER_F0: f64 = 1681.974450955533;
/// Pre-filter quality factor
pub const PRE_FILTER_Q: f64 = 0.7071752369554196;
/// Exponent splitting the shelf gain into its band term (`Vb = Vh^x`)
const PRE_FILTER_VB_EXPONENT: f64 = 0.4996667741545416;

/// Weighting filter (high pass) corner frequency in Hz
pub const WEIGHTING_FILTER_F0: f64 = 38.13547087602444;
/// Weighting filter quality factor
pub const WEIGHTING_FILTER_Q: f64 = 0.5003270373238773;

/// Coefficients of one second-order section in normalized form
///
/// `denominators[0]` is always `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCoefficients {
    numerators: [f64; 3],
    denominators: [f64; 3],
}

impl FilterCoefficients {
    fn normalized(numerators: [f64; 3], denominator1: f64, denominator2: f64) -> Self {
        Self {
            numerators,
            denominators: [1.0, denominator1, denominator2],
        }
    }

    /// Feed-forward coefficients `(b0, b1, b2)`
    pub fn numerators(&self) -> [f64; 3] {
        self.numerators
    }

    /// Feedback coefficients `(1, a1, a2)`
    pub fn denominators(&self) -> [f64; 3] {
        self.denominators
    }

    /// Whether every coefficient is a finite number
    pub fn is_finite(&self) -> bool {
        self.numerators
            .iter()
            .chain(self.denominators.iter())
            .all(|c| c.is_finite())
    }
}

fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(MeterError::invalid_parameter(format!(
            "sample rate must be a positive finite number, got {}",
            sample_rate
        )));
    }
    Ok(())
}

/// Tiny rates push the pre-warp past `f64` range
fn ensure_finite(coefficients: FilterCoefficients, sample_rate: f64) -> Result<FilterCoefficients> {
    if !coefficients.is_finite() {
        return Err(MeterError::invalid_parameter(format!(
            "sample rate {} gives non-finite filter coefficients",
            sample_rate
        )));
    }
    Ok(coefficients)
}

/// Bilinear pre-warp term for a corner frequency
fn prewarp(f0: f64, sample_rate: f64) -> f64 {
    (PI * f0 / sample_rate).tan()
}

/// Design the high-shelf pre-filter for `sample_rate` Hz
pub fn design_pre_filter(sample_rate: f64) -> Result<FilterCoefficients> {
    validate_sample_rate(sample_rate)?;

    let k = prewarp(PRE_FILTER_F0, sample_rate);
    let q = PRE_FILTER_Q;
    let vh = 10.0_f64.powf(PRE_FILTER_GAIN_DB / 20.0);
    let vb = vh.powf(PRE_FILTER_VB_EXPONENT);

    let a0 = 1.0 + k / q + k * k;
    let a1 = 2.0 * (k * k - 1.0) / a0;
    let a2 = (1.0 - k / q + k * k) / a0;
    let b0 = (vh + vb * k / q + k * k) / a0;
    let b1 = 2.0 * (k * k - vh) / a0;
    let b2 = (vh - vb * k / q + k * k) / a0;

    ensure_finite(
        FilterCoefficients::normalized([b0, b1, b2], a1, a2),
        sample_rate,
    )
}

/// Design the high-pass weighting filter for `sample_rate` Hz
pub fn design_weighting_filter(sample_rate: f64) -> Result<FilterCoefficients> {
    validate_sample_rate(sample_rate)?;

    let k = prewarp(WEIGHTING_FILTER_F0, sample_rate);
    let q = WEIGHTING_FILTER_Q;

    let a0 = 1.0 + k / q + k * k;
    let a1 = 2.0 * (k * k - 1.0) / a0;
    let a2 = (1.0 - k / q + k * k) / a0;

    ensure_finite(
        FilterCoefficients::normalized([1.0, -2.0, 1.0], a1, a2),
        sample_rate,
    )
}
