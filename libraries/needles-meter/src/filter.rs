//! K-weighting filter cascade
//!
//! Applies the pre-filter and weighting filter coefficient sets to planar
//! `f32` audio. Arithmetic and state are `f64`; state persists across blocks
//! so a stream can be fed in arbitrary block sizes.

use crate::coefficients::{design_pre_filter, design_weighting_filter, FilterCoefficients};
use crate::error::Result;

/// Direct form I biquad state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

/// Second-order IIR section with one state per channel
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    states: Vec<BiquadState>,
}

impl Biquad {
    /// Create a filter for `channels` channels from normalized coefficients
    pub fn new(coefficients: &FilterCoefficients, channels: usize) -> Self {
        let [b0, b1, b2] = coefficients.numerators();
        let [_, a1, a2] = coefficients.denominators();
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            states: vec![BiquadState::default(); channels],
        }
    }

    /// Filter one channel in place
    ///
    /// Channels beyond the configured count get fresh state on first use.
    pub fn process_channel(&mut self, channel: usize, samples: &mut [f32]) {
        if channel >= self.states.len() {
            self.states.resize(channel + 1, BiquadState::default());
        }
        let (b0, b1, b2, a1, a2) = (self.b0, self.b1, self.b2, self.a1, self.a2);
        let state = &mut self.states[channel];

        for sample in samples.iter_mut() {
            let x = f64::from(*sample);
            let mut y = b0 * x + b1 * state.x1 + b2 * state.x2 - a1 * state.y1 - a2 * state.y2;

            // Flush denormals
            if y.abs() < 1e-30 {
                y = 0.0;
            }

            state.x2 = state.x1;
            state.x1 = x;
            state.y2 = state.y1;
            state.y1 = y;
            *sample = y as f32;
        }
    }

    /// Clear the delay lines (coefficients are kept)
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = BiquadState::default();
        }
    }
}

/// Two-stage K-weighting cascade: pre-filter, then weighting filter
#[derive(Debug, Clone)]
pub struct FilterCascade {
    pre_filter: Biquad,
    weighting_filter: Biquad,
    pre_coefficients: FilterCoefficients,
    weighting_coefficients: FilterCoefficients,
    sample_rate: f64,
}

impl FilterCascade {
    /// Design both stages for `sample_rate` and `channels` channels
    pub fn new(sample_rate: f64, channels: usize) -> Result<Self> {
        let pre_coefficients = design_pre_filter(sample_rate)?;
        let weighting_coefficients = design_weighting_filter(sample_rate)?;

        Ok(Self {
            pre_filter: Biquad::new(&pre_coefficients, channels),
            weighting_filter: Biquad::new(&weighting_coefficients, channels),
            pre_coefficients,
            weighting_coefficients,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn pre_coefficients(&self) -> &FilterCoefficients {
        &self.pre_coefficients
    }

    pub fn weighting_coefficients(&self) -> &FilterCoefficients {
        &self.weighting_coefficients
    }

    /// Filter planar channel blocks in place
    pub fn process<C: AsMut<[f32]>>(&mut self, channels: &mut [C]) {
        for (index, channel) in channels.iter_mut().enumerate() {
            let samples = channel.as_mut();
            self.pre_filter.process_channel(index, samples);
            self.weighting_filter.process_channel(index, samples);
        }
    }

    /// Clear both stages' filter state
    pub fn reset(&mut self) {
        self.pre_filter.reset();
        self.weighting_filter.reset();
    }
}
