//! BS.1770 loudness accumulation
//!
//! Audio is reduced to one channel-weighted mean square per 100 ms step.
//! Windows are built from whole steps:
//! - momentary: the last 4 steps (400 ms)
//! - short-term: the last 30 steps (3 s)
//! - integrated: every 400 ms block at a 100 ms hop, gated

use crate::gating::{gated_loudness, loudness};
use needles_meter::{ControlMessage, Emitter, MeasurementEvent, Mode, Processor, DURATION_KEY};
use std::collections::VecDeque;

/// Length of one accumulation step
pub const STEP_SECONDS: f64 = 0.1;

/// Steps per momentary window
pub const MOMENTARY_STEPS: usize = 4;

/// Steps per short-term window
pub const SHORT_TERM_STEPS: usize = 30;

/// BS.1770 channel weight: 1.41 for the surround pair, 1.0 otherwise
pub fn channel_weight(channel: usize) -> f64 {
    match channel {
        3 | 4 => 1.41,
        _ => 1.0,
    }
}

/// Reference loudness processor
#[derive(Debug, Clone, Default)]
pub struct Bs1770Processor {
    sample_rate: f64,
    step_frames: usize,
    recording: bool,

    /// Weighted sum of squares in the step being filled
    step_energy: f64,
    step_filled: usize,
    /// Mean squares of the most recent completed steps
    steps: VecDeque<f64>,
    /// Mean squares of every 400 ms gating block so far
    blocks: Vec<f64>,

    /// Offline end-of-stream, in frames
    duration_frames: Option<usize>,
    received_frames: usize,
    finished: bool,
}

impl Bs1770Processor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Momentary loudness, once 400 ms have been accumulated
    pub fn momentary_loudness(&self) -> Option<f64> {
        self.window_loudness(MOMENTARY_STEPS)
    }

    /// Short-term loudness, once 3 s have been accumulated
    pub fn short_term_loudness(&self) -> Option<f64> {
        self.window_loudness(SHORT_TERM_STEPS)
    }

    /// Gated integrated loudness over everything recorded so far
    pub fn integrated_loudness(&self) -> f64 {
        gated_loudness(&self.blocks)
    }

    /// Whether the offline end-of-stream has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn window_loudness(&self, steps: usize) -> Option<f64> {
        if self.steps.len() < steps {
            return None;
        }
        let sum: f64 = self.steps.iter().rev().take(steps).sum();
        Some(loudness(sum / steps as f64))
    }

    fn initialize(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.step_frames = ((sample_rate * STEP_SECONDS).round() as usize).max(1);
        self.clear();
    }

    fn clear(&mut self) {
        self.step_energy = 0.0;
        self.step_filled = 0;
        self.steps.clear();
        self.blocks.clear();
        self.received_frames = 0;
        self.finished = false;
    }

    fn set_duration(&mut self, duration_ms: f64, emitter: &mut Emitter<'_>) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            tracing::warn!(duration_ms, "Ignoring invalid duration");
            return;
        }
        let frames = (duration_ms * self.sample_rate / 1000.0).round() as usize;
        let steps = frames / self.step_frames.max(1);
        self.blocks.reserve(steps.saturating_sub(self.blocks.len()));
        self.duration_frames = Some(frames);
        self.received_frames = 0;
        self.finished = false;
        tracing::debug!(frames, "Offline duration set");
        self.check_end_of_stream(emitter);
    }

    fn check_end_of_stream(&mut self, emitter: &mut Emitter<'_>) {
        let Some(duration) = self.duration_frames else {
            return;
        };
        if !self.finished && self.received_frames >= duration {
            self.finished = true;
            let integrated = self.integrated_loudness();
            tracing::debug!(integrated, "End of stream");
            emitter.emit(MeasurementEvent::data(Mode::Integrated, integrated));
        }
    }

    fn process(&mut self, input: &[Vec<f32>], emitter: &mut Emitter<'_>) {
        let frames = input.first().map_or(0, Vec::len);
        if self.step_frames == 0 {
            tracing::warn!(frames, "Dropping audio received before initialize");
            return;
        }
        if input.iter().any(|channel| channel.len() != frames) {
            tracing::warn!(frames, "Dropping block with ragged channels");
            return;
        }

        if self.recording {
            let mut offset = 0;
            while offset < frames {
                let take = (self.step_frames - self.step_filled).min(frames - offset);
                for (channel, samples) in input.iter().enumerate() {
                    let weight = channel_weight(channel);
                    let energy: f64 = samples[offset..offset + take]
                        .iter()
                        .map(|s| f64::from(*s) * f64::from(*s))
                        .sum();
                    self.step_energy += weight * energy;
                }
                self.step_filled += take;
                offset += take;

                if self.step_filled == self.step_frames {
                    self.complete_step(emitter);
                }
            }
        }

        self.received_frames += frames;
        self.check_end_of_stream(emitter);
    }

    fn complete_step(&mut self, emitter: &mut Emitter<'_>) {
        let mean_square = self.step_energy / self.step_frames as f64;
        self.step_energy = 0.0;
        self.step_filled = 0;

        self.steps.push_back(mean_square);
        if self.steps.len() > SHORT_TERM_STEPS {
            self.steps.pop_front();
        }

        if let Some(momentary) = self.momentary_loudness() {
            emitter.emit(MeasurementEvent::data(Mode::Momentary, momentary));
            let block: f64 = self.steps.iter().rev().take(MOMENTARY_STEPS).sum();
            self.blocks.push(block / MOMENTARY_STEPS as f64);
        }
        if let Some(short_term) = self.short_term_loudness() {
            emitter.emit(MeasurementEvent::data(Mode::ShortTerm, short_term));
        }
        if self.duration_frames.is_none() {
            emitter.emit(MeasurementEvent::data(
                Mode::Integrated,
                self.integrated_loudness(),
            ));
        }
    }
}

impl Processor for Bs1770Processor {
    fn handle(&mut self, message: ControlMessage, emitter: &mut Emitter<'_>) {
        match message {
            ControlMessage::Initialize { attributes } => self.initialize(attributes.sample_rate),
            ControlMessage::Process { input } => self.process(&input, emitter),
            ControlMessage::Record => {
                self.clear();
                self.recording = true;
                emitter.emit(MeasurementEvent::start());
            }
            ControlMessage::Pause => {
                self.recording = false;
                emitter.emit(MeasurementEvent::pause());
            }
            ControlMessage::Resume => {
                self.recording = true;
                emitter.emit(MeasurementEvent::resume());
            }
            ControlMessage::Stop => {
                self.recording = false;
                emitter.emit(MeasurementEvent::stop());
            }
            ControlMessage::Reset => self.clear(),
            ControlMessage::SetParam { key, value } if key == DURATION_KEY => {
                self.set_duration(value, emitter);
            }
            ControlMessage::SetParam { key, .. } => {
                tracing::warn!(key = %key, "Unknown parameter");
            }
        }
    }
}
