//! Audio sources a meter can be attached to

use crate::error::{MeterError, Result};

/// Planar audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: f64,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Wrap planar channel data
    ///
    /// # Errors
    /// `InvalidParameter` if there are no channels, the channels differ in
    /// length, or the sample rate is not positive and finite.
    pub fn new(sample_rate: f64, channels: Vec<Vec<f32>>) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(MeterError::invalid_parameter(format!(
                "sample rate must be a positive finite number, got {}",
                sample_rate
            )));
        }
        let Some(first) = channels.first() else {
            return Err(MeterError::invalid_parameter(
                "audio buffer needs at least one channel",
            ));
        };
        let frames = first.len();
        if let Some(index) = channels.iter().position(|c| c.len() != frames) {
            return Err(MeterError::invalid_parameter(format!(
                "channel {} has {} frames, expected {}",
                index,
                channels[index].len(),
                frames
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Build from interleaved samples (e.g. decoded WAV data)
    pub fn from_interleaved(
        sample_rate: f64,
        channel_count: usize,
        samples: &[f32],
    ) -> Result<Self> {
        if channel_count == 0 {
            return Err(MeterError::invalid_parameter("channel count must be at least 1"));
        }
        if samples.len() % channel_count != 0 {
            return Err(MeterError::invalid_parameter(format!(
                "sample count {} is not divisible by channel count {}",
                samples.len(),
                channel_count
            )));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.len() as f64 / self.sample_rate * 1000.0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Copy frames `start..start + len` of every channel into a new block
    ///
    /// The range is clamped to the buffer end.
    pub fn copy_block(&self, start: usize, len: usize) -> Vec<Vec<f32>> {
        let end = (start + len).min(self.len());
        let start = start.min(end);
        self.channels
            .iter()
            .map(|channel| channel[start..end].to_vec())
            .collect()
    }
}

/// Where a meter's audio comes from
#[derive(Debug, Clone)]
pub enum MeterSource {
    /// Realtime stream; the caller pushes blocks as they arrive
    Live {
        /// Sample rate in Hz
        sample_rate: f64,
        /// Number of channels in each pushed block
        channels: usize,
    },

    /// Prerecorded buffer, weighted and fed in chunks when the session starts
    Offline(AudioBuffer),
}

impl MeterSource {
    /// Live stream source
    pub fn live(sample_rate: f64, channels: usize) -> Self {
        Self::Live {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        match self {
            Self::Live { sample_rate, .. } => *sample_rate,
            Self::Offline(buffer) => buffer.sample_rate(),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            Self::Live { channels, .. } => *channels,
            Self::Offline(buffer) => buffer.channel_count(),
        }
    }

    /// Whether the source renders to a non-realtime destination
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline(_))
    }
}

impl From<AudioBuffer> for MeterSource {
    fn from(buffer: AudioBuffer) -> Self {
        Self::Offline(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_channels() {
        let result = AudioBuffer::new(48000.0, vec![vec![0.0; 10], vec![0.0; 9]]);
        assert!(matches!(result, Err(MeterError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_empty_channel_list() {
        assert!(AudioBuffer::new(48000.0, vec![]).is_err());
    }

    #[test]
    fn deinterleaves() {
        let buffer = AudioBuffer::from_interleaved(44100.0, 2, &[1.0, -1.0, 2.0, -2.0]).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.channel(0), Some(&[1.0, 2.0][..]));
        assert_eq!(buffer.channel(1), Some(&[-1.0, -2.0][..]));
    }

    #[test]
    fn interleaved_length_must_divide() {
        assert!(AudioBuffer::from_interleaved(44100.0, 2, &[0.0; 3]).is_err());
    }

    #[test]
    fn duration_in_ms() {
        let buffer = AudioBuffer::new(48000.0, vec![vec![0.0; 24000]]).unwrap();
        assert_eq!(buffer.duration_ms(), 500.0);
    }

    #[test]
    fn copy_block_clamps_to_end() {
        let buffer = AudioBuffer::new(8000.0, vec![(0..10).map(|i| i as f32).collect()]).unwrap();
        assert_eq!(buffer.copy_block(8, 16), vec![vec![8.0, 9.0]]);
        assert_eq!(buffer.copy_block(12, 4), vec![Vec::<f32>::new()]);
    }

    #[test]
    fn source_kind() {
        assert!(!MeterSource::live(48000.0, 2).is_offline());
        let buffer = AudioBuffer::new(48000.0, vec![vec![0.0; 4]]).unwrap();
        let source = MeterSource::from(buffer);
        assert!(source.is_offline());
        assert_eq!(source.channel_count(), 1);
    }
}
