/// Offline measurement of audio files
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::report::{Measurement, MeasurementReport};
use hound::{SampleFormat, WavReader};
use needles_meter::{
    AudioBuffer, EventKind, LoudnessMeter, MeterOptions, MeterSettings, Mode, ModeSet,
    ProcessorRegistry,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Decode a WAV file into planar `f32` audio
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "Decoded WAV"
    );

    Ok(AudioBuffer::from_interleaved(
        f64::from(spec.sample_rate),
        usize::from(spec.channels),
        &samples,
    )?)
}

/// Measure a WAV file with the reference processor
///
/// `modes` overrides the configured modes when not empty.
pub fn measure_file(path: &Path, config: &CliConfig, modes: &[Mode]) -> Result<MeasurementReport> {
    let buffer = read_wav(path)?;
    let sample_rate = buffer.sample_rate();
    let channels = buffer.channel_count();
    let duration_ms = buffer.duration_ms();

    let settings = MeterSettings {
        modes: if modes.is_empty() {
            config.meter.modes
        } else {
            modes.iter().copied().collect::<ModeSet>()
        },
        ..config.meter.clone()
    };

    let mut registry = ProcessorRegistry::new();
    needles_processor::register_defaults(&mut registry);
    let mut meter = LoudnessMeter::new(MeterOptions::from_settings(buffer, &settings, registry))?;

    let measurements = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&measurements);
    meter.subscribe(EventKind::DataAvailable, move |event| {
        if let Some((mode, value)) = event.measurement() {
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(Measurement { mode, value });
        }
    });
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    meter.subscribe(EventKind::Stop, move |_| flag.store(true, Ordering::SeqCst));

    meter.wait_ready(Duration::from_millis(config.ready_timeout_ms))?;
    meter.start()?;
    // Queued behind the whole feed, so its acknowledgement marks the end
    meter.stop()?;

    let deadline = Instant::now() + Duration::from_millis(config.measure_timeout_ms);
    while !stopped.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CliError::Timeout(config.measure_timeout_ms));
        }
        meter.pump_events_timeout(remaining.min(Duration::from_millis(100)));
    }

    let measurements = std::mem::take(
        &mut *measurements
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner),
    );
    tracing::info!(
        path = %path.display(),
        events = measurements.len(),
        "Measurement complete"
    );

    Ok(MeasurementReport::new(
        path.display().to_string(),
        sample_rate,
        channels,
        duration_ms,
        measurements,
    ))
}
