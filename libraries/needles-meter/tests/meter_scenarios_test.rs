//! End-to-end meter scenarios
//!
//! Drives `LoudnessMeter` against a recording processor that logs every
//! control message it receives and answers with events, the way a real
//! backend would.

use needles_meter::{
    design_pre_filter, AudioBuffer, BackendKind, ControlMessage, Emitter, EventKind,
    LifecycleAction, LoudnessMeter, MeasurementEvent, MeterError, MeterOptions, MeterSource, Mode,
    ModeSet, Processor, ProcessorRegistry, SessionState,
};
use needles_meter::coefficients::PRE_FILTER_F0;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ========== Helper Functions ==========

type MessageLog = Arc<Mutex<Vec<ControlMessage>>>;

/// Processor that logs messages and acknowledges lifecycle changes.
/// Every `Process` block produces one value per mode.
fn recording_registry(log: MessageLog) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    for endpoint in ["meter-worker", "meter-worklet"] {
        let log = Arc::clone(&log);
        registry.register(endpoint, move || {
            let log = Arc::clone(&log);
            let processor: Box<dyn Processor> =
                Box::new(move |message: ControlMessage, emitter: &mut Emitter<'_>| {
                    match &message {
                        ControlMessage::Record => emitter.emit(MeasurementEvent::start()),
                        ControlMessage::Pause => emitter.emit(MeasurementEvent::pause()),
                        ControlMessage::Resume => emitter.emit(MeasurementEvent::resume()),
                        ControlMessage::Stop => emitter.emit(MeasurementEvent::stop()),
                        ControlMessage::Process { .. } => {
                            for mode in Mode::ALL {
                                emitter.emit(MeasurementEvent::data(mode, -20.0));
                            }
                        }
                        _ => {}
                    }
                    log.lock().unwrap().push(message);
                });
            Ok(processor)
        });
    }
    registry
}

/// Pump events until `done` holds or five seconds pass
fn pump_until(meter: &LoudnessMeter, done: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() && Instant::now() < deadline {
        meter.pump_events_timeout(Duration::from_millis(50));
    }
}

fn sine(sample_rate: f64, frequency: f64, amplitude: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f64 / sample_rate;
            amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

// ========== Coefficients ==========

#[test]
fn coefficients_at_48k() {
    let k = (std::f64::consts::PI * PRE_FILTER_F0 / 48000.0).tan();
    assert!((k - 0.1106).abs() < 1e-3, "K = {}", k);

    let pre = design_pre_filter(48000.0).unwrap();
    assert!((pre.numerators()[0] - 1.53512485958697).abs() < 1e-9);
    assert_eq!(pre.denominators()[0], 1.0);
}

// ========== Lifecycle ==========

#[test]
fn second_start_is_invalid_state() {
    let options = MeterOptions::new(
        MeterSource::live(48000.0, 2),
        recording_registry(MessageLog::default()),
    )
    .with_modes([Mode::Integrated]);
    let mut meter = LoudnessMeter::new(options).unwrap();

    meter.start().unwrap();
    let err = meter.start().unwrap_err();
    assert_eq!(
        err,
        MeterError::InvalidState {
            action: LifecycleAction::Start,
            state: SessionState::Recording,
        }
    );
    assert_eq!(
        err.to_string(),
        "Failed to execute 'start' on 'Needles': The Needles's state is 'recording'."
    );
    assert_eq!(meter.state(), SessionState::Recording);
}

#[test]
fn lifecycle_events_reach_listeners() {
    let mut meter = LoudnessMeter::new(MeterOptions::new(
        MeterSource::live(48000.0, 1),
        recording_registry(MessageLog::default()),
    ))
    .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::Start, EventKind::Pause, EventKind::Resume, EventKind::Stop] {
        let seen = Arc::clone(&seen);
        meter.subscribe(kind, move |event| seen.lock().unwrap().push(event.kind()));
    }

    meter.start().unwrap();
    meter.pause().unwrap();
    meter.resume().unwrap();
    meter.stop().unwrap();
    pump_until(&meter, || seen.lock().unwrap().len() == 4);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![EventKind::Start, EventKind::Pause, EventKind::Resume, EventKind::Stop]
    );
}

// ========== Offline feed ==========

#[test]
fn offline_feed_of_20000_frames() {
    let log = MessageLog::default();
    let buffer = AudioBuffer::new(
        48000.0,
        vec![sine(48000.0, 997.0, 0.5, 20000), sine(48000.0, 997.0, 0.5, 20000)],
    )
    .unwrap();
    let options = MeterOptions::new(buffer, recording_registry(Arc::clone(&log)));
    let mut meter = LoudnessMeter::new(options).unwrap();
    assert_eq!(meter.backend_kind(), BackendKind::Offline);

    meter.start().unwrap();
    drop(meter);

    let log = log.lock().unwrap();
    let blocks: Vec<(usize, usize)> = log
        .iter()
        .filter_map(|message| match message {
            ControlMessage::Process { input } => Some((input.len(), input[0].len())),
            _ => None,
        })
        .collect();
    assert_eq!(blocks, vec![(2, 16384), (2, 3616)]);

    let duration = log.iter().find_map(|message| match message {
        ControlMessage::SetParam { key, value } if key == "duration" => Some(*value),
        _ => None,
    });
    let expected_ms = 20000.0 / 48000.0 * 1000.0;
    assert!((duration.unwrap() - expected_ms).abs() < 1e-9);
}

#[test]
fn offline_feed_is_k_weighted() {
    let log = MessageLog::default();
    // DC is removed by the high-pass stage
    let buffer = AudioBuffer::new(48000.0, vec![vec![0.5; 48000]]).unwrap();
    let options = MeterOptions::new(buffer, recording_registry(Arc::clone(&log)));
    let mut meter = LoudnessMeter::new(options).unwrap();
    meter.start().unwrap();
    drop(meter);

    let log = log.lock().unwrap();
    let last_block = log
        .iter()
        .filter_map(|message| match message {
            ControlMessage::Process { input } => Some(&input[0]),
            _ => None,
        })
        .last()
        .unwrap();
    let tail = &last_block[last_block.len() - 100..];
    assert!(tail.iter().all(|s| s.abs() < 1e-3));
}

#[test]
fn empty_offline_buffer_sends_no_blocks() {
    let log = MessageLog::default();
    let buffer = AudioBuffer::new(48000.0, vec![Vec::new()]).unwrap();
    let options = MeterOptions::new(buffer, recording_registry(Arc::clone(&log)));
    let mut meter = LoudnessMeter::new(options).unwrap();
    meter.start().unwrap();
    drop(meter);

    let types: Vec<_> = log.lock().unwrap().iter().map(ControlMessage::type_name).collect();
    assert_eq!(types, vec!["initialize", "record", "set"]);
}

#[test]
fn offline_restart_renders_again() {
    let log = MessageLog::default();
    let buffer = AudioBuffer::new(48000.0, vec![vec![0.1; 1000]]).unwrap();
    let options = MeterOptions::new(buffer, recording_registry(Arc::clone(&log)));
    let mut meter = LoudnessMeter::new(options).unwrap();
    meter.start().unwrap();
    meter.stop().unwrap();
    meter.start().unwrap();
    drop(meter);

    let log = log.lock().unwrap();
    let blocks: Vec<&Vec<Vec<f32>>> = log
        .iter()
        .filter_map(|message| match message {
            ControlMessage::Process { input } => Some(input),
            _ => None,
        })
        .collect();
    assert_eq!(blocks.len(), 2);
    // Filter state is reset per render, so both passes are identical
    assert_eq!(blocks[0], blocks[1]);
}

// ========== Modes ==========

#[test]
fn unrequested_modes_never_reach_listeners() {
    let options = MeterOptions::new(
        MeterSource::live(48000.0, 1),
        recording_registry(MessageLog::default()),
    )
    .with_modes([Mode::Momentary]);
    let mut meter = LoudnessMeter::new(options).unwrap();

    let values = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&values);
    meter.subscribe(EventKind::DataAvailable, move |event| {
        sink.lock().unwrap().push(event.measurement());
    });
    let stopped = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&stopped);
    meter.subscribe(EventKind::Stop, move |_| *flag.lock().unwrap() = true);

    meter.start().unwrap();
    let block = vec![sine(48000.0, 1000.0, 0.25, 2048)];
    assert_eq!(meter.process(&block).unwrap(), 2);
    meter.stop().unwrap();
    pump_until(&meter, || *stopped.lock().unwrap());

    let values = values.lock().unwrap();
    assert_eq!(values.len(), 2);
    assert!(values.iter().all(|m| matches!(m, Some((Mode::Momentary, _)))));
}

// ========== Listeners ==========

#[test]
fn listener_can_unsubscribe_everyone_mid_dispatch() {
    let mut meter = LoudnessMeter::new(MeterOptions::new(
        MeterSource::live(48000.0, 1),
        recording_registry(MessageLog::default()),
    ))
    .unwrap();

    let bus = meter.events();
    meter.subscribe(EventKind::Start, move |_| {
        bus.unsubscribe(EventKind::Start, None);
    });
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    meter.subscribe(EventKind::Start, move |_| *counter.lock().unwrap() += 1);

    meter.start().unwrap();
    pump_until(&meter, || *calls.lock().unwrap() > 0);
    assert_eq!(*calls.lock().unwrap(), 1);

    meter.stop().unwrap();
    meter.start().unwrap();
    meter.pump_events_timeout(Duration::from_millis(200));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn unsubscribe_by_id() {
    let meter = LoudnessMeter::new(MeterOptions::new(
        MeterSource::live(48000.0, 1),
        recording_registry(MessageLog::default()),
    ))
    .unwrap();

    let id = meter.subscribe(EventKind::DataAvailable, |_| {});
    meter.subscribe(EventKind::DataAvailable, |_| {});
    assert_eq!(meter.unsubscribe(EventKind::DataAvailable, Some(id)), 1);
    assert_eq!(meter.unsubscribe(EventKind::DataAvailable, Some(id)), 0);
    meter.unsubscribe_all();
    assert_eq!(meter.events().listener_count(EventKind::DataAvailable), 0);
}

// ========== Backend selection ==========

#[test]
fn worklet_wins_over_worker_for_live_sources() {
    let options = MeterOptions::new(
        MeterSource::live(48000.0, 2),
        recording_registry(MessageLog::default()),
    )
    .with_worklet_endpoint(Some("meter-worklet".to_string()));
    let meter = LoudnessMeter::new(options).unwrap();
    assert_eq!(meter.backend_kind(), BackendKind::Worklet);
    meter.wait_ready(Duration::from_secs(5)).unwrap();
}

#[test]
fn offline_without_worker_endpoint_is_configuration_error() {
    let buffer = AudioBuffer::new(48000.0, vec![vec![0.0; 16]]).unwrap();
    let options = MeterOptions::new(buffer, recording_registry(MessageLog::default()))
        .with_worker_endpoint(None)
        .with_worklet_endpoint(Some("meter-worklet".to_string()));
    assert!(matches!(
        LoudnessMeter::new(options),
        Err(MeterError::Configuration(_))
    ));
}

#[test]
fn empty_mode_set_is_invalid() {
    let options = MeterOptions::new(
        MeterSource::live(48000.0, 2),
        recording_registry(MessageLog::default()),
    )
    .with_modes(ModeSet::empty());
    assert!(matches!(
        LoudnessMeter::new(options),
        Err(MeterError::InvalidParameter(_))
    ));
}

#[test]
fn unregistered_endpoint_is_unavailable() {
    let options = MeterOptions::new(MeterSource::live(48000.0, 2), ProcessorRegistry::new())
        .with_worker_endpoint(Some("not-registered".to_string()));

    // The failure may already be known when the initialize message is sent
    match LoudnessMeter::new(options) {
        Ok(mut meter) => {
            assert!(matches!(
                meter.wait_ready(Duration::from_secs(5)),
                Err(MeterError::BackendUnavailable(_))
            ));
            assert!(matches!(meter.poll_ready(), Some(Err(_))));
            assert!(matches!(
                meter.start(),
                Err(MeterError::BackendUnavailable(_))
            ));
            assert_eq!(meter.state(), SessionState::Inactive);
        }
        Err(err) => assert!(matches!(err, MeterError::BackendUnavailable(_))),
    }
}

#[test]
fn failing_factory_is_unavailable() {
    let mut registry = ProcessorRegistry::new();
    registry.register("meter-worker", || {
        Err(MeterError::backend_unavailable("module failed to load"))
    });
    let options = MeterOptions::new(MeterSource::live(48000.0, 2), registry);

    if let Ok(meter) = LoudnessMeter::new(options) {
        assert_eq!(
            meter.wait_ready(Duration::from_secs(5)),
            Err(MeterError::BackendUnavailable(
                "module failed to load".to_string()
            ))
        );
    }
}

#[test]
fn stop_after_late_load_failure_ends_the_session() {
    let mut registry = ProcessorRegistry::new();
    registry.register("meter-worker", || {
        std::thread::sleep(Duration::from_millis(300));
        Err(MeterError::backend_unavailable("module failed to load"))
    });
    let options = MeterOptions::new(MeterSource::live(48000.0, 2), registry);
    let mut meter = LoudnessMeter::new(options).unwrap();

    meter.start().unwrap();
    assert!(meter.wait_ready(Duration::from_secs(5)).is_err());

    assert!(matches!(
        meter.stop(),
        Err(MeterError::BackendUnavailable(_))
    ));
    assert_eq!(meter.state(), SessionState::Inactive);
}
