//! Integration tests for the detection engine
//!
//! Tests that need real model artifacts are `#[ignore]`d and read the model
//! paths from `PULSEKEY_BEAT_MODEL` / `PULSEKEY_KEY_MODEL`; run them with
//! `cargo test -- --ignored` once the ONNX files are available.

use pulsekey::{Engine, FrameResult};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 44.1 kHz sine of the given frequency and length
fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
        .collect()
}

/// Click track at the given BPM: short sinc bursts at every beat
fn click_track(bpm: f32, seconds: f32) -> Vec<f32> {
    let len = (44100.0 * seconds) as usize;
    let period = (60.0 / bpm * 44100.0) as usize;
    let mut audio = vec![0.0f32; len];

    let mut pos = 0;
    while pos < len {
        for j in 0..64.min(len - pos) {
            let t = j as f32 - 32.0;
            let x = t * 0.5;
            let burst = if x.abs() < 1e-3 { 1.0 } else { x.sin() / x };
            audio[pos + j] = burst * 0.9;
        }
        pos += period;
    }

    audio
}

/// C major triad (C4 + E4 + G4) at equal mix
fn chord_triad(seconds: f32) -> Vec<f32> {
    let len = (44100.0 * seconds) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / 44100.0;
            let c = (2.0 * std::f32::consts::PI * 261.63 * t).sin();
            let e = (2.0 * std::f32::consts::PI * 329.63 * t).sin();
            let g = (2.0 * std::f32::consts::PI * 392.00 * t).sin();
            (c + e + g) / 3.0
        })
        .collect()
}

fn beat_model_path() -> Option<String> {
    std::env::var("PULSEKEY_BEAT_MODEL").ok()
}

fn key_model_path() -> Option<String> {
    std::env::var("PULSEKEY_KEY_MODEL").ok()
}

// =============================================================================
// Model-free behaviour
// =============================================================================

#[test]
fn engine_starts_in_reset_state() {
    init_logging();
    let engine = Engine::new();

    assert!(!engine.beat_ready());
    assert!(!engine.key_ready());
    assert_eq!(engine.current_bpm(), 0.0);
    assert_eq!(engine.bpm_frame_count(), 0);
    assert_eq!(engine.key_frame_count(), 0);
    assert!(!engine.current_key().valid);
}

#[test]
fn process_audio_without_models_returns_zero() {
    init_logging();
    let mut engine = Engine::new();

    let produced = engine.process_audio(&sine(440.0, 44100), None);
    assert_eq!(produced, 0);
    assert!(!engine.beat_ready());
    assert_eq!(engine.bpm_frame_count(), 0);
    assert_eq!(engine.key_frame_count(), 0);
}

#[test]
fn degenerate_inputs_do_not_disturb_engine() {
    init_logging();
    let mut engine = Engine::new();

    // Silence, DC, clipping, huge amplitude: all no-ops without models,
    // but must not corrupt state for later processing
    for block in [
        vec![0.0f32; 22050],
        vec![0.5f32; 22050],
        vec![1.0f32; 22050],
        vec![1e6f32; 22050],
    ] {
        engine.process_audio(&block, None);
    }

    engine.reset();
    assert_eq!(engine.current_bpm(), 0.0);
    assert!(!engine.current_key().valid);
}

#[test]
fn reset_between_tracks_is_idempotent() {
    init_logging();
    let mut engine = Engine::new();

    for _ in 0..5 {
        engine.process_audio(&sine(440.0, 4410), None);
        engine.reset();
    }

    assert_eq!(engine.bpm_frame_count(), 0);
    assert_eq!(engine.key_frame_count(), 0);
}

#[test]
fn invalid_model_paths_are_rejected() {
    init_logging();
    let mut engine = Engine::new();

    assert!(engine.load_beat_model("/nonexistent/beatnet.onnx").is_err());
    assert!(engine.load_key_model("").is_err());
    assert!(!engine.beat_ready());
    assert!(!engine.key_ready());

    // Engine still processes (as a no-op) after failed loads
    assert_eq!(engine.process_audio(&sine(440.0, 4410), None), 0);
}

// =============================================================================
// Model-dependent scenarios (require ONNX artifacts)
// =============================================================================

#[test]
#[ignore = "requires PULSEKEY_BEAT_MODEL"]
fn click_track_produces_frames_and_bpm() {
    init_logging();
    let Some(path) = beat_model_path() else {
        panic!("set PULSEKEY_BEAT_MODEL to run this test");
    };

    let mut engine = Engine::new();
    engine.load_beat_model(&path).unwrap();
    assert!(engine.beat_ready());

    // 5 seconds of a 120 BPM click at 44.1 kHz -> >= 240 frames at 50 Hz
    let audio = click_track(120.0, 5.0);
    let mut total = 0;
    for chunk in audio.chunks(4410) {
        total += engine.process_audio(chunk, None);
    }

    assert!(total >= 240, "produced {} frames", total);
    assert!(engine.current_bpm() >= 0.0);
}

#[test]
#[ignore = "requires PULSEKEY_BEAT_MODEL and PULSEKEY_KEY_MODEL"]
fn chord_triad_yields_valid_key() {
    init_logging();
    let (Some(beat), Some(key)) = (beat_model_path(), key_model_path()) else {
        panic!("set PULSEKEY_BEAT_MODEL and PULSEKEY_KEY_MODEL to run this test");
    };

    let mut engine = Engine::new();
    engine.load_beat_model(&beat).unwrap();
    engine.load_key_model(&key).unwrap();
    assert!(engine.key_ready());

    // 25 seconds of a C-E-G triad: enough for at least one key inference
    let audio = chord_triad(25.0);
    for chunk in audio.chunks(8820) {
        engine.process_audio(chunk, None);
    }

    assert!(engine.key_frame_count() >= 100);
    let result = engine.current_key();
    assert!(result.valid);
    assert!(!result.camelot.is_empty());
    assert!(!result.notation.is_empty());
    assert!(result.confidence > 0.04);
}

#[test]
#[ignore = "requires PULSEKEY_BEAT_MODEL"]
fn reset_reproduces_activation_sequence() {
    init_logging();
    let Some(path) = beat_model_path() else {
        panic!("set PULSEKEY_BEAT_MODEL to run this test");
    };

    let mut engine = Engine::new();
    engine.load_beat_model(&path).unwrap();

    let audio = click_track(128.0, 2.0);
    let mut first = vec![FrameResult::default(); 200];
    let n1 = engine.process_audio(&audio, Some(&mut first));

    engine.reset();

    let mut second = vec![FrameResult::default(); 200];
    let n2 = engine.process_audio(&audio, Some(&mut second));

    // Recurrent reset makes the two runs bit-identical
    assert_eq!(n1, n2);
    assert_eq!(&first[..n1], &second[..n2]);
}

#[test]
#[ignore = "requires PULSEKEY_BEAT_MODEL"]
fn warm_up_leaves_clean_state() {
    init_logging();
    let Some(path) = beat_model_path() else {
        panic!("set PULSEKEY_BEAT_MODEL to run this test");
    };

    let mut engine = Engine::new();
    engine.load_beat_model(&path).unwrap();
    engine.warm_up_beat().unwrap();

    // A warm-up followed by processing matches a cold engine's output
    let audio = click_track(120.0, 2.0);
    let mut warmed = vec![FrameResult::default(); 200];
    let n1 = engine.process_audio(&audio, Some(&mut warmed));

    let mut cold_engine = Engine::new();
    cold_engine.load_beat_model(&path).unwrap();
    let mut cold = vec![FrameResult::default(); 200];
    let n2 = cold_engine.process_audio(&audio, Some(&mut cold));

    assert_eq!(n1, n2);
    assert_eq!(&warmed[..n1], &cold[..n2]);
}
