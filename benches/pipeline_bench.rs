//! Performance benchmarks for the DSP pipeline

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pulsekey::dsp::resampler::Resampler;
use pulsekey::features::cqt::StreamingCqtExtractor;
use pulsekey::features::mel::StreamingMelExtractor;
use pulsekey::tempo::{estimator, ActivationRing};

/// Generate synthetic test audio (sine wave)
fn generate_test_audio(length: usize, sample_rate: f32) -> Vec<f32> {
    (0..length)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / sample_rate).sin() * 0.5)
        .collect()
}

fn resampler_benchmarks(c: &mut Criterion) {
    let audio = generate_test_audio(44100, 44100.0); // 1 second

    c.bench_function("resample_streaming_1s", |b| {
        let mut resampler = Resampler::new(44100, 22050);
        b.iter(|| {
            let out = resampler.process_streaming(black_box(&audio));
            black_box(out);
        });
    });
}

fn mel_benchmarks(c: &mut Criterion) {
    let audio = generate_test_audio(22050, 22050.0); // 1 second at BPM rate

    c.bench_function("mel_streaming_1s", |b| {
        let mut extractor = StreamingMelExtractor::new();
        b.iter(|| {
            let frames = extractor.push(black_box(&audio));
            black_box(frames);
        });
    });
}

fn cqt_benchmarks(c: &mut Criterion) {
    let audio = generate_test_audio(44100, 44100.0); // 1 second -> ~5 frames

    c.bench_function("cqt_streaming_1s", |b| {
        let mut extractor = StreamingCqtExtractor::new();
        b.iter(|| {
            let frames = extractor.push(black_box(&audio));
            black_box(frames);
        });
    });
}

fn tempo_benchmarks(c: &mut Criterion) {
    // 512 frames of a 128 BPM activation pattern, the full-ring worst case
    let frames_per_beat = 50.0 * 60.0 / 128.0;
    let beats: Vec<f32> = (0..512)
        .map(|i| {
            let phase = (i as f32) % frames_per_beat;
            if phase < 2.0 { 1.0 - phase / 2.0 } else { 0.0 }
        })
        .collect();
    let downbeats = vec![0.0f32; 512];

    c.bench_function("tempo_estimate_512_frames", |b| {
        b.iter(|| {
            let bpm = estimator::estimate(black_box(&beats), black_box(&downbeats), true);
            black_box(bpm);
        });
    });

    c.bench_function("ring_push_with_recompute", |b| {
        let mut ring = ActivationRing::default();
        for &v in &beats {
            ring.push(v, 0.0);
        }
        let mut i = 0usize;
        b.iter(|| {
            ring.push(beats[i % beats.len()], 0.0);
            i += 1;
        });
    });
}

criterion_group!(
    benches,
    resampler_benchmarks,
    mel_benchmarks,
    cqt_benchmarks,
    tempo_benchmarks
);
criterion_main!(benches);
