//! Benchmarks for the echoframe session and its band-splitting stages.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use echoframe::audio_buffer::AudioBuffer;
use echoframe::{Session, SessionConfig};

fn signal(len: usize, phase: f32) -> Vec<i16> {
    (0..len)
        .map(|i| ((i as f32 * 0.01 + phase).sin() * 3_000.0) as i16)
        .collect()
}

fn make_session(sample_rate_hz: u32, num_channels: usize, export_linear: bool) -> Session {
    let config = SessionConfig {
        sample_rate_hz,
        num_channels,
        export_linear,
        suppression_level: 1.0,
    };
    let mut session = Session::new(&config).unwrap();

    // Warm up so the benchmark measures steady state.
    let frame_size = session.frame_size();
    let n = frame_size * num_channels;
    let reference = signal(n, 0.0);
    let capture = signal(n, 0.3);
    let mut output = vec![0i16; n];
    for _ in 0..20 {
        session
            .process(&reference, &capture, &mut output, None, frame_size, 0)
            .unwrap();
    }
    session
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");

    for (name, rate, channels, linear) in [
        ("16kHz_mono", 16_000, 1, false),
        ("48kHz_mono", 48_000, 1, false),
        ("48kHz_stereo", 48_000, 2, false),
        ("48kHz_mono_linear", 48_000, 1, true),
    ] {
        let mut session = make_session(rate, channels, linear);
        let frame_size = session.frame_size();
        let n = frame_size * channels;
        let reference = signal(n, 0.0);
        let capture = signal(n, 0.3);
        let mut output = vec![0i16; n];
        let mut linear_output = vec![0i16; echoframe::LINEAR_OUTPUT_SAMPLES];

        group.bench_function(name, |b| {
            b.iter(|| {
                session
                    .process(
                        black_box(&reference),
                        black_box(&capture),
                        &mut output,
                        Some(linear_output.as_mut_slice()),
                        frame_size,
                        0,
                    )
                    .unwrap();
                black_box(&output);
            });
        });
    }

    group.finish();
}

fn bench_band_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("band_split");

    for rate in [32_000, 48_000] {
        let mut buffer = AudioBuffer::new(rate, 1);
        for (i, x) in buffer.channel_mut(0).iter_mut().enumerate() {
            *x = (i as f32 * 0.05).sin() * 3_000.0;
        }
        group.bench_function(format!("{}kHz", rate / 1000), |b| {
            b.iter(|| {
                buffer.split_into_frequency_bands();
                buffer.merge_frequency_bands();
                black_box(buffer.channel(0));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process, bench_band_split);
criterion_main!(benches);
