//! Minimal echo cancellation demo.
//!
//! Feeds a synthetic render tone and a capture holding a delayed, attenuated
//! copy of it plus a near-end tone through a session, and prints how much of
//! the capture energy is left after one second.
//!
//! ```sh
//! cargo run -p echoframe --example simple
//! ```

use std::f32::consts::TAU;

use echoframe::{Session, SessionConfig};

const SAMPLE_RATE_HZ: u32 = 16_000;
const FRAMES: usize = 100;

fn main() {
    let config = SessionConfig {
        sample_rate_hz: SAMPLE_RATE_HZ,
        num_channels: 1,
        export_linear: true,
        suppression_level: 0.9,
    };
    let mut session = Session::new(&config).unwrap();
    let frame_size = session.frame_size();
    println!(
        "session: {} Hz, tier {:?}",
        session.sample_rate_hz(),
        session.suppression_tier().kind
    );

    let mut output = vec![0i16; frame_size];
    let mut linear = vec![0i16; echoframe::LINEAR_OUTPUT_SAMPLES];
    let mut capture_energy = 0.0f64;
    let mut output_energy = 0.0f64;
    for frame in 0..FRAMES {
        let (reference, capture) = sample_frames(frame * frame_size, frame_size);
        session
            .process(&reference, &capture, &mut output, Some(linear.as_mut_slice()), frame_size, 0)
            .unwrap();
        if frame >= FRAMES / 2 {
            capture_energy += capture.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>();
            output_energy += output.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>();
        }
    }

    let stats = session.statistics();
    println!(
        "output/capture energy: {:.1} dB",
        10.0 * (output_energy / capture_energy).log10()
    );
    println!("statistics: {stats:?}");
}

/// Render is a 440 Hz tone. Capture holds the render delayed by 5 ms at half
/// amplitude plus a quieter 1.2 kHz near-end tone.
fn sample_frames(start: usize, frame_size: usize) -> (Vec<i16>, Vec<i16>) {
    let rate = SAMPLE_RATE_HZ as f32;
    let render = |i: usize| (i as f32 * 440.0 / rate * TAU).sin() * 8_000.0;
    let nearend = |i: usize| (i as f32 * 1_200.0 / rate * TAU).sin() * 1_000.0;
    let delay = 80;

    let reference = (start..start + frame_size)
        .map(|i| render(i) as i16)
        .collect();
    let capture = (start..start + frame_size)
        .map(|i| {
            let echo = if i >= delay { 0.5 * render(i - delay) } else { 0.0 };
            (echo + nearend(i)) as i16
        })
        .collect();
    (reference, capture)
}
