#![no_main]

use arbitrary::Arbitrary;
use echoframe::{LINEAR_OUTPUT_SAMPLES, Session, SessionConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    sample_rate_idx: u8,
    channels: u8,
    export_linear: bool,
    suppression_level: f32,
    frames: Vec<FuzzFrame>,
}

#[derive(Debug, Arbitrary)]
struct FuzzFrame {
    reference: Vec<i16>,
    capture: Vec<i16>,
    /// Offset added to the session frame size, to hit the size checks.
    frame_size_offset: i8,
    output_len: u16,
    linear_len: Option<u8>,
    buffer_delay: i32,
}

fn sample_rate(idx: u8) -> u32 {
    match idx % 4 {
        0 => 8000,
        1 => 16000,
        2 => 32000,
        _ => 48000,
    }
}

fuzz_target!(|input: FuzzInput| {
    let config = SessionConfig {
        sample_rate_hz: sample_rate(input.sample_rate_idx),
        num_channels: usize::from(input.channels % 3) + 1,
        export_linear: input.export_linear,
        suppression_level: input.suppression_level,
    };
    let Ok(mut session) = Session::new(&config) else {
        return;
    };
    let n = session.frame_size() * session.num_channels();

    for frame in input.frames.iter().take(50) {
        // Cycle the fuzzed samples to fill a whole frame when they are short.
        let fill = |src: &[i16]| -> Vec<i16> {
            if src.is_empty() {
                vec![0; n]
            } else {
                src.iter().copied().cycle().take(n).collect()
            }
        };
        let reference = fill(&frame.reference);
        let capture = fill(&frame.capture);
        let mut output = vec![0i16; usize::from(frame.output_len) % (n + 1) + n / 2];
        let mut linear = frame.linear_len.map(|len| vec![0i16; usize::from(len)]);
        let frame_size = session
            .frame_size()
            .saturating_add_signed(isize::from(frame.frame_size_offset % 4));

        let result = session.process(
            &reference,
            &capture,
            &mut output,
            linear.as_deref_mut(),
            frame_size,
            frame.buffer_delay,
        );
        if result.is_ok() {
            assert_eq!(frame_size, session.frame_size());
            assert!(output.len() >= n);
            if let Some(linear) = &linear {
                assert!(!session.exports_linear() || linear.len() >= LINEAR_OUTPUT_SAMPLES);
            }
        }
    }
    let _ = session.statistics();
});
