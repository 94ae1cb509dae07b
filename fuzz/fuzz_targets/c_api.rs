#![no_main]

use std::ptr;

use arbitrary::Arbitrary;
use echoframe_ffi::*;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    sample_rate: i32,
    channels: i8,
    export_linear: bool,
    suppression_level: f32,
    null_config: bool,
    operations: Vec<FuzzOp>,
    samples: Vec<i16>,
}

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Process {
        frame_size_offset: i8,
        buffer_delay: i32,
        with_linear: bool,
    },
    ProcessNullReference,
    ProcessNullOutput,
    GetStats,
    GetStatsNull,
}

fuzz_target!(|input: FuzzInput| {
    let config = Aec3Config {
        // Mostly valid rates, with the fuzzed value passed through sometimes.
        sample_rate: match input.sample_rate.rem_euclid(5) {
            0 => 8000,
            1 => 16000,
            2 => 32000,
            3 => 48000,
            _ => input.sample_rate,
        },
        num_channels: i32::from(input.channels % 3),
        export_linear: input.export_linear,
        suppression_level: input.suppression_level,
    };
    let handle = if input.null_config {
        aec3_create(ptr::null())
    } else {
        aec3_create(&config)
    };
    if handle.is_null() {
        return;
    }

    let frames = (config.sample_rate / 100) as usize;
    let total = frames * config.num_channels as usize;
    let mut samples = input.samples.clone();
    samples.resize(total, 0);
    let mut output = vec![0i16; total];
    let mut linear = vec![0i16; 160];

    for op in input.operations.iter().take(50) {
        match op {
            FuzzOp::Process {
                frame_size_offset,
                buffer_delay,
                with_linear,
            } => {
                // Only offsets that shrink the frame keep the raw buffers in
                // bounds; those must be rejected.
                let frame_size = frames as i32 - i32::from(frame_size_offset.unsigned_abs() % 3);
                let linear_ptr = if *with_linear {
                    linear.as_mut_ptr()
                } else {
                    ptr::null_mut()
                };
                let result = aec3_process_frame(
                    handle,
                    samples.as_ptr(),
                    samples.as_ptr(),
                    output.as_mut_ptr(),
                    linear_ptr,
                    frame_size,
                    *buffer_delay,
                );
                assert_eq!(result == Aec3Error::None, frame_size == frames as i32);
            }
            FuzzOp::ProcessNullReference => {
                let result = aec3_process_frame(
                    handle,
                    ptr::null(),
                    samples.as_ptr(),
                    output.as_mut_ptr(),
                    ptr::null_mut(),
                    frames as i32,
                    0,
                );
                assert_eq!(result, Aec3Error::NullPointer);
            }
            FuzzOp::ProcessNullOutput => {
                let result = aec3_process_frame(
                    handle,
                    samples.as_ptr(),
                    samples.as_ptr(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    frames as i32,
                    0,
                );
                assert_eq!(result, Aec3Error::NullPointer);
            }
            FuzzOp::GetStats => {
                let mut stats = Aec3Stats::default();
                assert_eq!(aec3_get_stats(handle, &mut stats), Aec3Error::None);
            }
            FuzzOp::GetStatsNull => {
                assert_eq!(aec3_get_stats(handle, ptr::null_mut()), Aec3Error::NullPointer);
            }
        }
    }

    aec3_destroy(handle);
});
