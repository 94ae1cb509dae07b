//! Exported `extern "C"` functions.
//!
//! All public symbols use the `aec3_` prefix.

use std::{ptr, slice};

use echoframe::{LINEAR_OUTPUT_SAMPLES, Session, SessionConfig};

use crate::panic_guard::{ffi_guard, ffi_guard_ptr};
use crate::types::{Aec3Config, Aec3Error, Aec3Handle, Aec3Stats};

/// Returns the default configuration: 16 kHz mono, no linear output,
/// maximum suppression.
#[unsafe(no_mangle)]
pub extern "C" fn aec3_config_default() -> Aec3Config {
    Aec3Config::from_rust(&SessionConfig::default())
}

/// Creates a session from `config`.
///
/// Returns `NULL` if `config` is null, describes an unsupported rate or
/// channel count, or an internal error occurs. The caller owns the returned
/// handle and must free it with [`aec3_destroy()`].
#[unsafe(no_mangle)]
pub extern "C" fn aec3_create(config: *const Aec3Config) -> *mut Aec3Handle {
    ffi_guard_ptr! {
        if config.is_null() {
            return ptr::null_mut();
        }
        // Safety: the caller guarantees a non-null config points to a valid
        // `Aec3Config`.
        let config = unsafe { *config };
        let Ok(config) = config.to_rust() else {
            return ptr::null_mut();
        };
        match Session::new(&config) {
            Ok(session) => Box::into_raw(Box::new(Aec3Handle { inner: session })),
            Err(_) => ptr::null_mut(),
        }
    }
}

/// Destroys a session and frees its memory.
///
/// Passing `NULL` is a safe no-op. After this call the handle is invalid;
/// destroying it twice is undefined behaviour.
#[unsafe(no_mangle)]
pub extern "C" fn aec3_destroy(handle: *mut Aec3Handle) {
    if !handle.is_null() {
        // Safety: the handle was created by `Box::into_raw` in `aec3_create`
        // and the caller guarantees single ownership.
        let _ = unsafe { Box::from_raw(handle) };
    }
}

/// Processes one 10 ms frame.
///
/// `reference`, `capture` and `output` each hold `frame_size` interleaved
/// samples per channel. `linear_output` may be `NULL`. When it is not and the
/// session was created with `export_linear`, it must hold 160 samples; the
/// 16 kHz linear filter output is written there.
///
/// Returns `AEC3_ERROR_NULL_POINTER` without touching any buffer if
/// `handle`, `reference`, `capture` or `output` is null.
#[unsafe(no_mangle)]
pub extern "C" fn aec3_process_frame(
    handle: *mut Aec3Handle,
    reference: *const i16,
    capture: *const i16,
    output: *mut i16,
    linear_output: *mut i16,
    frame_size: i32,
    buffer_delay: i32,
) -> Aec3Error {
    ffi_guard! {
        if handle.is_null() || reference.is_null() || capture.is_null() || output.is_null() {
            return Aec3Error::NullPointer;
        }
        // Safety: the caller guarantees the handle is valid and not aliased.
        let session = unsafe { &mut (*handle).inner };

        // The buffer lengths derive from the frame size, so it is checked
        // before any slice is formed.
        let frame_size = match usize::try_from(frame_size) {
            Ok(n) if n == session.frame_size() => n,
            _ => return Aec3Error::BadFrameSize,
        };
        let num_samples = frame_size * session.num_channels();

        // Safety: the caller guarantees each non-null buffer holds
        // `frame_size * num_channels` samples, and `linear_output` 160
        // samples when the session exports linear output.
        let (reference, capture, output) = unsafe {
            (
                slice::from_raw_parts(reference, num_samples),
                slice::from_raw_parts(capture, num_samples),
                slice::from_raw_parts_mut(output, num_samples),
            )
        };
        let linear_output = (!linear_output.is_null() && session.exports_linear())
            .then(|| unsafe { slice::from_raw_parts_mut(linear_output, LINEAR_OUTPUT_SAMPLES) });

        match session.process(
            reference,
            capture,
            output,
            linear_output,
            frame_size,
            buffer_delay,
        ) {
            Ok(()) => Aec3Error::None,
            Err(e) => e.into(),
        }
    }
}

/// Writes the session's echo statistics to `stats_out`.
///
/// Returns `AEC3_ERROR_NULL_POINTER` if `handle` or `stats_out` is null.
#[unsafe(no_mangle)]
pub extern "C" fn aec3_get_stats(handle: *const Aec3Handle, stats_out: *mut Aec3Stats) -> Aec3Error {
    ffi_guard! {
        if handle.is_null() || stats_out.is_null() {
            return Aec3Error::NullPointer;
        }
        // Safety: the caller guarantees both pointers are valid.
        let session = unsafe { &(*handle).inner };
        let stats = Aec3Stats::from_rust(&session.statistics());
        unsafe { ptr::write(stats_out, stats) };
        Aec3Error::None
    }
}
