//! `#[repr(C)]` types of the C API.

use echoframe::{EchoStats, Error, Session, SessionConfig};

/// Status codes. `0` is success, negative values are errors.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aec3Error {
    /// Operation succeeded.
    None = 0,
    /// A required pointer was null.
    NullPointer = -1,
    /// Internal error (panic caught at the FFI boundary).
    Internal = -2,
    /// Sample rate is not 8000, 16000, 32000 or 48000 Hz.
    BadSampleRate = -3,
    /// Channel count is not positive.
    BadNumberChannels = -4,
    /// A sample buffer is too short.
    BadDataLength = -5,
    /// Frame size is not 10 ms at the session rate.
    BadFrameSize = -6,
}

impl From<Error> for Aec3Error {
    fn from(error: Error) -> Self {
        match error {
            Error::BadSampleRate => Self::BadSampleRate,
            Error::BadNumberChannels => Self::BadNumberChannels,
            Error::BadFrameSize => Self::BadFrameSize,
            Error::BadDataLength => Self::BadDataLength,
        }
    }
}

/// Session parameters, read once by `aec3_create()`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Aec3Config {
    /// 8000, 16000, 32000 or 48000.
    pub sample_rate: i32,
    /// Interleaved channels per frame.
    pub num_channels: i32,
    /// Produce the 16 kHz linear filter output.
    pub export_linear: bool,
    /// Suppression aggressiveness in `[0, 1]`. `<= 0` means maximum.
    pub suppression_level: f32,
}

impl Aec3Config {
    pub(crate) fn from_rust(config: &SessionConfig) -> Self {
        Self {
            sample_rate: i32::try_from(config.sample_rate_hz).unwrap_or(i32::MAX),
            num_channels: i32::try_from(config.num_channels).unwrap_or(i32::MAX),
            export_linear: config.export_linear,
            suppression_level: config.suppression_level,
        }
    }

    /// Converts to a session config. Negative rates and channel counts map to
    /// the corresponding error.
    pub(crate) fn to_rust(self) -> Result<SessionConfig, Aec3Error> {
        let sample_rate_hz = u32::try_from(self.sample_rate).map_err(|_| Aec3Error::BadSampleRate)?;
        let num_channels =
            usize::try_from(self.num_channels).map_err(|_| Aec3Error::BadNumberChannels)?;
        Ok(SessionConfig {
            sample_rate_hz,
            num_channels,
            export_linear: self.export_linear,
            suppression_level: self.suppression_level,
        })
    }
}

/// Echo statistics. Each value is only meaningful when its `has_*` flag is
/// set.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Aec3Stats {
    pub has_echo_return_loss: bool,
    pub echo_return_loss: f64,

    pub has_echo_return_loss_enhancement: bool,
    pub echo_return_loss_enhancement: f64,

    pub has_delay_ms: bool,
    pub delay_ms: i32,
}

impl Aec3Stats {
    pub(crate) fn from_rust(stats: &EchoStats) -> Self {
        Self {
            has_echo_return_loss: stats.echo_return_loss.is_some(),
            echo_return_loss: stats.echo_return_loss.unwrap_or_default(),
            has_echo_return_loss_enhancement: stats.echo_return_loss_enhancement.is_some(),
            echo_return_loss_enhancement: stats.echo_return_loss_enhancement.unwrap_or_default(),
            has_delay_ms: stats.delay_ms.is_some(),
            delay_ms: stats.delay_ms.unwrap_or_default(),
        }
    }
}

/// Opaque session handle.
///
/// Created via `aec3_create()`, destroyed via `aec3_destroy()`.
///
/// **NOT thread-safe**: all calls on the same handle must be serialized.
#[derive(Debug)]
pub struct Aec3Handle {
    pub(crate) inner: Session,
}
