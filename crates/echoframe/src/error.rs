use std::fmt;

/// Errors returned by [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Sample rate is not 8, 16, 32 or 48 kHz.
    BadSampleRate,
    /// Zero channels.
    BadNumberChannels,
    /// Frame size does not cover exactly 10 ms at the session rate.
    BadFrameSize,
    /// A sample buffer is shorter than the frame it has to hold.
    BadDataLength,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSampleRate => write!(f, "bad sample rate"),
            Self::BadNumberChannels => write!(f, "bad number of channels"),
            Self::BadFrameSize => write!(f, "frame size is not 10 ms at the session rate"),
            Self::BadDataLength => write!(f, "sample buffer too short for the frame"),
        }
    }
}

impl std::error::Error for Error {}
