//! Session configuration.

/// Parameters read once when a [`Session`](crate::Session) is created.
///
/// # Example
///
/// ```
/// use echoframe::SessionConfig;
///
/// let config = SessionConfig {
///     sample_rate_hz: 48_000,
///     num_channels: 2,
///     ..Default::default()
/// };
/// assert_eq!(config.suppression_level, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Sample rate of every frame passed to the session: 8000, 16000, 32000
    /// or 48000 Hz.
    pub sample_rate_hz: u32,
    /// Interleaved channels per frame.
    pub num_channels: usize,
    /// Allocate the 16 kHz linear-output path.
    pub export_linear: bool,
    /// Suppression aggressiveness, nominally in `[0, 1]`.
    ///
    /// Values at or below zero and NaN select maximum suppression. Values
    /// above one are clamped.
    pub suppression_level: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            num_channels: 1,
            export_linear: false,
            suppression_level: 1.0,
        }
    }
}

impl SessionConfig {
    /// Samples per channel in one 10 ms frame.
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.sample_rate_hz as usize / 100
    }
}
