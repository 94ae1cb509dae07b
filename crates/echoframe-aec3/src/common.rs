//! Constants and helpers shared by the engine modules.

use echoframe_common_audio::audio_util::mean_square;

/// Block length in samples. Power thresholds in the configuration are
/// expressed as energies over one block of the lowest band.
pub const BLOCK_SIZE: usize = 64;

/// Granularity of filter adaptation, in samples of the lowest band.
pub(crate) const SUB_BLOCK_SIZE: usize = 80;

/// Maximum number of 8 kHz-wide bands (48 kHz full band).
pub const MAX_NUM_BANDS: usize = 3;

/// Number of frequency regions the suppressor splits the lowest band into.
pub(crate) const NUM_REGIONS: usize = 3;

/// Largest external delay the render history can absorb.
pub const MAX_EXTERNAL_DELAY_MS: i32 = 500;

/// Capture samples at or above this magnitude count as saturated.
pub(crate) const SATURATION_THRESHOLD: f32 = 32_700.0;

/// Frames processed per second (10 ms frames).
pub(crate) const NUM_FRAMES_PER_SECOND: usize = 100;

/// Sample rates the engine accepts.
pub fn valid_full_band_rate(sample_rate_hz: u32) -> bool {
    matches!(sample_rate_hz, 8_000 | 16_000 | 32_000 | 48_000)
}

/// Number of 8 kHz-wide bands a full-band rate is split into.
pub fn num_bands_for_rate(sample_rate_hz: u32) -> usize {
    if sample_rate_hz == 8_000 {
        1
    } else {
        (sample_rate_hz / 16_000) as usize
    }
}

/// Sample rate of the lowest band.
pub fn band_rate_hz(sample_rate_hz: u32) -> u32 {
    sample_rate_hz.min(16_000)
}

/// Samples per 10 ms frame in the lowest band.
pub fn band_frame_length(sample_rate_hz: u32) -> usize {
    band_rate_hz(sample_rate_hz) as usize / 100
}

/// Energy of `samples` normalized to one [`BLOCK_SIZE`] block.
#[inline]
pub(crate) fn block_energy(samples: &[f32]) -> f32 {
    BLOCK_SIZE as f32 * mean_square(samples)
}
