//! Multi-channel, multi-band sample storage.
//!
//! All samples live in one allocation. Each channel owns a contiguous run of
//! `num_frames` samples which is further divided into `num_bands` equally
//! sized bands:
//!
//! ```text
//! [ ch0: band0 | band1 | band2 ][ ch1: band0 | band1 | band2 ]
//! ```

use derive_more::Debug;

/// Multi-channel, optionally multi-band audio buffer.
#[derive(Debug, Clone)]
pub struct ChannelBuffer<T> {
    #[debug(skip)]
    data: Vec<T>,
    num_frames: usize,
    num_frames_per_band: usize,
    num_channels: usize,
    num_bands: usize,
}

impl<T: Copy + Default> ChannelBuffer<T> {
    /// Creates a zero-initialized buffer.
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` or `num_bands` is zero, or if `num_frames` is
    /// not a multiple of `num_bands`.
    pub fn new(num_frames: usize, num_channels: usize, num_bands: usize) -> Self {
        assert!(num_channels > 0, "num_channels must be > 0");
        assert!(num_bands > 0, "num_bands must be > 0");
        assert!(
            num_frames.is_multiple_of(num_bands),
            "num_frames ({num_frames}) must be divisible by num_bands ({num_bands})"
        );
        Self {
            data: vec![T::default(); num_frames * num_channels],
            num_frames,
            num_frames_per_band: num_frames / num_bands,
            num_channels,
            num_bands,
        }
    }

    /// Resets every sample to `T::default()`.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }
}

impl<T> ChannelBuffer<T> {
    /// Frames per channel, summed over all bands.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Frames in a single band.
    #[inline]
    pub fn num_frames_per_band(&self) -> usize {
        self.num_frames_per_band
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    #[inline]
    fn band_start(&self, band: usize, channel: usize) -> usize {
        debug_assert!(band < self.num_bands);
        debug_assert!(channel < self.num_channels);
        channel * self.num_frames + band * self.num_frames_per_band
    }

    /// Samples of one band of one channel.
    #[inline]
    pub fn channel(&self, band: usize, channel: usize) -> &[T] {
        let start = self.band_start(band, channel);
        &self.data[start..start + self.num_frames_per_band]
    }

    #[inline]
    pub fn channel_mut(&mut self, band: usize, channel: usize) -> &mut [T] {
        let start = self.band_start(band, channel);
        &mut self.data[start..start + self.num_frames_per_band]
    }

    /// All bands of one channel, back to back (`num_frames` samples).
    ///
    /// For a single-band buffer this is the full-band signal of the channel.
    #[inline]
    pub fn bands(&self, channel: usize) -> &[T] {
        debug_assert!(channel < self.num_channels);
        let start = channel * self.num_frames;
        &self.data[start..start + self.num_frames]
    }

    #[inline]
    pub fn bands_mut(&mut self, channel: usize) -> &mut [T] {
        debug_assert!(channel < self.num_channels);
        let start = channel * self.num_frames;
        &mut self.data[start..start + self.num_frames]
    }
}
