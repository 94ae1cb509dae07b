//! Multi-band representation of one 10 ms frame.
//!
//! [`AudioBuffer`] holds a frame in FloatS16, full-band and, for 32 kHz and
//! 48 kHz, split into 16 kHz bands. It is the shape the echo canceller and
//! the high-pass filter operate on.

use derive_more::Debug;
use echoframe_common_audio::audio_util;
use echoframe_common_audio::channel_buffer::ChannelBuffer;

use crate::audio_frame::AudioFrame;
use crate::splitting_filter::SplittingFilter;

fn num_bands_from_frames_per_channel(num_frames: usize) -> usize {
    match num_frames {
        320 => 2,
        480 => 3,
        _ => 1,
    }
}

/// One frame of audio, full-band and optionally band-split.
///
/// The full-band and band-split data live in separate buffers. After
/// [`split_into_frequency_bands`](Self::split_into_frequency_bands) the
/// band-split buffer is current. After
/// [`merge_frequency_bands`](Self::merge_frequency_bands) the full-band
/// buffer is. For rates with a single band both views share one buffer.
#[derive(Debug)]
pub struct AudioBuffer {
    sample_rate_hz: u32,
    num_frames: usize,
    num_bands: usize,
    data: ChannelBuffer<f32>,
    split_data: Option<ChannelBuffer<f32>>,
    #[debug(skip)]
    splitting_filter: Option<SplittingFilter>,
}

impl AudioBuffer {
    /// Creates a zeroed buffer for 10 ms frames at `sample_rate_hz`.
    ///
    /// # Panics
    ///
    /// Panics if the rate is below 100 Hz or `num_channels` is zero.
    pub fn new(sample_rate_hz: u32, num_channels: usize) -> Self {
        let num_frames = sample_rate_hz as usize / 100;
        assert!(num_frames > 0, "sample rate {sample_rate_hz} Hz is too low");
        assert!(num_channels > 0, "num_channels must be > 0");
        let num_bands = num_bands_from_frames_per_channel(num_frames);

        let (split_data, splitting_filter) = if num_bands > 1 {
            (
                Some(ChannelBuffer::new(num_frames, num_channels, num_bands)),
                Some(SplittingFilter::new(num_channels, num_bands)),
            )
        } else {
            (None, None)
        };

        Self {
            sample_rate_hz,
            num_frames,
            num_bands,
            data: ChannelBuffer::new(num_frames, num_channels, 1),
            split_data,
            splitting_filter,
        }
    }

    #[inline]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.data.num_channels()
    }

    /// Frames per channel at the full-band rate.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Frames per band per channel.
    #[inline]
    pub fn num_frames_per_band(&self) -> usize {
        self.num_frames / self.num_bands
    }

    /// Full-band samples of one channel.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        self.data.bands(channel)
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        self.data.bands_mut(channel)
    }

    /// One band of one channel of the band-split data.
    pub fn split_band(&self, channel: usize, band: usize) -> &[f32] {
        self.split_bands().channel(band, channel)
    }

    pub fn split_band_mut(&mut self, channel: usize, band: usize) -> &mut [f32] {
        self.split_bands_mut().channel_mut(band, channel)
    }

    /// The full-band data.
    #[inline]
    pub fn data(&self) -> &ChannelBuffer<f32> {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut ChannelBuffer<f32> {
        &mut self.data
    }

    /// The band-split data, or the full-band data when the rate has a single
    /// band.
    pub fn split_bands(&self) -> &ChannelBuffer<f32> {
        self.split_data.as_ref().unwrap_or(&self.data)
    }

    pub fn split_bands_mut(&mut self) -> &mut ChannelBuffer<f32> {
        match &mut self.split_data {
            Some(split) => split,
            None => &mut self.data,
        }
    }

    /// Loads the interleaved samples of `frame` into the full-band data.
    ///
    /// # Panics
    ///
    /// Panics if the frame shape does not match the buffer.
    pub fn copy_from(&mut self, frame: &AudioFrame) {
        assert_eq!(frame.samples_per_channel(), self.num_frames, "frame length");
        assert_eq!(frame.num_channels(), self.num_channels(), "channel count");
        audio_util::deinterleave_to_float_s16(frame.data(), &mut self.data);
    }

    /// Writes the full-band data into `frame` as interleaved, saturated S16.
    ///
    /// # Panics
    ///
    /// Panics if the frame shape does not match the buffer.
    pub fn copy_to(&self, frame: &mut AudioFrame) {
        assert_eq!(frame.samples_per_channel(), self.num_frames, "frame length");
        assert_eq!(frame.num_channels(), self.num_channels(), "channel count");
        audio_util::interleave_to_s16(&self.data, frame.data_mut());
    }

    /// Splits the full-band data into bands. No-op for single-band rates.
    pub fn split_into_frequency_bands(&mut self) {
        if let (Some(filter), Some(split)) = (&mut self.splitting_filter, &mut self.split_data) {
            filter.analysis(&self.data, split);
        }
    }

    /// Merges the bands back into the full-band data. No-op for single-band
    /// rates.
    pub fn merge_frequency_bands(&mut self) {
        if let (Some(filter), Some(split)) = (&mut self.splitting_filter, &self.split_data) {
            filter.synthesis(split, &mut self.data);
        }
    }
}
