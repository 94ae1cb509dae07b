//! Render history for the linear filter.
//!
//! The lowest band of every render channel is appended to a linear history of
//! `frame_length + max_delay + filter_length` samples per channel. The
//! external delay moves the read position back in time so that the capture of
//! the current frame lines up with the render that produced its echo.

use derive_more::Debug;
use echoframe_common_audio::audio_util::mean_square;
use echoframe_common_audio::channel_buffer::ChannelBuffer;

use crate::common::{BLOCK_SIZE, MAX_EXTERNAL_DELAY_MS};

#[derive(Debug)]
pub(crate) struct RenderBuffer {
    #[debug(skip)]
    history: Vec<Vec<f32>>,
    frame_length: usize,
    filter_length: usize,
    max_delay_samples: usize,
    delay_samples: usize,
    band_rate_hz: u32,
    low_band_energy: f32,
    high_band_energy: f32,
}

impl RenderBuffer {
    pub(crate) fn new(
        band_rate_hz: u32,
        frame_length: usize,
        filter_length: usize,
        num_channels: usize,
    ) -> Self {
        let max_delay_samples = delay_to_samples(MAX_EXTERNAL_DELAY_MS, band_rate_hz);
        let history_length = frame_length + max_delay_samples + filter_length;
        Self {
            history: vec![vec![0.0; history_length]; num_channels],
            frame_length,
            filter_length,
            max_delay_samples,
            delay_samples: 0,
            band_rate_hz,
            low_band_energy: 0.0,
            high_band_energy: 0.0,
        }
    }

    pub(crate) fn num_channels(&self) -> usize {
        self.history.len()
    }

    /// Appends the lowest band of every channel of `render`.
    ///
    /// Also records the largest per-channel block energy of the lowest band
    /// and of the upper bands for the anti-howling logic.
    pub(crate) fn insert(&mut self, render: &ChannelBuffer<f32>) {
        debug_assert_eq!(render.num_frames_per_band(), self.frame_length);
        debug_assert_eq!(render.num_channels(), self.num_channels());
        let n = self.frame_length;
        for (ch, history) in self.history.iter_mut().enumerate() {
            let len = history.len();
            history.copy_within(n.., 0);
            history[len - n..].copy_from_slice(render.channel(0, ch));
        }

        self.low_band_energy = 0.0;
        self.high_band_energy = 0.0;
        for ch in 0..render.num_channels() {
            self.low_band_energy = self
                .low_band_energy
                .max(BLOCK_SIZE as f32 * mean_square(render.channel(0, ch)));
            for band in 1..render.num_bands() {
                self.high_band_energy = self
                    .high_band_energy
                    .max(BLOCK_SIZE as f32 * mean_square(render.channel(band, ch)));
            }
        }
    }

    /// Sets the external delay, clamped to what the history can hold.
    pub(crate) fn set_delay_ms(&mut self, delay_ms: i32) {
        self.delay_samples =
            delay_to_samples(delay_ms, self.band_rate_hz).min(self.max_delay_samples);
    }

    /// Delay currently applied, in ms.
    pub(crate) fn delay_ms(&self) -> i32 {
        (self.delay_samples * 1000 / self.band_rate_hz as usize) as i32
    }

    /// Render samples of channel `ch` aligned with the current capture frame.
    ///
    /// The returned span holds `filter_length - 1 + frame_length` samples. The
    /// filter input for capture sample `i` is `span[i..i + filter_length]`,
    /// oldest sample first.
    pub(crate) fn aligned(&self, ch: usize) -> &[f32] {
        let history = &self.history[ch];
        let end = history.len() - self.delay_samples;
        let start = end - self.frame_length - self.filter_length + 1;
        &history[start..end]
    }

    /// Render samples of channel `ch` aligned with the current capture frame,
    /// one per capture sample.
    pub(crate) fn aligned_frame(&self, ch: usize) -> &[f32] {
        &self.aligned(ch)[self.filter_length - 1..]
    }

    /// Largest mean square over channels of the aligned render frame.
    pub(crate) fn aligned_frame_power(&self) -> f32 {
        (0..self.num_channels())
            .map(|ch| mean_square(self.aligned_frame(ch)))
            .fold(0.0, f32::max)
    }

    pub(crate) fn low_band_energy(&self) -> f32 {
        self.low_band_energy
    }

    pub(crate) fn high_band_energy(&self) -> f32 {
        self.high_band_energy
    }
}

fn delay_to_samples(delay_ms: i32, band_rate_hz: u32) -> usize {
    let delay_ms = delay_ms.clamp(0, MAX_EXTERNAL_DELAY_MS) as usize;
    delay_ms * band_rate_hz as usize / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[f32], num_channels: usize) -> ChannelBuffer<f32> {
        let mut buf = ChannelBuffer::new(values.len(), num_channels, 1);
        for ch in 0..num_channels {
            buf.bands_mut(ch).copy_from_slice(values);
        }
        buf
    }

    #[test]
    fn aligned_frame_is_latest_render_without_delay() {
        let mut buffer = RenderBuffer::new(8_000, 4, 3, 1);
        buffer.insert(&frame(&[1.0, 2.0, 3.0, 4.0], 1));
        assert_eq!(buffer.aligned_frame(0), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.aligned(0).len(), 6);
    }

    #[test]
    fn delay_reads_older_render() {
        let mut buffer = RenderBuffer::new(8_000, 4, 3, 1);
        buffer.insert(&frame(&[1.0, 2.0, 3.0, 4.0], 1));
        buffer.insert(&frame(&[5.0, 6.0, 7.0, 8.0], 1));
        assert_eq!(buffer.aligned_frame(0), &[5.0, 6.0, 7.0, 8.0]);
        buffer.delay_samples = 2;
        assert_eq!(buffer.aligned_frame(0), &[3.0, 4.0, 5.0, 6.0]);
        // 1 ms at 8 kHz is eight samples, further back than any render so far.
        buffer.set_delay_ms(1);
        assert_eq!(buffer.delay_samples, 8);
        assert_eq!(buffer.aligned_frame(0), &[0.0; 4]);
    }

    #[test]
    fn delay_is_clamped_to_history() {
        let mut buffer = RenderBuffer::new(16_000, 160, 832, 1);
        buffer.set_delay_ms(10_000);
        assert_eq!(buffer.delay_ms(), MAX_EXTERNAL_DELAY_MS);
        buffer.set_delay_ms(-20);
        assert_eq!(buffer.delay_ms(), 0);
        buffer.set_delay_ms(40);
        assert_eq!(buffer.delay_ms(), 40);
        assert_eq!(buffer.aligned(0).len(), 160 + 832 - 1);
    }

    #[test]
    fn channels_are_kept_apart() {
        let mut buffer = RenderBuffer::new(8_000, 2, 1, 2);
        let mut render = ChannelBuffer::new(2, 2, 1);
        render.bands_mut(0).copy_from_slice(&[2.0, 4.0]);
        render.bands_mut(1).copy_from_slice(&[0.0, -4.0]);
        buffer.insert(&render);
        assert_eq!(buffer.aligned_frame(0), &[2.0, 4.0]);
        assert_eq!(buffer.aligned_frame(1), &[0.0, -4.0]);
        assert_eq!(buffer.aligned_frame_power(), 10.0);
    }

    #[test]
    fn band_energies_use_block_scale() {
        let mut buffer = RenderBuffer::new(16_000, 160, 64, 1);
        let mut render = ChannelBuffer::new(480, 1, 3);
        render.channel_mut(0, 0).fill(1.0);
        render.channel_mut(2, 0).fill(3.0);
        buffer.insert(&render);
        assert_eq!(buffer.low_band_energy(), BLOCK_SIZE as f32);
        assert_eq!(buffer.high_band_energy(), 9.0 * BLOCK_SIZE as f32);
    }
}
