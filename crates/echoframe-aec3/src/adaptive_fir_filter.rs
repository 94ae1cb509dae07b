//! Time-domain adaptive FIR filter.
//!
//! One capture channel is modeled as the sum of every render channel passed
//! through its own echo path, so the filter holds one tap set per render
//! channel. Taps are stored oldest-first so that the output for a render
//! window is a plain dot product with the window.

use derive_more::Debug;

use crate::render_buffer::RenderBuffer;

#[derive(Debug, Clone)]
pub(crate) struct AdaptiveFirFilter {
    length: usize,
    /// `taps[render_ch]`, each `length` long.
    #[debug(skip)]
    taps: Vec<Vec<f32>>,
}

impl AdaptiveFirFilter {
    pub(crate) fn new(length: usize, num_render_channels: usize) -> Self {
        Self {
            length,
            taps: vec![vec![0.0; length]; num_render_channels],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.length
    }

    /// Echo estimate for capture sample `i` of the current frame.
    #[inline]
    pub(crate) fn filter(&self, render: &RenderBuffer, i: usize) -> f32 {
        debug_assert_eq!(render.num_channels(), self.taps.len());
        self.taps
            .iter()
            .enumerate()
            .map(|(ch, taps)| dot(taps, &render.aligned(ch)[i..i + self.length]))
            .sum()
    }

    /// `h[ch] += step * window[ch]` for every render channel.
    #[inline]
    pub(crate) fn adapt(&mut self, render: &RenderBuffer, i: usize, step: f32) {
        for (ch, taps) in self.taps.iter_mut().enumerate() {
            let window = &render.aligned(ch)[i..i + self.length];
            for (h, &x) in taps.iter_mut().zip(window) {
                *h += step * x;
            }
        }
    }

    /// Echo return loss of the modeled echo paths, `sum(h^2)` over every
    /// render channel.
    pub(crate) fn erl(&self) -> f32 {
        self.taps.iter().flatten().map(|h| h * h).sum()
    }

    #[cfg(test)]
    pub(crate) fn taps(&self, render_ch: usize) -> &[f32] {
        &self.taps[render_ch]
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use echoframe_common_audio::channel_buffer::ChannelBuffer;

    use super::*;

    fn render(buffer: &mut RenderBuffer, channels: &[&[f32]]) {
        let mut frame = ChannelBuffer::new(channels[0].len(), channels.len(), 1);
        for (ch, values) in channels.iter().enumerate() {
            frame.bands_mut(ch).copy_from_slice(values);
        }
        buffer.insert(&frame);
    }

    #[test]
    fn filter_is_dot_product() {
        let mut buffer = RenderBuffer::new(8_000, 1, 3, 1);
        let mut filter = AdaptiveFirFilter::new(3, 1);
        for x in [1.0, 2.0, 3.0] {
            render(&mut buffer, &[&[x]]);
        }
        filter.adapt(&buffer, 0, 0.5);
        assert_eq!(filter.taps(0), &[0.5, 1.0, 1.5]);
        for x in [2.0, 0.0, -1.0] {
            render(&mut buffer, &[&[x]]);
        }
        assert_eq!(filter.filter(&buffer, 0), 1.0 - 1.5);
    }

    #[test]
    fn output_sums_over_render_channels() {
        let mut buffer = RenderBuffer::new(8_000, 2, 2, 2);
        let mut filter = AdaptiveFirFilter::new(2, 2);
        render(&mut buffer, &[&[1.0, 1.0], &[2.0, -2.0]]);
        filter.adapt(&buffer, 1, 1.0);
        assert_eq!(filter.taps(0), &[1.0, 1.0]);
        assert_eq!(filter.taps(1), &[2.0, -2.0]);
        // 1 + 1 from the first channel, 4 + 4 from the second.
        assert_eq!(filter.filter(&buffer, 1), 10.0);
        assert_eq!(filter.erl(), 10.0);
    }

    #[test]
    fn erl_sums_squared_taps() {
        let mut buffer = RenderBuffer::new(8_000, 4, 4, 1);
        let mut filter = AdaptiveFirFilter::new(4, 1);
        assert_eq!(filter.erl(), 0.0);
        render(&mut buffer, &[&[1.0, -2.0, 0.0, 2.0]]);
        filter.adapt(&buffer, 3, 1.0);
        assert_eq!(filter.erl(), 9.0);
    }

    #[test]
    fn nlms_identifies_separate_echo_paths() {
        // Each render channel reaches the capture through its own path.
        let paths: [[f32; 4]; 2] = [[0.0, 0.5, -0.25, 0.0], [0.3, 0.0, 0.0, 0.1]];
        // Taps are oldest-first, so the expected taps are the reversed paths.
        let expected = paths.map(|mut p| {
            p.reverse();
            p
        });
        let length = paths[0].len();
        let mut buffer = RenderBuffer::new(8_000, 1, length, 2);
        let mut filter = AdaptiveFirFilter::new(length, 2);
        let mut seed = 7u32;
        let mut next = || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 16) as f32 / 65_536.0 - 0.5
        };
        for _ in 0..4000 {
            let (a, b) = (next(), next());
            render(&mut buffer, &[&[a], &[b]]);
            let y: f32 = (0..2).map(|ch| dot(&expected[ch], buffer.aligned(ch))).sum();
            let e = y - filter.filter(&buffer, 0);
            let px: f32 = (0..2)
                .map(|ch| buffer.aligned(ch).iter().map(|x| x * x).sum::<f32>())
                .sum();
            if px > 0.0 {
                filter.adapt(&buffer, 0, 0.5 * e / px);
            }
        }
        for (ch, taps) in expected.iter().enumerate() {
            for (h, target) in filter.taps(ch).iter().zip(taps) {
                assert!((h - target).abs() < 1e-3, "channel {ch}: {h} vs {target}");
            }
        }
    }
}
