//! Complementary split of the lowest band into low, mid and high regions.
//!
//! ```text
//! low  = LP(f_low)(x)
//! mid  = LP(f_high)(x - low)
//! high = x - low - mid
//! ```
//!
//! The low-pass sections are first-order Butterworth, for which `x - LP(x)`
//! is exactly the matching first-order high-pass. The regions therefore sum
//! back to the input and a unit gain in every region leaves the signal
//! untouched.

use std::array;
use std::f32::consts::PI;

use echoframe_common_audio::cascaded_biquad_filter::{BiQuadCoefficients, CascadedBiQuadFilter};

use crate::common::NUM_REGIONS;

const LOW_REGION_EDGE_HZ: f32 = 1_000.0;
const HIGH_REGION_EDGE_HZ: f32 = 3_000.0;

/// First-order Butterworth low-pass (bilinear transform) as a biquad section.
pub(crate) fn butterworth_lowpass(cutoff_hz: f32, sample_rate_hz: f32) -> BiQuadCoefficients {
    let k = (PI * cutoff_hz / sample_rate_hz).tan();
    let norm = 1.0 / (k + 1.0);
    BiQuadCoefficients {
        b: [k * norm, k * norm, 0.0],
        a: [(k - 1.0) * norm, 0.0],
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RegionSplitter {
    low: CascadedBiQuadFilter,
    mid: CascadedBiQuadFilter,
}

impl RegionSplitter {
    pub(crate) fn new(band_rate_hz: u32) -> Self {
        let fs = band_rate_hz as f32;
        let low = butterworth_lowpass(LOW_REGION_EDGE_HZ, fs);
        let mid = butterworth_lowpass(HIGH_REGION_EDGE_HZ, fs);
        Self {
            low: CascadedBiQuadFilter::new(&[low]),
            mid: CascadedBiQuadFilter::new(&[mid]),
        }
    }

    /// Splits `x` into `regions`, each as long as `x`.
    pub(crate) fn split(&mut self, x: &[f32], regions: &mut [Vec<f32>; NUM_REGIONS]) {
        let [low, mid, high] = regions;
        debug_assert!(low.len() == x.len() && mid.len() == x.len() && high.len() == x.len());

        self.low.process(x, &mut low[..]);
        for ((h, &v), &l) in high.iter_mut().zip(x).zip(low.iter()) {
            *h = v - l;
        }
        self.mid.process(&high[..], &mut mid[..]);
        for (h, &m) in high.iter_mut().zip(mid.iter()) {
            *h -= m;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
    }
}

/// Creates zeroed region storage for frames of `frame_length` samples.
pub(crate) fn region_buffers(frame_length: usize) -> [Vec<f32>; NUM_REGIONS] {
    array::from_fn(|_| vec![0.0; frame_length])
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoframe_common_audio::audio_util::mean_square;

    fn tone(freq_hz: f32, fs: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| 1000.0 * (2.0 * PI * freq_hz * n as f32 / fs).sin())
            .collect()
    }

    #[test]
    fn butterworth_has_unit_dc_gain() {
        let c = butterworth_lowpass(1_000.0, 16_000.0);
        let dc = (c.b[0] + c.b[1] + c.b[2]) / (1.0 + c.a[0] + c.a[1]);
        assert!((dc - 1.0).abs() < 1e-5, "dc gain {dc}");
    }

    #[test]
    fn regions_sum_to_input() {
        let mut splitter = RegionSplitter::new(16_000);
        let mut regions = region_buffers(160);
        let x: Vec<f32> = (0..160).map(|i| ((i * 53) % 97) as f32 - 48.0).collect();
        splitter.split(&x, &mut regions);
        for i in 0..160 {
            let sum = regions[0][i] + regions[1][i] + regions[2][i];
            assert!((sum - x[i]).abs() < 1e-3, "sample {i}: {sum} vs {}", x[i]);
        }
    }

    #[test]
    fn reset_restores_fresh_state() {
        let x = tone(500.0, 16_000.0, 160);
        let mut fresh = region_buffers(160);
        RegionSplitter::new(16_000).split(&x, &mut fresh);

        let mut splitter = RegionSplitter::new(16_000);
        let mut regions = region_buffers(160);
        splitter.split(&tone(2_000.0, 16_000.0, 160), &mut regions);
        splitter.reset();
        splitter.split(&x, &mut regions);
        assert_eq!(regions, fresh);
    }

    #[test]
    fn tones_land_in_their_region() {
        for (freq, expected) in [(300.0, 0), (2_000.0, 1), (6_000.0, 2)] {
            let mut splitter = RegionSplitter::new(16_000);
            let mut regions = region_buffers(1600);
            splitter.split(&tone(freq, 16_000.0, 1600), &mut regions);
            let energies: Vec<f32> = regions.iter().map(|r| mean_square(&r[800..])).collect();
            let dominant = energies
                .iter()
                .enumerate()
                .fold(0, |best, (i, &e)| if e > energies[best] { i } else { best });
            assert_eq!(dominant, expected, "{freq} Hz energies {energies:?}");
        }
    }
}
