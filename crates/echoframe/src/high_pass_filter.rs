//! DC and low-frequency rejection applied to the capture signal ahead of
//! echo removal.

use echoframe_common_audio::cascaded_biquad_filter::{BiQuadCoefficients, CascadedBiQuadFilter};

use crate::audio_buffer::AudioBuffer;

const COEFFICIENTS_16KHZ: [BiQuadCoefficients; 3] = [
    BiQuadCoefficients {
        b: [0.877_353_9, -1.754_683_9, 0.877_353_9],
        a: [-1.881_687_3, 0.888_058_5],
    },
    BiQuadCoefficients {
        b: [1.0, -1.999_810_1, 1.0],
        a: [-1.976_035_4, 0.977_970_9],
    },
    BiQuadCoefficients {
        b: [1.0, -1.999_669_2, 1.0],
        a: [-1.994_265_8, 0.995_486_2],
    },
];

const COEFFICIENTS_32KHZ: [BiQuadCoefficients; 3] = [
    BiQuadCoefficients {
        b: [0.910_205_6, -1.820_404_9, 0.910_205_6],
        a: [-1.940_710_9, 0.942_351_3],
    },
    BiQuadCoefficients {
        b: [1.0, -1.999_952_5, 1.0],
        a: [-1.988_434_6, 0.988_921_3],
    },
    BiQuadCoefficients {
        b: [1.0, -1.999_917_3, 1.0],
        a: [-1.997_434_7, 0.997_740_2],
    },
];

const COEFFICIENTS_48KHZ: [BiQuadCoefficients; 3] = [
    BiQuadCoefficients {
        b: [0.921_379, -1.842_755_2, 0.921_379],
        a: [-1.960_45, 0.961_186_3],
    },
    BiQuadCoefficients {
        b: [1.0, -1.999_979, 1.0],
        a: [-1.992_383_4, 0.992_600_1],
    },
    BiQuadCoefficients {
        b: [1.0, -1.999_963_3, 1.0],
        a: [-1.998_357, 0.998_492_8],
    },
];

/// Coefficient set for a construction rate. 8 kHz uses the 16 kHz set.
fn coefficients_for_rate(sample_rate_hz: u32) -> &'static [BiQuadCoefficients; 3] {
    match sample_rate_hz {
        32_000 => &COEFFICIENTS_32KHZ,
        48_000 => &COEFFICIENTS_48KHZ,
        _ => &COEFFICIENTS_16KHZ,
    }
}

/// Per-channel cascade of three biquads.
#[derive(Debug)]
pub struct HighPassFilter {
    sample_rate_hz: u32,
    filters: Vec<CascadedBiQuadFilter>,
}

impl HighPassFilter {
    pub fn new(sample_rate_hz: u32, num_channels: usize) -> Self {
        let coefficients = coefficients_for_rate(sample_rate_hz);
        Self {
            sample_rate_hz,
            filters: vec![CascadedBiQuadFilter::new(coefficients); num_channels],
        }
    }

    /// Filters `audio` in place.
    ///
    /// With `use_split_band_data` only the lowest band of the band-split data
    /// is filtered, otherwise the full-band data.
    pub fn process(&mut self, audio: &mut AudioBuffer, use_split_band_data: bool) {
        debug_assert_eq!(self.filters.len(), audio.num_channels());
        for (ch, filter) in self.filters.iter_mut().enumerate() {
            let samples = if use_split_band_data {
                audio.split_band_mut(ch, 0)
            } else {
                audio.channel_mut(ch)
            };
            filter.process_in_place(samples);
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn num_channels(&self) -> usize {
        self.filters.len()
    }
}
