//! Band splitting for 32 kHz and 48 kHz frames.
//!
//! A 320-sample frame is split into two 160-sample bands by an allpass QMF
//! pair. A 480-sample frame is split into three by
//! [`ThreeBandFilterBank`]. Every band is sampled at 16 kHz.

use echoframe_common_audio::channel_buffer::ChannelBuffer;

use crate::three_band_filter_bank::{
    FULL_BAND_SIZE, NUM_BANDS as THREE_BANDS, SPLIT_BAND_SIZE, ThreeBandFilterBank,
};

const TWO_BAND_FRAME_SIZE: usize = 2 * SPLIT_BAND_SIZE;

/// Allpass coefficients for the odd-indexed polyphase branch.
const ALLPASS_ODD: [f32; 3] = [0.097_930_908_2, 0.564_300_537_1, 0.873_733_520_5];
/// Allpass coefficients for the even-indexed polyphase branch.
const ALLPASS_EVEN: [f32; 3] = [0.325_515_747_07, 0.748_626_708_98, 0.961_456_298_82];

/// Three first-order allpass sections in series,
/// `y[n] = x[n-1] + a * (x[n] - y[n-1])`, each keeping its last input and
/// output across calls.
#[derive(Debug, Clone, Copy, Default)]
struct AllpassCascade {
    state: [[f32; 2]; 3],
}

impl AllpassCascade {
    fn process(&mut self, coefficients: &[f32; 3], data: &mut [f32]) {
        for (section, &a) in self.state.iter_mut().zip(coefficients) {
            let [mut x_prev, mut y_prev] = *section;
            for v in data.iter_mut() {
                let x = *v;
                let y = x_prev + a * (x - y_prev);
                *v = y;
                x_prev = x;
                y_prev = y;
            }
            *section = [x_prev, y_prev];
        }
    }
}

/// Two-band QMF state of one channel.
#[derive(Debug, Clone, Copy, Default)]
struct QmfState {
    analysis_odd: AllpassCascade,
    analysis_even: AllpassCascade,
    synthesis_sum: AllpassCascade,
    synthesis_diff: AllpassCascade,
}

impl QmfState {
    fn analysis(&mut self, input: &[f32], low: &mut [f32], high: &mut [f32]) {
        debug_assert_eq!(input.len(), TWO_BAND_FRAME_SIZE);
        let mut even = [0.0; SPLIT_BAND_SIZE];
        let mut odd = [0.0; SPLIT_BAND_SIZE];
        for (i, pair) in input.chunks_exact(2).enumerate() {
            even[i] = pair[0];
            odd[i] = pair[1];
        }
        self.analysis_odd.process(&ALLPASS_ODD, &mut odd);
        self.analysis_even.process(&ALLPASS_EVEN, &mut even);

        for i in 0..SPLIT_BAND_SIZE {
            low[i] = (odd[i] + even[i]) * 0.5;
            high[i] = (odd[i] - even[i]) * 0.5;
        }
    }

    fn synthesis(&mut self, low: &[f32], high: &[f32], output: &mut [f32]) {
        debug_assert_eq!(output.len(), TWO_BAND_FRAME_SIZE);
        let mut sum = [0.0; SPLIT_BAND_SIZE];
        let mut diff = [0.0; SPLIT_BAND_SIZE];
        for i in 0..SPLIT_BAND_SIZE {
            sum[i] = low[i] + high[i];
            diff[i] = low[i] - high[i];
        }
        self.synthesis_sum.process(&ALLPASS_EVEN, &mut sum);
        self.synthesis_diff.process(&ALLPASS_ODD, &mut diff);

        // Output stays within the S16 range.
        for (i, pair) in output.chunks_exact_mut(2).enumerate() {
            pair[0] = diff[i].clamp(-32768.0, 32767.0);
            pair[1] = sum[i].clamp(-32768.0, 32767.0);
        }
    }
}

#[derive(Debug)]
enum Banks {
    Two(Vec<QmfState>),
    Three(Vec<ThreeBandFilterBank>),
}

/// Per-channel band splitter for two or three bands.
#[derive(Debug)]
pub(crate) struct SplittingFilter {
    banks: Banks,
}

impl SplittingFilter {
    /// # Panics
    ///
    /// Panics unless `num_bands` is 2 or 3.
    pub(crate) fn new(num_channels: usize, num_bands: usize) -> Self {
        let banks = match num_bands {
            2 => Banks::Two(vec![QmfState::default(); num_channels]),
            THREE_BANDS => Banks::Three(vec![ThreeBandFilterBank::new(); num_channels]),
            _ => panic!("band splitting needs 2 or 3 bands, got {num_bands}"),
        };
        Self { banks }
    }

    /// Splits the full-band channels of `data` into the bands of `bands`.
    pub(crate) fn analysis(&mut self, data: &ChannelBuffer<f32>, bands: &mut ChannelBuffer<f32>) {
        debug_assert_eq!(data.num_channels(), bands.num_channels());
        debug_assert_eq!(data.num_frames(), bands.num_frames());
        match &mut self.banks {
            Banks::Two(states) => {
                debug_assert_eq!(data.num_frames(), TWO_BAND_FRAME_SIZE);
                for (ch, state) in states.iter_mut().enumerate() {
                    let (low, high) = bands.bands_mut(ch).split_at_mut(SPLIT_BAND_SIZE);
                    state.analysis(data.bands(ch), low, high);
                }
            }
            Banks::Three(banks) => {
                debug_assert_eq!(data.num_frames(), FULL_BAND_SIZE);
                let mut split = [[0.0; SPLIT_BAND_SIZE]; THREE_BANDS];
                for (ch, bank) in banks.iter_mut().enumerate() {
                    let mut input = [0.0; FULL_BAND_SIZE];
                    input.copy_from_slice(data.bands(ch));
                    bank.analysis(&input, &mut split);
                    for (band, samples) in split.iter().enumerate() {
                        bands.channel_mut(band, ch).copy_from_slice(samples);
                    }
                }
            }
        }
    }

    /// Merges the bands of `bands` into the full-band channels of `data`.
    pub(crate) fn synthesis(&mut self, bands: &ChannelBuffer<f32>, data: &mut ChannelBuffer<f32>) {
        debug_assert_eq!(data.num_channels(), bands.num_channels());
        debug_assert_eq!(data.num_frames(), bands.num_frames());
        match &mut self.banks {
            Banks::Two(states) => {
                for (ch, state) in states.iter_mut().enumerate() {
                    state.synthesis(bands.channel(0, ch), bands.channel(1, ch), data.bands_mut(ch));
                }
            }
            Banks::Three(banks) => {
                let mut split = [[0.0; SPLIT_BAND_SIZE]; THREE_BANDS];
                let mut output = [0.0; FULL_BAND_SIZE];
                for (ch, bank) in banks.iter_mut().enumerate() {
                    for (band, samples) in split.iter_mut().enumerate() {
                        samples.copy_from_slice(bands.channel(band, ch));
                    }
                    bank.synthesis(&split, &mut output);
                    data.bands_mut(ch).copy_from_slice(&output);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    fn tone(buffer: &mut ChannelBuffer<f32>, ch: usize, freq: f32, rate: f32, offset: usize) {
        for (i, x) in buffer.bands_mut(ch).iter_mut().enumerate() {
            *x = 4096.0 * (2.0 * PI * freq * (offset + i) as f32 / rate).sin();
        }
    }

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|x| x * x).sum()
    }

    #[test]
    fn allpass_section_matches_difference_equation() {
        let mut cascade = AllpassCascade::default();
        let mut data = [1.0, 0.0, 0.0];
        cascade.process(&[0.5, 0.0, 0.0], &mut data);
        // First section: y0 = 0.5, y1 = 1 - 0.25, y2 = 0 + 0.5 * -0.75. The
        // zero-coefficient sections then delay by one sample each.
        assert_eq!(data, [0.0, 0.0, 0.5]);
        assert_eq!(cascade.state[0], [0.0, -0.375]);
    }

    #[test]
    fn two_band_low_tone_stays_in_low_band() {
        let mut filter = SplittingFilter::new(1, 2);
        let mut data = ChannelBuffer::new(320, 1, 1);
        let mut bands = ChannelBuffer::new(320, 1, 2);
        for chunk in 0..5 {
            tone(&mut data, 0, 500.0, 32_000.0, chunk * 320);
            filter.analysis(&data, &mut bands);
        }
        let low = energy(bands.channel(0, 0));
        let high = energy(bands.channel(1, 0));
        assert!(low > 5.0 * high, "low {low}, high {high}");
    }

    #[test]
    fn two_band_round_trip_preserves_energy() {
        let mut filter = SplittingFilter::new(2, 2);
        let mut data = ChannelBuffer::new(320, 2, 1);
        let mut bands = ChannelBuffer::new(320, 2, 2);
        let mut input_energy = 0.0;
        for chunk in 0..10 {
            tone(&mut data, 0, 1_000.0, 32_000.0, chunk * 320);
            tone(&mut data, 1, 11_000.0, 32_000.0, chunk * 320);
            input_energy = energy(data.bands(0));
            filter.analysis(&data, &mut bands);
            filter.synthesis(&bands, &mut data);
        }
        let output_energy = energy(data.bands(0));
        assert!(
            output_energy > 0.5 * input_energy && output_energy < 2.0 * input_energy,
            "input {input_energy}, output {output_energy}"
        );
        assert!(energy(data.bands(1)) > 0.0);
    }

    #[test]
    fn three_band_zero_input_gives_zero_bands() {
        let mut filter = SplittingFilter::new(1, 3);
        let data = ChannelBuffer::new(480, 1, 1);
        let mut bands = ChannelBuffer::new(480, 1, 3);
        filter.analysis(&data, &mut bands);
        assert!((0..3).all(|b| bands.channel(b, 0).iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn three_band_channels_are_independent() {
        let mut filter = SplittingFilter::new(2, 3);
        let mut data = ChannelBuffer::new(480, 2, 1);
        let mut bands = ChannelBuffer::new(480, 2, 3);
        tone(&mut data, 0, 1_000.0, 48_000.0, 0);
        filter.analysis(&data, &mut bands);
        assert!(energy(bands.channel(0, 0)) > 0.0);
        assert_eq!(energy(bands.channel(0, 1)), 0.0);
    }

    #[test]
    #[should_panic(expected = "2 or 3 bands")]
    fn single_band_is_rejected() {
        let _ = SplittingFilter::new(1, 1);
    }
}
