//! Non-linear suppression gains for the lowest band regions and the upper
//! bands.
//!
//! Gains are computed in the power domain per region and capture channel,
//! combined by taking the minimum over channels and returned as amplitude
//! gains.

use crate::common::NUM_REGIONS;
use crate::config::{EchoCanceller3Config, HighBandsSuppression, Tuning};
use crate::nearend_detector::DominantNearendDetector;

const NOISE_INCREASE_FACTOR: f32 = 1.05;

/// Gain applied to the upper bands while the capture is saturated.
const SATURATED_UPPER_BAND_GAIN: f32 = 0.001;

/// Converts the comfort noise floor in dBFS to a block energy.
fn noise_floor_energy(noise_floor_dbfs: f32) -> f32 {
    let dbfs_normalization = 20.0 * 32768.0f32.log10();
    64.0 * 10.0f32.powf((dbfs_normalization + noise_floor_dbfs) * 0.1)
}

/// Masking thresholds and slew limits expanded to one value per region.
#[derive(Debug, Clone)]
struct GainParameters {
    max_inc_factor: f32,
    max_dec_factor_lf: f32,
    enr_transparent: [f32; NUM_REGIONS],
    enr_suppress: [f32; NUM_REGIONS],
    emr_transparent: [f32; NUM_REGIONS],
}

impl GainParameters {
    fn new(tuning: &Tuning) -> Self {
        let lf = &tuning.mask_lf;
        let hf = &tuning.mask_hf;
        let mid = |a: f32, b: f32| 0.5 * (a + b);
        Self {
            max_inc_factor: tuning.max_inc_factor,
            max_dec_factor_lf: tuning.max_dec_factor_lf,
            enr_transparent: [
                lf.enr_transparent,
                mid(lf.enr_transparent, hf.enr_transparent),
                hf.enr_transparent,
            ],
            enr_suppress: [
                lf.enr_suppress,
                mid(lf.enr_suppress, hf.enr_suppress),
                hf.enr_suppress,
            ],
            emr_transparent: [
                lf.emr_transparent,
                mid(lf.emr_transparent, hf.emr_transparent),
                hf.emr_transparent,
            ],
        }
    }
}

/// Per-channel energies of the lowest band regions, in block scale.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RegionEnergies {
    /// Linear filter output (nearend plus residual echo).
    pub(crate) nearend: [f32; NUM_REGIONS],
    /// Linear echo estimate.
    pub(crate) echo: [f32; NUM_REGIONS],
    /// Residual echo after the linear stage.
    pub(crate) residual_echo: [f32; NUM_REGIONS],
}

/// Render energies used by the anti-howling logic, in block scale.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderEnergies {
    pub(crate) low_band: f32,
    pub(crate) high_bands: f32,
}

/// Amplitude gains for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gains {
    pub(crate) low_band: [f32; NUM_REGIONS],
    pub(crate) high_bands: f32,
}

#[derive(Debug)]
pub(crate) struct SuppressionGain {
    normal_params: GainParameters,
    nearend_params: GainParameters,
    normal_render_limit: f32,
    floor_first_increase: f32,
    floor_power: f32,
    audibility_thresholds: [f32; NUM_REGIONS],
    high_bands_suppression: HighBandsSuppression,
    noise_floor: f32,
    num_bands: usize,
    nearend_detector: DominantNearendDetector,
    noise: Vec<[f32; NUM_REGIONS]>,
    weighted_echo: Vec<[f32; NUM_REGIONS]>,
    last_nearend: Vec<[f32; NUM_REGIONS]>,
    last_echo: Vec<[f32; NUM_REGIONS]>,
    last_gain: [f32; NUM_REGIONS],
}

impl SuppressionGain {
    pub(crate) fn new(
        config: &EchoCanceller3Config,
        num_bands: usize,
        num_capture_channels: usize,
    ) -> Self {
        let audibility = &config.echo_audibility;
        let noise_floor = noise_floor_energy(config.comfort_noise.noise_floor_dbfs);
        Self {
            normal_params: GainParameters::new(&config.suppressor.normal_tuning),
            nearend_params: GainParameters::new(&config.suppressor.nearend_tuning),
            normal_render_limit: audibility.normal_render_limit,
            floor_first_increase: config.suppressor.floor_first_increase,
            floor_power: audibility.floor_power,
            audibility_thresholds: [
                audibility.floor_power * audibility.audibility_threshold_lf,
                audibility.floor_power * audibility.audibility_threshold_mf,
                audibility.floor_power * audibility.audibility_threshold_hf,
            ],
            high_bands_suppression: config.suppressor.high_bands_suppression.clone(),
            noise_floor,
            num_bands,
            nearend_detector: DominantNearendDetector::new(
                &config.suppressor.dominant_nearend_detection,
                num_capture_channels,
            ),
            noise: vec![[noise_floor; NUM_REGIONS]; num_capture_channels],
            weighted_echo: vec![[0.0; NUM_REGIONS]; num_capture_channels],
            last_nearend: vec![[0.0; NUM_REGIONS]; num_capture_channels],
            last_echo: vec![[0.0; NUM_REGIONS]; num_capture_channels],
            last_gain: [1.0; NUM_REGIONS],
        }
    }

    pub(crate) fn reset(&mut self) {
        self.last_gain = [1.0; NUM_REGIONS];
        for ch in 0..self.noise.len() {
            self.last_nearend[ch] = [0.0; NUM_REGIONS];
            self.last_echo[ch] = [0.0; NUM_REGIONS];
        }
        self.nearend_detector.reset();
    }

    pub(crate) fn is_nearend_state(&self) -> bool {
        self.nearend_detector.is_nearend_state()
    }

    /// Computes the gains for one frame from the energies of every capture
    /// channel.
    pub(crate) fn get_gain(
        &mut self,
        energies: &[RegionEnergies],
        render: RenderEnergies,
        saturated_capture: bool,
    ) -> Gains {
        debug_assert_eq!(energies.len(), self.noise.len());

        for (ch, e) in energies.iter().enumerate() {
            update_noise(&mut self.noise[ch], &e.nearend, self.noise_floor);
            self.weighted_echo[ch] = weight_echo_for_audibility(
                &e.residual_echo,
                &self.audibility_thresholds,
                self.floor_power,
            );
        }

        self.update_nearend_detector(energies);
        let low_band = self.lower_band_gain(energies, saturated_capture);
        let high_bands = self.upper_bands_gain(energies, render, &low_band, saturated_capture);
        Gains {
            low_band,
            high_bands,
        }
    }

    fn update_nearend_detector(&mut self, energies: &[RegionEnergies]) {
        let low_frequency = |v: &[f32; NUM_REGIONS]| v[0] + v[1];
        let nearend: Vec<f32> = energies.iter().map(|e| low_frequency(&e.nearend)).collect();
        let echo: Vec<f32> = energies
            .iter()
            .map(|e| low_frequency(&e.residual_echo))
            .collect();
        let noise: Vec<f32> = self.noise.iter().map(low_frequency).collect();
        self.nearend_detector.update(&nearend, &echo, &noise);
    }

    fn lower_band_gain(
        &mut self,
        energies: &[RegionEnergies],
        saturated_capture: bool,
    ) -> [f32; NUM_REGIONS] {
        let params = if self.nearend_detector.is_nearend_state() {
            &self.nearend_params
        } else {
            &self.normal_params
        };

        let mut max_gain = [0.0; NUM_REGIONS];
        for (max, &last) in max_gain.iter_mut().zip(&self.last_gain) {
            *max = (last * params.max_inc_factor)
                .max(self.floor_first_increase)
                .min(1.0);
        }

        let mut gain = [1.0f32; NUM_REGIONS];
        for (ch, e) in energies.iter().enumerate() {
            let weighted_echo = &self.weighted_echo[ch];

            let mut min_gain = [0.0f32; NUM_REGIONS];
            if !saturated_capture {
                for (min, &echo) in min_gain.iter_mut().zip(weighted_echo) {
                    *min = if echo > 0.0 {
                        (self.normal_render_limit / echo).min(1.0)
                    } else {
                        1.0
                    };
                }
                // Low frequency gains may not drop quickly after strong nearend.
                if self.last_nearend[ch][0] > self.last_echo[ch][0] {
                    min_gain[0] = min_gain[0]
                        .max(self.last_gain[0] * params.max_dec_factor_lf)
                        .min(1.0);
                }
            }

            let no_audible_echo = gain_to_no_audible_echo(
                params,
                &e.nearend,
                weighted_echo,
                &self.noise[ch],
            );
            for region in 0..NUM_REGIONS {
                let g = no_audible_echo[region]
                    .max(min_gain[region])
                    .min(max_gain[region]);
                gain[region] = gain[region].min(g);
            }

            self.last_nearend[ch] = e.nearend;
            self.last_echo[ch] = *weighted_echo;
        }

        self.last_gain = gain;
        gain.map(f32::sqrt)
    }

    fn upper_bands_gain(
        &self,
        energies: &[RegionEnergies],
        render: RenderEnergies,
        low_band_gain: &[f32; NUM_REGIONS],
        saturated_capture: bool,
    ) -> f32 {
        if self.num_bands == 1 {
            return 1.0;
        }
        let gain_below_8_khz = low_band_gain[NUM_REGIONS - 1];
        if saturated_capture {
            return SATURATED_UPPER_BAND_GAIN.min(gain_below_8_khz);
        }

        let cfg = &self.high_bands_suppression;
        let activation_threshold = 64.0 * cfg.anti_howling_activation_threshold;
        let anti_howling_gain =
            if render.high_bands < render.low_band.max(activation_threshold) {
                1.0
            } else {
                cfg.anti_howling_gain * (render.low_band / render.high_bands).sqrt()
            };

        let mut gain_bound = 1.0f32;
        if !self.nearend_detector.is_nearend_state() {
            for (e, noise) in energies.iter().zip(&self.noise) {
                let echo_sum = e.echo[0] + e.echo[1];
                let noise_sum = noise[0] + noise[1];
                if echo_sum > cfg.enr_threshold * noise_sum {
                    gain_bound = cfg.max_gain_during_echo;
                    break;
                }
            }
        }

        gain_below_8_khz.min(anti_howling_gain).min(gain_bound)
    }
}

/// Minimum-tracking noise estimate with a slow rise.
fn update_noise(noise: &mut [f32; NUM_REGIONS], nearend: &[f32; NUM_REGIONS], floor: f32) {
    for (n, &e) in noise.iter_mut().zip(nearend) {
        *n = if e < *n {
            e
        } else {
            (*n * NOISE_INCREASE_FACTOR).min(e)
        };
        *n = n.max(floor);
    }
}

/// Discounts residual echo close to the audibility floor.
fn weight_echo_for_audibility(
    echo: &[f32; NUM_REGIONS],
    thresholds: &[f32; NUM_REGIONS],
    floor_power: f32,
) -> [f32; NUM_REGIONS] {
    let mut weighted = *echo;
    for (w, &threshold) in weighted.iter_mut().zip(thresholds) {
        if threshold <= floor_power {
            continue;
        }
        let normalizer = 1.0 / (threshold - floor_power);
        if *w < threshold {
            let tmp = (threshold - *w) * normalizer;
            *w *= (1.0 - tmp * tmp).max(0.0);
        }
    }
    weighted
}

/// Gain that masks the residual echo behind the nearend and the noise.
fn gain_to_no_audible_echo(
    params: &GainParameters,
    nearend: &[f32; NUM_REGIONS],
    echo: &[f32; NUM_REGIONS],
    masker: &[f32; NUM_REGIONS],
) -> [f32; NUM_REGIONS] {
    let mut gain = [1.0; NUM_REGIONS];
    for region in 0..NUM_REGIONS {
        let enr = echo[region] / (nearend[region] + 1.0);
        let emr = echo[region] / (masker[region] + 1.0);
        if enr > params.enr_transparent[region] && emr > params.emr_transparent[region] {
            let g = (params.enr_suppress[region] - enr)
                / (params.enr_suppress[region] - params.enr_transparent[region]);
            gain[region] = g.max(params.emr_transparent[region] / emr);
        }
    }
    gain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energies(nearend: f32, echo: f32, residual_echo: f32) -> RegionEnergies {
        RegionEnergies {
            nearend: [nearend; NUM_REGIONS],
            echo: [echo; NUM_REGIONS],
            residual_echo: [residual_echo; NUM_REGIONS],
        }
    }

    const QUIET_RENDER: RenderEnergies = RenderEnergies {
        low_band: 0.0,
        high_bands: 0.0,
    };

    #[test]
    fn noise_floor_matches_dbfs() {
        let floor = noise_floor_energy(-96.03406);
        assert!((floor - 17.1).abs() < 0.1, "floor {floor}");
    }

    #[test]
    fn no_echo_gives_unit_gain() {
        let config = EchoCanceller3Config::default();
        let mut gain = SuppressionGain::new(&config, 1, 1);
        for _ in 0..10 {
            let g = gain.get_gain(&[energies(1.0e6, 0.0, 0.0)], QUIET_RENDER, false);
            assert_eq!(g.low_band, [1.0; NUM_REGIONS]);
            assert_eq!(g.high_bands, 1.0);
        }
    }

    #[test]
    fn dominant_echo_is_suppressed() {
        let config = EchoCanceller3Config::default();
        let mut gain = SuppressionGain::new(&config, 1, 1);
        let mut g = gain.get_gain(&[energies(1.0e4, 1.0e7, 1.0e7)], QUIET_RENDER, false);
        for _ in 0..20 {
            g = gain.get_gain(&[energies(1.0e4, 1.0e7, 1.0e7)], QUIET_RENDER, false);
        }
        for v in g.low_band {
            assert!(v < 0.05, "gain {v}");
        }
    }

    #[test]
    fn weighting_discounts_near_floor_echo() {
        let thresholds = [1280.0; NUM_REGIONS];
        let weighted = weight_echo_for_audibility(&[128.0, 700.0, 5000.0], &thresholds, 128.0);
        assert_eq!(weighted[0], 0.0);
        assert!(weighted[1] > 0.0 && weighted[1] < 700.0);
        assert_eq!(weighted[2], 5000.0);
    }

    #[test]
    fn mid_region_interpolates_masks() {
        let config = EchoCanceller3Config::default();
        let params = GainParameters::new(&config.suppressor.normal_tuning);
        assert_eq!(params.enr_transparent[0], 0.3);
        assert!((params.enr_transparent[1] - 0.185).abs() < 1e-6);
        assert_eq!(params.enr_transparent[2], 0.07);
        assert!((params.enr_suppress[1] - 0.25).abs() < 1e-6);
        assert_eq!(params.emr_transparent, [0.3; NUM_REGIONS]);
    }

    #[test]
    fn gain_recovers_at_max_inc_factor() {
        let config = EchoCanceller3Config::default();
        let mut gain = SuppressionGain::new(&config, 1, 1);
        for _ in 0..30 {
            gain.get_gain(&[energies(1.0e4, 1.0e7, 1.0e7)], QUIET_RENDER, false);
        }
        let before = gain.last_gain;
        gain.get_gain(&[energies(1.0e6, 0.0, 0.0)], QUIET_RENDER, false);
        for (after, before) in gain.last_gain.iter().zip(before) {
            let expected = (before * 2.0).max(config.suppressor.floor_first_increase);
            assert!((after - expected).abs() <= expected * 1e-5, "{after} vs {expected}");
        }
    }

    #[test]
    fn upper_bands_follow_echo_bound() {
        let mut config = EchoCanceller3Config::default();
        config.suppressor.high_bands_suppression.max_gain_during_echo = 0.1;
        let mut gain = SuppressionGain::new(&config, 2, 1);
        let g = gain.get_gain(&[energies(1.0e6, 1.0e5, 0.0)], QUIET_RENDER, false);
        assert_eq!(g.high_bands, 0.1);
    }

    #[test]
    fn anti_howling_bounds_upper_bands() {
        let mut config = EchoCanceller3Config::default();
        config.suppressor.high_bands_suppression.anti_howling_gain = 0.5;
        let mut gain = SuppressionGain::new(&config, 3, 1);
        let render = RenderEnergies {
            low_band: 1.0e6,
            high_bands: 4.0e6,
        };
        let g = gain.get_gain(&[energies(1.0e6, 0.0, 0.0)], render, false);
        assert!((g.high_bands - 0.25).abs() < 1e-6, "gain {}", g.high_bands);
    }

    #[test]
    fn saturation_mutes_upper_bands() {
        let config = EchoCanceller3Config::default();
        let mut gain = SuppressionGain::new(&config, 2, 1);
        let g = gain.get_gain(&[energies(1.0e6, 0.0, 0.0)], QUIET_RENDER, true);
        assert_eq!(g.high_bands, SATURATED_UPPER_BAND_GAIN);
    }

    #[test]
    fn strictest_channel_wins() {
        let config = EchoCanceller3Config::default();
        let mut gain = SuppressionGain::new(&config, 1, 2);
        let mut g = gain.get_gain(
            &[energies(1.0e6, 0.0, 0.0), energies(1.0e4, 1.0e7, 1.0e7)],
            QUIET_RENDER,
            false,
        );
        for _ in 0..20 {
            g = gain.get_gain(
                &[energies(1.0e6, 0.0, 0.0), energies(1.0e4, 1.0e7, 1.0e7)],
                QUIET_RENDER,
                false,
            );
        }
        assert!(g.low_band.iter().all(|&v| v < 0.05));
    }
}
