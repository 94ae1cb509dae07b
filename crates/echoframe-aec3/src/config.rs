//! Echo canceller configuration.
//!
//! Field names and baseline values follow the AEC3 configuration tree so that
//! tunings written against AEC3 carry over unchanged. Only the parameters the
//! engine actually consumes are present.

/// Configuration for [`EchoCanceller3`](crate::EchoCanceller3).
///
/// The defaults are the engine's baseline tuning. Use
/// [`validate()`](Self::validate) to clamp every parameter into its legal
/// range before handing the config to the factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoCanceller3Config {
    /// Linear adaptive filter settings.
    pub filter: Filter,
    /// Echo Return Loss Enhancement (ERLE) limits.
    pub erle: Erle,
    /// Echo audibility weighting.
    pub echo_audibility: EchoAudibility,
    /// Render activity thresholds.
    pub render_levels: RenderLevels,
    /// Noise floor assumed when estimating the masking noise.
    pub comfort_noise: ComfortNoise,
    /// Non-linear suppressor settings.
    pub suppressor: Suppressor,
}

impl EchoCanceller3Config {
    /// Clamps every parameter into its legal range.
    ///
    /// Non-finite values are replaced by the lower bound. Returns `true` if no
    /// parameter had to be changed.
    pub fn validate(&mut self) -> bool {
        let mut ok = true;

        let refined = &mut self.filter.refined;
        ok &= limit_usize(&mut refined.length_blocks, 1, 100);
        ok &= limit_f32(&mut refined.leakage_converged, 0.0, 1000.0);
        ok &= limit_f32(&mut refined.leakage_diverged, 0.0, 1000.0);
        ok &= limit_f32(&mut refined.error_floor, 0.0, 1000.0);
        ok &= limit_f32(&mut refined.error_ceil, 0.0, 100_000_000.0);
        ok &= limit_f32(&mut refined.noise_gate, 0.0, 100_000_000.0);
        if refined.error_floor > refined.error_ceil {
            refined.error_floor = refined.error_ceil;
            ok = false;
        }

        ok &= limit_f32(&mut self.erle.min, 1.0, 100_000.0);
        ok &= limit_f32(&mut self.erle.max_l, 1.0, 100_000.0);
        ok &= limit_f32(&mut self.erle.max_h, 1.0, 100_000.0);
        if self.erle.min > self.erle.max_l || self.erle.min > self.erle.max_h {
            self.erle.min = self.erle.max_l.min(self.erle.max_h);
            ok = false;
        }

        let max_power = 32768.0f32 * 32768.0;
        let audibility = &mut self.echo_audibility;
        ok &= limit_f32(&mut audibility.normal_render_limit, 0.0, max_power);
        ok &= limit_f32(&mut audibility.floor_power, 0.0, max_power);
        ok &= limit_f32(&mut audibility.audibility_threshold_lf, 0.0, max_power);
        ok &= limit_f32(&mut audibility.audibility_threshold_mf, 0.0, max_power);
        ok &= limit_f32(&mut audibility.audibility_threshold_hf, 0.0, max_power);

        ok &= limit_f32(&mut self.render_levels.active_render_limit, 0.0, max_power);
        ok &= limit_f32(&mut self.comfort_noise.noise_floor_dbfs, -200.0, 0.0);

        let suppressor = &mut self.suppressor;
        for tuning in [&mut suppressor.normal_tuning, &mut suppressor.nearend_tuning] {
            for mask in [&mut tuning.mask_lf, &mut tuning.mask_hf] {
                ok &= limit_f32(&mut mask.enr_transparent, 0.0, 100.0);
                ok &= limit_f32(&mut mask.enr_suppress, 0.0, 100.0);
                ok &= limit_f32(&mut mask.emr_transparent, 0.0, 100.0);
            }
            ok &= limit_f32(&mut tuning.max_inc_factor, 0.0, 100.0);
            ok &= limit_f32(&mut tuning.max_dec_factor_lf, 0.0, 100.0);
        }

        let nearend = &mut suppressor.dominant_nearend_detection;
        ok &= limit_f32(&mut nearend.enr_threshold, 0.0, 1_000_000.0);
        ok &= limit_f32(&mut nearend.enr_exit_threshold, 0.0, 1_000_000.0);
        ok &= limit_f32(&mut nearend.snr_threshold, 0.0, 1_000_000.0);
        ok &= limit_i32(&mut nearend.hold_duration, 0, 10_000);
        ok &= limit_i32(&mut nearend.trigger_threshold, 0, 10_000);

        let high_bands = &mut suppressor.high_bands_suppression;
        ok &= limit_f32(&mut high_bands.enr_threshold, 0.0, 100.0);
        ok &= limit_f32(&mut high_bands.max_gain_during_echo, 0.0, 1.0);
        ok &= limit_f32(
            &mut high_bands.anti_howling_activation_threshold,
            0.0,
            max_power,
        );
        ok &= limit_f32(&mut high_bands.anti_howling_gain, 0.0, 1.0);

        ok &= limit_f32(&mut suppressor.floor_first_increase, 0.0, 1_000_000.0);

        ok
    }
}

fn limit_f32(value: &mut f32, min: f32, max: f32) -> bool {
    let clamped = value.clamp(min, max);
    let clamped = if clamped.is_finite() { clamped } else { min };
    let unchanged = *value == clamped;
    *value = clamped;
    unchanged
}

fn limit_usize(value: &mut usize, min: usize, max: usize) -> bool {
    let clamped = (*value).clamp(min, max);
    let unchanged = *value == clamped;
    *value = clamped;
    unchanged
}

fn limit_i32(value: &mut i32, min: i32, max: i32) -> bool {
    let clamped = (*value).clamp(min, max);
    let unchanged = *value == clamped;
    *value = clamped;
    unchanged
}

/// Configuration for the refined (main) adaptive filter.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedConfiguration {
    /// Filter length in blocks of [`BLOCK_SIZE`](crate::common::BLOCK_SIZE) taps (default: 13).
    pub length_blocks: usize,
    /// Misadjustment leakage while the filter is converged (default: 0.00005).
    pub leakage_converged: f32,
    /// Misadjustment leakage while the filter is diverged (default: 0.05).
    pub leakage_diverged: f32,
    /// Lower bound of the misadjustment estimate (default: 0.001).
    pub error_floor: f32,
    /// Upper bound of the misadjustment estimate (default: 2.0).
    pub error_ceil: f32,
    /// Render block energy below which adaptation is gated (default: 20075344.0).
    pub noise_gate: f32,
}

/// Linear adaptive filter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Refined (main) adaptive filter configuration.
    pub refined: RefinedConfiguration,
    /// Whether the linear filter output is exported alongside the capture.
    pub export_linear_aec_output: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            refined: RefinedConfiguration {
                length_blocks: 13,
                leakage_converged: 0.00005,
                leakage_diverged: 0.05,
                error_floor: 0.001,
                error_ceil: 2.0,
                noise_gate: 20_075_344.0,
            },
            export_linear_aec_output: false,
        }
    }
}

/// ERLE limits, linear scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Erle {
    /// Minimum ERLE (default: 1.0).
    pub min: f32,
    /// Maximum ERLE in the low and mid regions (default: 4.0).
    pub max_l: f32,
    /// Maximum ERLE in the high region (default: 1.5).
    pub max_h: f32,
}

impl Default for Erle {
    fn default() -> Self {
        Self {
            min: 1.0,
            max_l: 4.0,
            max_h: 1.5,
        }
    }
}

/// Echo audibility weighting.
///
/// Residual echo below `floor_power * audibility_threshold_*` is progressively
/// discounted as inaudible.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoAudibility {
    /// Residual echo energy that needs no suppression (default: 64.0).
    pub normal_render_limit: f32,
    /// Base energy of the audibility thresholds (default: 128.0).
    pub floor_power: f32,
    /// Audibility threshold multiplier, low region (default: 10.0).
    pub audibility_threshold_lf: f32,
    /// Audibility threshold multiplier, mid region (default: 10.0).
    pub audibility_threshold_mf: f32,
    /// Audibility threshold multiplier, high region (default: 10.0).
    pub audibility_threshold_hf: f32,
}

impl Default for EchoAudibility {
    fn default() -> Self {
        Self {
            normal_render_limit: 64.0,
            floor_power: 2.0 * 64.0,
            audibility_threshold_lf: 10.0,
            audibility_threshold_mf: 10.0,
            audibility_threshold_hf: 10.0,
        }
    }
}

/// Render activity thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLevels {
    /// RMS level above which the render counts as active (default: 100.0).
    pub active_render_limit: f32,
}

impl Default for RenderLevels {
    fn default() -> Self {
        Self {
            active_render_limit: 100.0,
        }
    }
}

/// Noise floor used as the lower bound of the masking noise estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct ComfortNoise {
    /// Noise floor in dBFS (default: -96.03406).
    pub noise_floor_dbfs: f32,
}

impl Default for ComfortNoise {
    fn default() -> Self {
        Self {
            noise_floor_dbfs: -96.03406,
        }
    }
}

/// Suppression masking thresholds on the echo-to-nearend (ENR) and
/// echo-to-masker (EMR) ratios.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskingThresholds {
    /// ENR below which the region is left untouched.
    pub enr_transparent: f32,
    /// ENR at which the region is fully suppressed.
    pub enr_suppress: f32,
    /// EMR below which the region is left untouched.
    pub emr_transparent: f32,
}

/// Suppressor tuning with low/high masking thresholds and gain slew limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    /// Masking thresholds for the low region.
    pub mask_lf: MaskingThresholds,
    /// Masking thresholds for the high region.
    pub mask_hf: MaskingThresholds,
    /// Maximum gain increase factor per frame (default: 2.0).
    pub max_inc_factor: f32,
    /// Maximum gain decrease factor for the low region per frame (default: 0.25).
    pub max_dec_factor_lf: f32,
}

/// Dominant nearend detection. Counters are in frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DominantNearendDetection {
    /// Echo must stay below this fraction of the nearend to trigger (default: 0.25).
    pub enr_threshold: f32,
    /// Echo above this multiple of the nearend exits the state (default: 10.0).
    pub enr_exit_threshold: f32,
    /// Required nearend-to-noise ratio (default: 30.0).
    pub snr_threshold: f32,
    /// Frames the nearend state is held (default: 50).
    pub hold_duration: i32,
    /// Consecutive frames needed to enter the state (default: 12).
    pub trigger_threshold: i32,
}

impl Default for DominantNearendDetection {
    fn default() -> Self {
        Self {
            enr_threshold: 0.25,
            enr_exit_threshold: 10.0,
            snr_threshold: 30.0,
            hold_duration: 50,
            trigger_threshold: 12,
        }
    }
}

/// Upper band suppression and anti-howling.
#[derive(Debug, Clone, PartialEq)]
pub struct HighBandsSuppression {
    /// Echo-to-noise ratio above which the upper bands are bounded (default: 1.0).
    pub enr_threshold: f32,
    /// Upper band gain bound during echo (default: 1.0).
    pub max_gain_during_echo: f32,
    /// Render energy per sample activating anti-howling (default: 400.0).
    pub anti_howling_activation_threshold: f32,
    /// Gain applied when anti-howling is active (default: 1.0).
    pub anti_howling_gain: f32,
}

impl Default for HighBandsSuppression {
    fn default() -> Self {
        Self {
            enr_threshold: 1.0,
            max_gain_during_echo: 1.0,
            anti_howling_activation_threshold: 400.0,
            anti_howling_gain: 1.0,
        }
    }
}

/// Non-linear suppressor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Suppressor {
    /// Tuning used outside the dominant nearend state.
    pub normal_tuning: Tuning,
    /// Tuning used while nearend speech dominates.
    pub nearend_tuning: Tuning,
    /// Dominant nearend detection.
    pub dominant_nearend_detection: DominantNearendDetection,
    /// Upper band suppression and anti-howling.
    pub high_bands_suppression: HighBandsSuppression,
    /// Lowest gain a region may recover to in one step (default: 0.00001).
    pub floor_first_increase: f32,
}

impl Default for Suppressor {
    fn default() -> Self {
        Self {
            normal_tuning: Tuning {
                mask_lf: MaskingThresholds {
                    enr_transparent: 0.3,
                    enr_suppress: 0.4,
                    emr_transparent: 0.3,
                },
                mask_hf: MaskingThresholds {
                    enr_transparent: 0.07,
                    enr_suppress: 0.1,
                    emr_transparent: 0.3,
                },
                max_inc_factor: 2.0,
                max_dec_factor_lf: 0.25,
            },
            nearend_tuning: Tuning {
                mask_lf: MaskingThresholds {
                    enr_transparent: 1.09,
                    enr_suppress: 1.1,
                    emr_transparent: 0.3,
                },
                mask_hf: MaskingThresholds {
                    enr_transparent: 0.1,
                    enr_suppress: 0.3,
                    emr_transparent: 0.3,
                },
                max_inc_factor: 2.0,
                max_dec_factor_lf: 0.25,
            },
            dominant_nearend_detection: DominantNearendDetection::default(),
            high_bands_suppression: HighBandsSuppression::default(),
            floor_first_increase: 0.00001,
        }
    }
}
