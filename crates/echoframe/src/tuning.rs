//! Suppression-level to echo canceller tuning.
//!
//! A session's suppression level is mapped once, at creation, onto one of a
//! fixed ladder of [`SuppressionTier`]s. Each tier carries a
//! [`TuningProfile`] of overrides on top of the engine's baseline
//! [`EchoCanceller3Config`].

use echoframe_aec3::EchoCanceller3Config;
use echoframe_aec3::config::MaskingThresholds;

use crate::config::SessionConfig;

/// Named suppression tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    /// Engine baseline, no overrides.
    Default,
    Medium,
    Aggressive,
}

/// Transparent/suppress echo-to-nearend ratio pair for one frequency range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskOverride {
    pub enr_transparent: f32,
    pub enr_suppress: f32,
}

impl MaskOverride {
    fn apply(&self, mask: &mut MaskingThresholds) {
        mask.enr_transparent = self.enr_transparent;
        mask.enr_suppress = self.enr_suppress;
    }
}

/// Overrides applied to the baseline echo canceller config. `None` keeps the
/// baseline value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningProfile {
    /// `suppressor.normal_tuning.mask_lf`
    pub mask_lf: Option<MaskOverride>,
    /// `suppressor.normal_tuning.mask_hf`
    pub mask_hf: Option<MaskOverride>,
    /// `erle.max_l`
    pub erle_max_l: Option<f32>,
    /// `erle.max_h`
    pub erle_max_h: Option<f32>,
    /// `filter.refined.leakage_converged`
    pub leakage_converged: Option<f32>,
    /// `filter.refined.error_floor`
    pub error_floor: Option<f32>,
    /// `suppressor.high_bands_suppression.max_gain_during_echo`
    pub max_gain_during_echo: Option<f32>,
    /// `suppressor.high_bands_suppression.anti_howling_gain`
    pub anti_howling_gain: Option<f32>,
    /// `echo_audibility.audibility_threshold_{lf,mf,hf}`, all three regions.
    pub audibility_threshold: Option<f32>,
}

impl TuningProfile {
    /// A profile that changes nothing.
    pub const BASELINE: Self = Self {
        mask_lf: None,
        mask_hf: None,
        erle_max_l: None,
        erle_max_h: None,
        leakage_converged: None,
        error_floor: None,
        max_gain_during_echo: None,
        anti_howling_gain: None,
        audibility_threshold: None,
    };

    /// Writes every override into `config`.
    pub fn apply(&self, config: &mut EchoCanceller3Config) {
        let tuning = &mut config.suppressor.normal_tuning;
        if let Some(mask) = &self.mask_lf {
            mask.apply(&mut tuning.mask_lf);
        }
        if let Some(mask) = &self.mask_hf {
            mask.apply(&mut tuning.mask_hf);
        }

        if let Some(v) = self.erle_max_l {
            config.erle.max_l = v;
        }
        if let Some(v) = self.erle_max_h {
            config.erle.max_h = v;
        }

        let refined = &mut config.filter.refined;
        if let Some(v) = self.leakage_converged {
            refined.leakage_converged = v;
        }
        if let Some(v) = self.error_floor {
            refined.error_floor = v;
        }

        let high_bands = &mut config.suppressor.high_bands_suppression;
        if let Some(v) = self.max_gain_during_echo {
            high_bands.max_gain_during_echo = v;
        }
        if let Some(v) = self.anti_howling_gain {
            high_bands.anti_howling_gain = v;
        }

        if let Some(v) = self.audibility_threshold {
            let audibility = &mut config.echo_audibility;
            audibility.audibility_threshold_lf = v;
            audibility.audibility_threshold_mf = v;
            audibility.audibility_threshold_hf = v;
        }
    }
}

/// One rung of the tier ladder. A normalized level at or above
/// `lower_bound` selects the tier unless a higher rung matched first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuppressionTier {
    pub lower_bound: f32,
    pub kind: TierKind,
    pub profile: TuningProfile,
}

const AGGRESSIVE: TuningProfile = TuningProfile {
    mask_lf: Some(MaskOverride {
        enr_transparent: 0.1,
        enr_suppress: 0.2,
    }),
    mask_hf: Some(MaskOverride {
        enr_transparent: 0.05,
        enr_suppress: 0.08,
    }),
    erle_max_l: Some(8.0),
    erle_max_h: Some(4.0),
    leakage_converged: Some(0.00001),
    error_floor: Some(0.0005),
    max_gain_during_echo: Some(0.1),
    anti_howling_gain: Some(0.005),
    audibility_threshold: Some(5.0),
};

const MEDIUM: TuningProfile = TuningProfile {
    mask_lf: Some(MaskOverride {
        enr_transparent: 0.2,
        enr_suppress: 0.3,
    }),
    mask_hf: Some(MaskOverride {
        enr_transparent: 0.06,
        enr_suppress: 0.09,
    }),
    erle_max_l: Some(6.0),
    erle_max_h: Some(3.0),
    max_gain_during_echo: Some(0.3),
    ..TuningProfile::BASELINE
};

/// The tier ladder, highest bound first. The last rung has bound 0 so every
/// normalized level matches some rung.
pub const SUPPRESSION_TIERS: [SuppressionTier; 3] = [
    SuppressionTier {
        lower_bound: 0.8,
        kind: TierKind::Aggressive,
        profile: AGGRESSIVE,
    },
    SuppressionTier {
        lower_bound: 0.5,
        kind: TierKind::Medium,
        profile: MEDIUM,
    },
    SuppressionTier {
        lower_bound: 0.0,
        kind: TierKind::Default,
        profile: TuningProfile::BASELINE,
    },
];

/// Maps a raw suppression level into `[0, 1]`.
///
/// Zero, negative and NaN levels mean maximum suppression.
pub fn normalize_suppression_level(level: f32) -> f32 {
    // NaN fails the comparison and takes the same path as zero.
    if level > 0.0 { level.min(1.0) } else { 1.0 }
}

/// Selects the tier for a raw suppression level.
pub fn select_tier(level: f32) -> &'static SuppressionTier {
    let level = normalize_suppression_level(level);
    SUPPRESSION_TIERS
        .iter()
        .find(|tier| level >= tier.lower_bound)
        .unwrap_or(&SUPPRESSION_TIERS[SUPPRESSION_TIERS.len() - 1])
}

/// Builds the echo canceller config for a session along with the tier it
/// was derived from.
pub fn echo_canceller_config(
    config: &SessionConfig,
) -> (EchoCanceller3Config, &'static SuppressionTier) {
    let tier = select_tier(config.suppression_level);
    let mut aec_config = EchoCanceller3Config::default();
    tier.profile.apply(&mut aec_config);
    aec_config.filter.export_linear_aec_output = config.export_linear;
    (aec_config, tier)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    fn session(level: f32) -> SessionConfig {
        SessionConfig {
            suppression_level: level,
            ..Default::default()
        }
    }

    fn aggressive_config() -> EchoCanceller3Config {
        let mut c = EchoCanceller3Config::default();
        let normal = &mut c.suppressor.normal_tuning;
        normal.mask_lf.enr_transparent = 0.1;
        normal.mask_lf.enr_suppress = 0.2;
        normal.mask_hf.enr_transparent = 0.05;
        normal.mask_hf.enr_suppress = 0.08;
        c.erle.max_l = 8.0;
        c.erle.max_h = 4.0;
        c.filter.refined.leakage_converged = 0.00001;
        c.filter.refined.error_floor = 0.0005;
        c.suppressor.high_bands_suppression.max_gain_during_echo = 0.1;
        c.suppressor.high_bands_suppression.anti_howling_gain = 0.005;
        c.echo_audibility.audibility_threshold_lf = 5.0;
        c.echo_audibility.audibility_threshold_mf = 5.0;
        c.echo_audibility.audibility_threshold_hf = 5.0;
        c
    }

    fn medium_config() -> EchoCanceller3Config {
        let mut c = EchoCanceller3Config::default();
        let normal = &mut c.suppressor.normal_tuning;
        normal.mask_lf.enr_transparent = 0.2;
        normal.mask_lf.enr_suppress = 0.3;
        normal.mask_hf.enr_transparent = 0.06;
        normal.mask_hf.enr_suppress = 0.09;
        c.erle.max_l = 6.0;
        c.erle.max_h = 3.0;
        c.suppressor.high_bands_suppression.max_gain_during_echo = 0.3;
        c
    }

    #[test]
    fn ladder_is_sorted_and_ends_at_zero() {
        for pair in SUPPRESSION_TIERS.windows(2) {
            assert!(pair[0].lower_bound > pair[1].lower_bound);
        }
        assert_eq!(SUPPRESSION_TIERS[2].lower_bound, 0.0);
    }

    #[test]
    fn normalization_edges() {
        assert_eq!(normalize_suppression_level(0.0), 1.0);
        assert_eq!(normalize_suppression_level(-0.0), 1.0);
        assert_eq!(normalize_suppression_level(f32::NAN), 1.0);
        assert_eq!(normalize_suppression_level(f32::NEG_INFINITY), 1.0);
        assert_eq!(normalize_suppression_level(f32::INFINITY), 1.0);
        assert_eq!(normalize_suppression_level(0.3), 0.3);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(select_tier(0.8).kind, TierKind::Aggressive);
        assert_eq!(select_tier(0.799_999).kind, TierKind::Medium);
        assert_eq!(select_tier(0.5).kind, TierKind::Medium);
        assert_eq!(select_tier(0.499_999).kind, TierKind::Default);
        assert_eq!(select_tier(f32::MIN_POSITIVE).kind, TierKind::Default);
    }

    #[test]
    fn export_linear_is_set_independently_of_tier() {
        for level in [0.1, 0.6, 0.9] {
            let (config, _) = echo_canceller_config(&SessionConfig {
                export_linear: true,
                ..session(level)
            });
            assert!(config.filter.export_linear_aec_output);
            let (config, _) = echo_canceller_config(&session(level));
            assert!(!config.filter.export_linear_aec_output);
        }
    }

    #[test]
    fn aggressive_leaves_untouched_fields_at_baseline() {
        let (config, _) = echo_canceller_config(&session(1.0));
        let baseline = EchoCanceller3Config::default();
        assert_eq!(config.suppressor.nearend_tuning, baseline.suppressor.nearend_tuning);
        assert_eq!(
            config.suppressor.normal_tuning.mask_lf.emr_transparent,
            baseline.suppressor.normal_tuning.mask_lf.emr_transparent
        );
        assert_eq!(config.erle.min, baseline.erle.min);
    }

    #[proptest]
    fn low_levels_keep_the_baseline(#[strategy(f32::MIN_POSITIVE..0.5f32)] level: f32) {
        let (config, tier) = echo_canceller_config(&session(level));
        prop_assert_eq!(tier.kind, TierKind::Default);
        prop_assert_eq!(config, EchoCanceller3Config::default());
    }

    #[proptest]
    fn medium_levels_apply_medium_constants(#[strategy(0.5f32..0.8)] level: f32) {
        let (config, tier) = echo_canceller_config(&session(level));
        prop_assert_eq!(tier.kind, TierKind::Medium);
        prop_assert_eq!(config, medium_config());
    }

    #[proptest]
    fn high_levels_apply_aggressive_constants(#[strategy(0.8f32..1.0e9)] level: f32) {
        let (config, tier) = echo_canceller_config(&session(level));
        prop_assert_eq!(tier.kind, TierKind::Aggressive);
        prop_assert_eq!(config, aggressive_config());
    }

    #[proptest]
    fn non_positive_levels_match_maximum(#[strategy(-1.0e9f32..=0.0)] level: f32) {
        prop_assert_eq!(select_tier(level), select_tier(1.0));
        prop_assert_eq!(
            echo_canceller_config(&session(level)).0,
            echo_canceller_config(&session(1.0)).0
        );
    }

    #[proptest]
    fn normalized_level_is_in_unit_range(level: f32) {
        let normalized = normalize_suppression_level(level);
        prop_assert!(normalized > 0.0 && normalized <= 1.0);
    }
}
