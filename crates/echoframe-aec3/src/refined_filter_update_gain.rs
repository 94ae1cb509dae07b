//! Step size control for the refined adaptive filter.
//!
//! Tracks `h_error`, an estimate of the filter misadjustment relative to the
//! render power. The normalized step for a sub-block is
//!
//! ```text
//! s = h_error * px / (h_error * px + length_blocks * e2)
//! ```
//!
//! where `px` is the render energy in the filter window and `e2` the error
//! energy of the previous sub-block, both normalized to blocks of
//! [`BLOCK_SIZE`](crate::common::BLOCK_SIZE) samples.

use crate::config::RefinedConfiguration;

const H_ERROR_INITIAL: f32 = 10_000.0;

#[derive(Debug, Clone)]
pub(crate) struct RefinedFilterUpdateGain {
    leakage_converged: f32,
    leakage_diverged: f32,
    error_floor: f32,
    error_ceil: f32,
    length_blocks: f32,
    h_error: f32,
    e2_previous: f32,
}

impl RefinedFilterUpdateGain {
    pub(crate) fn new(config: &RefinedConfiguration) -> Self {
        Self {
            leakage_converged: config.leakage_converged,
            leakage_diverged: config.leakage_diverged,
            error_floor: config.error_floor,
            error_ceil: config.error_ceil,
            length_blocks: config.length_blocks as f32,
            h_error: H_ERROR_INITIAL,
            e2_previous: 0.0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.h_error = H_ERROR_INITIAL;
        self.e2_previous = 0.0;
    }

    /// Normalized step in `[0, 1]` for a sub-block with render energy `px`.
    pub(crate) fn step(&self, px: f32) -> f32 {
        if px <= 0.0 {
            return 0.0;
        }
        let num = self.h_error * px;
        let den = num + self.length_blocks * self.e2_previous;
        if den > 0.0 { num / den } else { 0.0 }
    }

    /// Updates the misadjustment estimate after a sub-block.
    ///
    /// `step` is the normalized step that was applied (zero when adaptation
    /// was gated), `erl` the energy of the filter taps and `e2`/`y2` the error
    /// and capture energies of the sub-block.
    pub(crate) fn update(&mut self, step: f32, erl: f32, e2: f32, y2: f32) {
        let leakage = if e2 > y2 {
            self.leakage_diverged
        } else {
            self.leakage_converged
        };
        self.h_error *= 1.0 - 0.5 * step;
        self.h_error += leakage * erl;
        self.h_error = self.h_error.clamp(self.error_floor, self.error_ceil);
        self.e2_previous = e2;
    }

    #[cfg(test)]
    pub(crate) fn h_error(&self) -> f32 {
        self.h_error
    }
}
