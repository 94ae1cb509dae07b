//! Per-region echo return loss enhancement (ERLE) estimate.
//!
//! The ERLE of the linear stage is the ratio of capture to error energy while
//! the render is active and echo is present. Instantaneous ratios are clamped
//! to `[erle.min, erle.max_l]` in the low and mid regions and to
//! `[erle.min, erle.max_h]` in the high region before smoothing.

use crate::common::NUM_REGIONS;
use crate::config::Erle;

const SMOOTHING: f32 = 0.1;

#[derive(Debug)]
pub(crate) struct ErleEstimator {
    min_erle: f32,
    max_erle: [f32; NUM_REGIONS],
    erle: Vec<[f32; NUM_REGIONS]>,
}

impl ErleEstimator {
    pub(crate) fn new(config: &Erle, num_capture_channels: usize) -> Self {
        Self {
            min_erle: config.min,
            max_erle: [config.max_l, config.max_l, config.max_h],
            erle: vec![[config.min; NUM_REGIONS]; num_capture_channels],
        }
    }

    pub(crate) fn reset(&mut self) {
        for erle in &mut self.erle {
            erle.fill(self.min_erle);
        }
    }

    /// Updates the estimate of one capture channel.
    ///
    /// `active` selects the regions in which echo is present during active
    /// render; only those are updated.
    pub(crate) fn update(
        &mut self,
        ch: usize,
        y2: &[f32; NUM_REGIONS],
        e2: &[f32; NUM_REGIONS],
        active: &[bool; NUM_REGIONS],
    ) {
        let erle = &mut self.erle[ch];
        for region in 0..NUM_REGIONS {
            if !active[region] {
                continue;
            }
            let max = self.max_erle[region];
            let instantaneous = if e2[region] > 0.0 {
                (y2[region] / e2[region]).clamp(self.min_erle, max)
            } else {
                max
            };
            erle[region] += SMOOTHING * (instantaneous - erle[region]);
            erle[region] = erle[region].clamp(self.min_erle, max);
        }
    }

    pub(crate) fn erle(&self, ch: usize) -> &[f32; NUM_REGIONS] {
        &self.erle[ch]
    }
}
