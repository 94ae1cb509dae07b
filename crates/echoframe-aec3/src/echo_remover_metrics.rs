//! Echo remover quality metrics: ERL and ERLE averaged over one second.

use crate::common::NUM_FRAMES_PER_SECOND;

/// Metric tracking the sum, floor and ceiling of values in the dB domain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DbMetric {
    pub(crate) sum_value: f32,
    pub(crate) floor_value: f32,
    pub(crate) ceil_value: f32,
}

impl Default for DbMetric {
    fn default() -> Self {
        Self {
            sum_value: 0.0,
            floor_value: 0.0,
            ceil_value: 0.0,
        }
    }
}

impl DbMetric {
    pub(crate) fn new(sum_value: f32, floor_value: f32, ceil_value: f32) -> Self {
        Self {
            sum_value,
            floor_value,
            ceil_value,
        }
    }

    /// Accumulates a value.
    pub(crate) fn update(&mut self, value: f32) {
        self.sum_value += value;
        self.floor_value = self.floor_value.min(value);
        self.ceil_value = self.ceil_value.max(value);
    }
}

fn energy_ratio_db(numerator: f32, denominator: f32) -> f32 {
    const OFFSET: f32 = 1e-10;
    10.0 * ((numerator + OFFSET) / (denominator + OFFSET)).log10()
}

/// Collects ERL and ERLE over frames with active render and reports their
/// average over the last completed second.
#[derive(Debug)]
pub(crate) struct EchoRemoverMetrics {
    frame_counter: usize,
    active_frames: usize,
    erl: DbMetric,
    erle: DbMetric,
    erl_average: f32,
    erle_average: f32,
    reported: bool,
}

impl EchoRemoverMetrics {
    pub(crate) fn new() -> Self {
        let mut s = Self {
            frame_counter: 0,
            active_frames: 0,
            erl: DbMetric::default(),
            erle: DbMetric::default(),
            erl_average: 0.0,
            erle_average: 0.0,
            reported: false,
        };
        s.reset_metrics();
        s
    }

    /// Updates the metrics with the energies of one frame.
    ///
    /// `render` is the aligned render energy, `echo_estimate` the linear echo
    /// estimate, `capture` the capture and `error` the linear filter output.
    pub(crate) fn update(
        &mut self,
        render_active: bool,
        render: f32,
        echo_estimate: f32,
        capture: f32,
        error: f32,
    ) {
        self.frame_counter += 1;
        if render_active {
            self.active_frames += 1;
            self.erl.update(energy_ratio_db(render, echo_estimate));
            self.erle.update(energy_ratio_db(capture, error));
            if !self.reported {
                // Running average until the first second completes.
                self.erl_average = self.erl.sum_value / self.active_frames as f32;
                self.erle_average = self.erle.sum_value / self.active_frames as f32;
            }
        }

        if self.frame_counter == NUM_FRAMES_PER_SECOND {
            if self.active_frames > 0 {
                self.erl_average = self.erl.sum_value / self.active_frames as f32;
                self.erle_average = self.erle.sum_value / self.active_frames as f32;
                tracing::trace!(
                    erl_db = self.erl_average,
                    erl_min_db = self.erl.floor_value,
                    erl_max_db = self.erl.ceil_value,
                    erle_db = self.erle_average,
                    erle_min_db = self.erle.floor_value,
                    erle_max_db = self.erle.ceil_value,
                    "echo remover metrics"
                );
            }
            self.reported = true;
            self.frame_counter = 0;
            self.reset_metrics();
        }
    }

    pub(crate) fn erl_db(&self) -> f32 {
        self.erl_average
    }

    pub(crate) fn erle_db(&self) -> f32 {
        self.erle_average
    }

    fn reset_metrics(&mut self) {
        self.active_frames = 0;
        self.erl = DbMetric::new(0.0, 10000.0, -10000.0);
        self.erle = DbMetric::new(0.0, 10000.0, -10000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_metric_default() {
        let metric = DbMetric::default();
        assert_eq!(metric.sum_value, 0.0);
        assert_eq!(metric.floor_value, 0.0);
        assert_eq!(metric.ceil_value, 0.0);
    }

    #[test]
    fn db_metric_update() {
        let mut metric = DbMetric::new(0.0, 20.0, -20.0);
        let min_value = -77.0f32;
        let max_value = 33.0f32;
        let mut value = min_value;
        let mut expected_sum = 0.0f32;
        while value <= max_value {
            metric.update(value);
            expected_sum += value;
            value += 1.0;
        }
        assert!((metric.sum_value - expected_sum).abs() < 1e-3);
        assert!((metric.ceil_value - max_value).abs() < 1e-4);
        assert!((metric.floor_value - min_value).abs() < 1e-4);
    }

    #[test]
    fn running_average_before_first_second() {
        let mut metrics = EchoRemoverMetrics::new();
        metrics.update(true, 100.0, 10.0, 100.0, 1.0);
        assert!((metrics.erl_db() - 10.0).abs() < 1e-3);
        assert!((metrics.erle_db() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn reports_average_over_last_second() {
        let mut metrics = EchoRemoverMetrics::new();
        for _ in 0..NUM_FRAMES_PER_SECOND {
            metrics.update(true, 100.0, 10.0, 100.0, 1.0);
        }
        // Later frames do not move the reported value until the next second
        // completes.
        for _ in 0..NUM_FRAMES_PER_SECOND / 2 {
            metrics.update(true, 100.0, 100.0, 100.0, 100.0);
        }
        assert!((metrics.erl_db() - 10.0).abs() < 1e-3);
        for _ in 0..NUM_FRAMES_PER_SECOND / 2 {
            metrics.update(true, 100.0, 100.0, 100.0, 100.0);
        }
        assert!(metrics.erl_db().abs() < 1e-3);
        assert!(metrics.erle_db().abs() < 1e-3);
    }

    #[test]
    fn inactive_render_keeps_previous_value() {
        let mut metrics = EchoRemoverMetrics::new();
        for _ in 0..NUM_FRAMES_PER_SECOND {
            metrics.update(true, 100.0, 10.0, 100.0, 1.0);
        }
        for _ in 0..NUM_FRAMES_PER_SECOND {
            metrics.update(false, 0.0, 0.0, 0.0, 0.0);
        }
        assert!((metrics.erl_db() - 10.0).abs() < 1e-3);
    }
}
