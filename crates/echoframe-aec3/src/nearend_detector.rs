//! Detection of frames where nearend speech dominates the echo.
//!
//! A channel enters the nearend state after `trigger_threshold` consecutive
//! frames in which the residual echo is well below the nearend and the nearend
//! is well above the noise. The state is held for `hold_duration` frames and
//! left early on strong echo.

use crate::config::DominantNearendDetection;

#[derive(Debug)]
pub(crate) struct DominantNearendDetector {
    enr_threshold: f32,
    enr_exit_threshold: f32,
    snr_threshold: f32,
    hold_duration: i32,
    trigger_threshold: i32,
    nearend_state: bool,
    trigger_counters: Vec<i32>,
    hold_counters: Vec<i32>,
}

impl DominantNearendDetector {
    pub(crate) fn new(config: &DominantNearendDetection, num_capture_channels: usize) -> Self {
        Self {
            enr_threshold: config.enr_threshold,
            enr_exit_threshold: config.enr_exit_threshold,
            snr_threshold: config.snr_threshold,
            hold_duration: config.hold_duration,
            trigger_threshold: config.trigger_threshold,
            nearend_state: false,
            trigger_counters: vec![0; num_capture_channels],
            hold_counters: vec![0; num_capture_channels],
        }
    }

    /// Returns whether the current state is the nearend state.
    pub(crate) fn is_nearend_state(&self) -> bool {
        self.nearend_state
    }

    /// Updates the state from the low-frequency energies of each channel.
    pub(crate) fn update(&mut self, nearend: &[f32], residual_echo: &[f32], noise: &[f32]) {
        self.nearend_state = false;
        for (ch, ((&ne, &echo), &noise)) in nearend.iter().zip(residual_echo).zip(noise).enumerate()
        {
            if echo < self.enr_threshold * ne && ne > self.snr_threshold * noise {
                self.trigger_counters[ch] += 1;
                if self.trigger_counters[ch] >= self.trigger_threshold {
                    self.hold_counters[ch] = self.hold_duration;
                    self.trigger_counters[ch] = 0;
                }
            } else {
                self.trigger_counters[ch] = (self.trigger_counters[ch] - 1).max(0);
            }

            if echo > self.enr_exit_threshold * ne && echo > self.snr_threshold * noise {
                self.hold_counters[ch] = 0;
            }

            self.hold_counters[ch] = (self.hold_counters[ch] - 1).max(0);
            self.nearend_state = self.nearend_state || self.hold_counters[ch] > 0;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.nearend_state = false;
        self.trigger_counters.fill(0);
        self.hold_counters.fill(0);
    }
}
