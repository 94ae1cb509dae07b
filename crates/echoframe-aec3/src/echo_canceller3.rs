//! The echo canceller engine and its factory.
//!
//! Per capture frame the engine runs one NLMS filter per capture channel on
//! the lowest band. Each filter models the echo paths from every render
//! channel to its capture channel. Capture, error and echo estimate are then
//! split into three frequency regions and region gains from the suppressor
//! are applied to the error. The upper bands are scaled by a single gain.

use derive_more::Debug;
use echoframe_common_audio::channel_buffer::ChannelBuffer;

use crate::adaptive_fir_filter::AdaptiveFirFilter;
use crate::common::{
    BLOCK_SIZE, NUM_REGIONS, SATURATION_THRESHOLD, SUB_BLOCK_SIZE, band_frame_length,
    band_rate_hz, block_energy, num_bands_for_rate, valid_full_band_rate,
};
use crate::config::EchoCanceller3Config;
use crate::echo_control::{EchoControl, Metrics};
use crate::echo_remover_metrics::EchoRemoverMetrics;
use crate::erle_estimator::ErleEstimator;
use crate::frequency_regions::{RegionSplitter, region_buffers};
use crate::refined_filter_update_gain::RefinedFilterUpdateGain;
use crate::render_buffer::RenderBuffer;
use crate::suppression_gain::{RegionEnergies, RenderEnergies, SuppressionGain};

/// Creates [`EchoCanceller3`] instances sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct EchoCanceller3Factory {
    config: EchoCanceller3Config,
}

impl EchoCanceller3Factory {
    pub fn new(config: EchoCanceller3Config) -> Self {
        Self { config }
    }

    /// Creates an echo canceller for the given full-band rate and channel
    /// counts.
    ///
    /// # Panics
    ///
    /// Panics if the rate is not 8, 16, 32 or 48 kHz or a channel count is
    /// zero.
    pub fn create(
        &self,
        sample_rate_hz: u32,
        num_render_channels: usize,
        num_capture_channels: usize,
    ) -> Box<dyn EchoControl> {
        Box::new(EchoCanceller3::new(
            self.config.clone(),
            sample_rate_hz,
            num_render_channels,
            num_capture_channels,
        ))
    }
}

/// Echo canceller operating on band-split 10 ms frames.
#[derive(Debug)]
pub struct EchoCanceller3 {
    num_bands: usize,
    frame_length: usize,
    num_render_channels: usize,
    noise_gate: f32,
    active_render_limit: f32,
    echo_presence_floor: f32,
    render_buffer: RenderBuffer,
    filters: Vec<AdaptiveFirFilter>,
    filter_gains: Vec<RefinedFilterUpdateGain>,
    capture_splitters: Vec<RegionSplitter>,
    error_splitters: Vec<RegionSplitter>,
    estimate_splitters: Vec<RegionSplitter>,
    erle: ErleEstimator,
    suppression_gain: SuppressionGain,
    metrics: EchoRemoverMetrics,
    saturated_capture: bool,
    render_active: bool,
    #[debug(skip)]
    capture: Vec<f32>,
    #[debug(skip)]
    error: Vec<f32>,
    #[debug(skip)]
    estimate: Vec<f32>,
    #[debug(skip)]
    capture_regions: [Vec<f32>; NUM_REGIONS],
    #[debug(skip)]
    estimate_regions: [Vec<f32>; NUM_REGIONS],
    #[debug(skip)]
    error_regions: Vec<[Vec<f32>; NUM_REGIONS]>,
    #[debug(skip)]
    region_energies: Vec<RegionEnergies>,
}

impl EchoCanceller3 {
    /// Creates an echo canceller. Out-of-range parameters in `config` are
    /// clamped.
    ///
    /// # Panics
    ///
    /// Panics if the rate is not 8, 16, 32 or 48 kHz or a channel count is
    /// zero.
    pub fn new(
        mut config: EchoCanceller3Config,
        sample_rate_hz: u32,
        num_render_channels: usize,
        num_capture_channels: usize,
    ) -> Self {
        assert!(
            valid_full_band_rate(sample_rate_hz),
            "unsupported sample rate: {sample_rate_hz}"
        );
        assert!(num_render_channels > 0, "num_render_channels must be > 0");
        assert!(num_capture_channels > 0, "num_capture_channels must be > 0");

        if !config.validate() {
            tracing::warn!("echo canceller config had out-of-range parameters, clamped");
        }

        let band_rate = band_rate_hz(sample_rate_hz);
        let frame_length = band_frame_length(sample_rate_hz);
        let num_bands = num_bands_for_rate(sample_rate_hz);
        let filter_length = config.filter.refined.length_blocks * BLOCK_SIZE;

        tracing::debug!(
            sample_rate_hz,
            num_render_channels,
            num_capture_channels,
            filter_length,
            export_linear = config.filter.export_linear_aec_output,
            "creating echo canceller"
        );

        Self {
            num_bands,
            frame_length,
            num_render_channels,
            noise_gate: config.filter.refined.noise_gate,
            active_render_limit: config.render_levels.active_render_limit,
            echo_presence_floor: config.echo_audibility.floor_power,
            render_buffer: RenderBuffer::new(
                band_rate,
                frame_length,
                filter_length,
                num_render_channels,
            ),
            filters: vec![
                AdaptiveFirFilter::new(filter_length, num_render_channels);
                num_capture_channels
            ],
            filter_gains: vec![
                RefinedFilterUpdateGain::new(&config.filter.refined);
                num_capture_channels
            ],
            capture_splitters: vec![RegionSplitter::new(band_rate); num_capture_channels],
            error_splitters: vec![RegionSplitter::new(band_rate); num_capture_channels],
            estimate_splitters: vec![RegionSplitter::new(band_rate); num_capture_channels],
            erle: ErleEstimator::new(&config.erle, num_capture_channels),
            suppression_gain: SuppressionGain::new(&config, num_bands, num_capture_channels),
            metrics: EchoRemoverMetrics::new(),
            saturated_capture: false,
            render_active: false,
            capture: vec![0.0; frame_length],
            error: vec![0.0; frame_length],
            estimate: vec![0.0; frame_length],
            capture_regions: region_buffers(frame_length),
            estimate_regions: region_buffers(frame_length),
            error_regions: (0..num_capture_channels)
                .map(|_| region_buffers(frame_length))
                .collect(),
            region_energies: vec![RegionEnergies::default(); num_capture_channels],
        }
    }

    fn num_capture_channels(&self) -> usize {
        self.filters.len()
    }

    fn reset_for_level_change(&mut self) {
        self.erle.reset();
        for splitter in self
            .capture_splitters
            .iter_mut()
            .chain(&mut self.error_splitters)
            .chain(&mut self.estimate_splitters)
        {
            splitter.reset();
        }
        for gain in &mut self.filter_gains {
            gain.reset();
        }
        self.suppression_gain.reset();
    }
}

/// Runs the adaptive filter over one capture frame.
///
/// The filter input is every render channel in `render`, aligned with the
/// capture frame. The echo estimate goes to `estimate` and the capture minus
/// the estimate to `error`.
#[expect(
    clippy::too_many_arguments,
    reason = "disjoint borrows of engine fields"
)]
fn run_linear_filter(
    filter: &mut AdaptiveFirFilter,
    gain: &mut RefinedFilterUpdateGain,
    render: &RenderBuffer,
    capture: &[f32],
    error: &mut [f32],
    estimate: &mut [f32],
    noise_gate: f32,
    adaptation_allowed: bool,
) {
    let length = filter.len();
    let num_render_channels = render.num_channels();

    for start in (0..capture.len()).step_by(SUB_BLOCK_SIZE) {
        let end = (start + SUB_BLOCK_SIZE).min(capture.len());
        let adapt = adaptation_allowed
            && (0..num_render_channels).any(|ch| {
                let aligned = render.aligned(ch);
                block_energy(&aligned[length - 1 + start..length - 1 + end]) >= noise_gate
            });

        // Energy of the stacked render windows of all channels.
        let mut px: f32 = (0..num_render_channels)
            .map(|ch| {
                let window = &render.aligned(ch)[start..start + length];
                window.iter().map(|x| x * x).sum::<f32>()
            })
            .sum();
        let step = if adapt { gain.step(px) } else { 0.0 };

        for i in start..end {
            let y_hat = filter.filter(render, i);
            let e = capture[i] - y_hat;
            estimate[i] = y_hat;
            error[i] = e;
            if step > 0.0 && px > 0.0 {
                filter.adapt(render, i, step * e / px);
            }
            if i + 1 < end {
                for ch in 0..num_render_channels {
                    let aligned = render.aligned(ch);
                    let incoming = aligned[i + length];
                    let outgoing = aligned[i];
                    px += incoming * incoming - outgoing * outgoing;
                }
                px = px.max(0.0);
            }
        }

        gain.update(
            step,
            filter.erl(),
            block_energy(&error[start..end]),
            block_energy(&capture[start..end]),
        );
    }
}

/// Copies the linear filter output of one channel into the lowest band of
/// `linear_output`, zero-filling what the band rate does not cover.
fn write_linear_output(linear_output: &mut ChannelBuffer<f32>, ch: usize, error: &[f32]) {
    if ch >= linear_output.num_channels() {
        return;
    }
    let out = linear_output.channel_mut(0, ch);
    let n = out.len().min(error.len());
    out[..n].copy_from_slice(&error[..n]);
    out[n..].fill(0.0);
}

impl EchoControl for EchoCanceller3 {
    fn analyze_render(&mut self, render: &ChannelBuffer<f32>) {
        debug_assert_eq!(render.num_channels(), self.num_render_channels);
        debug_assert_eq!(render.num_bands(), self.num_bands);
        self.render_buffer.insert(render);
    }

    fn analyze_capture(&mut self, capture: &ChannelBuffer<f32>) {
        self.saturated_capture = (0..capture.num_channels()).any(|ch| {
            capture
                .bands(ch)
                .iter()
                .any(|v| v.abs() >= SATURATION_THRESHOLD)
        });
        if self.saturated_capture {
            tracing::trace!("capture saturated, filter adaptation paused");
        }
    }

    fn set_audio_buffer_delay(&mut self, delay_ms: i32) {
        self.render_buffer.set_delay_ms(delay_ms);
    }

    fn process_capture(
        &mut self,
        capture: &mut ChannelBuffer<f32>,
        mut linear_output: Option<&mut ChannelBuffer<f32>>,
        level_change: bool,
    ) {
        debug_assert_eq!(capture.num_channels(), self.num_capture_channels());
        debug_assert_eq!(capture.num_bands(), self.num_bands);
        debug_assert_eq!(capture.num_frames_per_band(), self.frame_length);

        if level_change {
            self.reset_for_level_change();
        }

        let render_power = self.render_buffer.aligned_frame_power();
        let render_energy = BLOCK_SIZE as f32 * render_power;
        self.render_active = render_power > self.active_render_limit * self.active_render_limit;

        let num_channels = self.num_capture_channels();
        let mut capture_energy = 0.0;
        let mut error_energy = 0.0;
        let mut estimate_energy = 0.0;

        for ch in 0..num_channels {
            self.capture.copy_from_slice(capture.channel(0, ch));
            run_linear_filter(
                &mut self.filters[ch],
                &mut self.filter_gains[ch],
                &self.render_buffer,
                &self.capture,
                &mut self.error,
                &mut self.estimate,
                self.noise_gate,
                !self.saturated_capture,
            );
            if let Some(linear_output) = linear_output.as_deref_mut() {
                write_linear_output(linear_output, ch, &self.error);
            }

            self.capture_splitters[ch].split(&self.capture, &mut self.capture_regions);
            self.error_splitters[ch].split(&self.error, &mut self.error_regions[ch]);
            self.estimate_splitters[ch].split(&self.estimate, &mut self.estimate_regions);

            let y2 = self.capture_regions.each_ref().map(|r| block_energy(r));
            let e2 = self.error_regions[ch].each_ref().map(|r| block_energy(r));
            let s2 = self.estimate_regions.each_ref().map(|r| block_energy(r));

            let render_active = self.render_active;
            let floor = self.echo_presence_floor;
            let echo_present = s2.map(|s| render_active && s > floor);
            self.erle.update(ch, &y2, &e2, &echo_present);

            let erle = self.erle.erle(ch);
            let mut residual_echo = [0.0; NUM_REGIONS];
            for (r, residual) in residual_echo.iter_mut().enumerate() {
                *residual = s2[r] / erle[r];
            }
            self.region_energies[ch] = RegionEnergies {
                nearend: e2,
                echo: s2,
                residual_echo,
            };

            capture_energy += block_energy(&self.capture);
            error_energy += block_energy(&self.error);
            estimate_energy += block_energy(&self.estimate);
        }

        let gains = self.suppression_gain.get_gain(
            &self.region_energies,
            RenderEnergies {
                low_band: self.render_buffer.low_band_energy(),
                high_bands: self.render_buffer.high_band_energy(),
            },
            self.saturated_capture,
        );

        for ch in 0..num_channels {
            let [low, mid, high] = &self.error_regions[ch];
            let [g_low, g_mid, g_high] = gains.low_band;
            for (i, out) in capture.channel_mut(0, ch).iter_mut().enumerate() {
                *out = g_low * low[i] + g_mid * mid[i] + g_high * high[i];
            }
            for band in 1..self.num_bands {
                for v in capture.channel_mut(band, ch) {
                    *v *= gains.high_bands;
                }
            }
        }

        let scale = 1.0 / num_channels as f32;
        self.metrics.update(
            self.render_active,
            render_energy,
            estimate_energy * scale,
            capture_energy * scale,
            error_energy * scale,
        );
    }

    fn metrics(&self) -> Metrics {
        Metrics {
            echo_return_loss: f64::from(self.metrics.erl_db()),
            echo_return_loss_enhancement: f64::from(self.metrics.erle_db()),
            delay_ms: self.render_buffer.delay_ms(),
        }
    }

    fn active_processing(&self) -> bool {
        self.render_active
    }
}
