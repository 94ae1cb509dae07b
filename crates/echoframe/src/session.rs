//! Per-stream echo cancellation session.

use derive_more::Debug;
use echoframe_aec3::common::valid_full_band_rate;
use echoframe_aec3::{EchoCanceller3Factory, EchoControl};
use tracing::{debug, warn};

use crate::audio_buffer::AudioBuffer;
use crate::audio_frame::{AudioFrame, SpeechType, VadActivity};
use crate::config::SessionConfig;
use crate::error::Error;
use crate::high_pass_filter::HighPassFilter;
use crate::stats::EchoStats;
use crate::tuning::{SuppressionTier, echo_canceller_config};

/// Rate of the linear diagnostic output, independent of the session rate.
pub const LINEAR_OUTPUT_RATE_HZ: u32 = 16_000;
/// Samples written to the linear output per call.
pub const LINEAR_OUTPUT_SAMPLES: usize = 160;

/// Echo cancellation state for one audio stream.
///
/// The sample rate and channel count are fixed at creation. Every call to
/// [`process`](Self::process) advances the adaptive state of the echo
/// canceller, so frames must be fed in order without gaps.
///
/// # Example
///
/// ```
/// use echoframe::{Session, SessionConfig};
///
/// let mut session = Session::new(&SessionConfig::default()).unwrap();
/// let frame_size = session.frame_size();
/// let reference = vec![0i16; frame_size];
/// let capture = vec![0i16; frame_size];
/// let mut output = vec![0i16; frame_size];
/// session
///     .process(&reference, &capture, &mut output, None, frame_size, 0)
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct Session {
    sample_rate_hz: u32,
    num_channels: usize,
    frame_size: usize,
    tier: &'static SuppressionTier,
    echo_control: Box<dyn EchoControl>,
    high_pass_filter: HighPassFilter,
    reference: AudioBuffer,
    capture: AudioBuffer,
    linear: Option<AudioBuffer>,
    #[debug(skip)]
    reference_frame: AudioFrame,
    #[debug(skip)]
    capture_frame: AudioFrame,
    processed: bool,
}

impl Session {
    /// Creates a session.
    ///
    /// The suppression level is mapped to a tier once, here. The echo
    /// canceller, the high-pass filter and every buffer are allocated for the
    /// configured rate and channel count and reused for the session's
    /// lifetime.
    pub fn new(config: &SessionConfig) -> Result<Self, Error> {
        validate_config(config)?;
        let (aec_config, tier) = echo_canceller_config(config);
        let echo_control = EchoCanceller3Factory::new(aec_config).create(
            config.sample_rate_hz,
            config.num_channels,
            config.num_channels,
        );
        Ok(Self::with_echo_control(config, tier, echo_control))
    }

    fn with_echo_control(
        config: &SessionConfig,
        tier: &'static SuppressionTier,
        echo_control: Box<dyn EchoControl>,
    ) -> Self {
        let SessionConfig {
            sample_rate_hz,
            num_channels,
            export_linear,
            ..
        } = *config;
        let frame_size = config.frame_size();

        debug!(
            sample_rate_hz,
            num_channels,
            export_linear,
            tier = ?tier.kind,
            "echo cancellation session created"
        );
        if export_linear && num_channels > 1 {
            warn!(
                num_channels,
                "linear output carries {LINEAR_OUTPUT_SAMPLES} interleaved samples, \
                 not one full 16 kHz frame per channel"
            );
        }

        let frame_capacity = frame_size.max(LINEAR_OUTPUT_SAMPLES) * num_channels;
        Self {
            sample_rate_hz,
            num_channels,
            frame_size,
            tier,
            echo_control,
            high_pass_filter: HighPassFilter::new(sample_rate_hz, num_channels),
            reference: AudioBuffer::new(sample_rate_hz, num_channels),
            capture: AudioBuffer::new(sample_rate_hz, num_channels),
            linear: export_linear.then(|| AudioBuffer::new(LINEAR_OUTPUT_RATE_HZ, num_channels)),
            reference_frame: AudioFrame::with_capacity(frame_capacity),
            capture_frame: AudioFrame::with_capacity(frame_capacity),
            processed: false,
        }
    }

    /// Removes the echo of `reference` from `capture` and writes the result
    /// to `output`.
    ///
    /// All three buffers hold `frame_size` interleaved samples per channel;
    /// `frame_size` must be 10 ms at the session rate. Only the first
    /// `frame_size * num_channels` samples of `output` are written.
    ///
    /// `buffer_delay` is the render-to-capture delay in ms introduced by the
    /// caller's audio buffering. It is applied anew on every call.
    ///
    /// When the session was created with linear output and `linear_output`
    /// is given, the first [`LINEAR_OUTPUT_SAMPLES`] samples of the 16 kHz
    /// linear-filter output are written to it. For a multi-channel session
    /// these are interleaved, so each channel gets
    /// `LINEAR_OUTPUT_SAMPLES / num_channels` frames. A session without
    /// linear output never writes `linear_output`.
    ///
    /// On error nothing is written and the session state is unchanged.
    pub fn process(
        &mut self,
        reference: &[i16],
        capture: &[i16],
        output: &mut [i16],
        linear_output: Option<&mut [i16]>,
        frame_size: usize,
        buffer_delay: i32,
    ) -> Result<(), Error> {
        if frame_size != self.frame_size {
            return Err(Error::BadFrameSize);
        }
        let num_samples = frame_size * self.num_channels;
        if reference.len() < num_samples || capture.len() < num_samples || output.len() < num_samples
        {
            return Err(Error::BadDataLength);
        }
        // Without a linear buffer the caller's linear output is ignored.
        let linear_output = linear_output.filter(|_| self.linear.is_some());
        if linear_output
            .as_ref()
            .is_some_and(|out| out.len() < LINEAR_OUTPUT_SAMPLES)
        {
            return Err(Error::BadDataLength);
        }

        self.reference_frame.update_frame(
            0,
            Some(reference),
            frame_size,
            self.sample_rate_hz,
            SpeechType::NormalSpeech,
            VadActivity::Active,
            self.num_channels,
        );
        self.capture_frame.update_frame(
            0,
            Some(capture),
            frame_size,
            self.sample_rate_hz,
            SpeechType::NormalSpeech,
            VadActivity::Active,
            self.num_channels,
        );
        self.reference.copy_from(&self.reference_frame);
        self.capture.copy_from(&self.capture_frame);

        self.reference.split_into_frequency_bands();
        self.echo_control.analyze_render(self.reference.split_bands());
        self.reference.merge_frequency_bands();

        // Capture is analyzed full-band, before it is split.
        self.echo_control.analyze_capture(self.capture.data());
        self.capture.split_into_frequency_bands();
        self.high_pass_filter.process(&mut self.capture, true);

        self.echo_control.set_audio_buffer_delay(buffer_delay);
        self.echo_control.process_capture(
            self.capture.split_bands_mut(),
            self.linear.as_mut().map(AudioBuffer::data_mut),
            false,
        );
        self.capture.merge_frequency_bands();

        self.capture.copy_to(&mut self.capture_frame);
        output[..num_samples].copy_from_slice(&self.capture_frame.data()[..num_samples]);

        if let (Some(out), Some(linear)) = (linear_output, &self.linear) {
            self.capture_frame.update_frame(
                0,
                None,
                LINEAR_OUTPUT_SAMPLES,
                LINEAR_OUTPUT_RATE_HZ,
                SpeechType::NormalSpeech,
                VadActivity::Active,
                self.num_channels,
            );
            linear.copy_to(&mut self.capture_frame);
            out[..LINEAR_OUTPUT_SAMPLES]
                .copy_from_slice(&self.capture_frame.data()[..LINEAR_OUTPUT_SAMPLES]);
        }

        self.processed = true;
        Ok(())
    }

    /// Echo metrics. Empty until the first frame has been processed.
    pub fn statistics(&self) -> EchoStats {
        if !self.processed {
            return EchoStats::default();
        }
        let metrics = self.echo_control.metrics();
        EchoStats {
            echo_return_loss: Some(metrics.echo_return_loss),
            echo_return_loss_enhancement: Some(metrics.echo_return_loss_enhancement),
            delay_ms: Some(metrics.delay_ms),
        }
    }

    #[inline]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Samples per channel expected by [`process`](Self::process).
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Whether the session was created with a linear output path.
    #[inline]
    pub fn exports_linear(&self) -> bool {
        self.linear.is_some()
    }

    /// The tier selected from the configured suppression level.
    #[inline]
    pub fn suppression_tier(&self) -> &'static SuppressionTier {
        self.tier
    }
}

fn validate_config(config: &SessionConfig) -> Result<(), Error> {
    if !valid_full_band_rate(config.sample_rate_hz) {
        return Err(Error::BadSampleRate);
    }
    if config.num_channels == 0 {
        return Err(Error::BadNumberChannels);
    }
    Ok(())
}
