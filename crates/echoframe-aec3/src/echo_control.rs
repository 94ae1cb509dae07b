//! The interface the audio pipeline drives an echo canceller through.

use std::fmt;

use echoframe_common_audio::channel_buffer::ChannelBuffer;

/// Echo canceller metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    /// Echo return loss in dB, averaged over the last second.
    pub echo_return_loss: f64,
    /// Echo return loss enhancement in dB, averaged over the last second.
    pub echo_return_loss_enhancement: f64,
    /// Render-to-capture delay in ms currently applied.
    pub delay_ms: i32,
}

/// Echo control driven once per 10 ms frame.
///
/// Per frame the pipeline calls, in order, [`analyze_render`],
/// [`analyze_capture`], [`set_audio_buffer_delay`] and [`process_capture`].
///
/// [`analyze_render`]: EchoControl::analyze_render
/// [`analyze_capture`]: EchoControl::analyze_capture
/// [`set_audio_buffer_delay`]: EchoControl::set_audio_buffer_delay
/// [`process_capture`]: EchoControl::process_capture
pub trait EchoControl: fmt::Debug + Send {
    /// Analyzes the band-split render (far-end) frame.
    fn analyze_render(&mut self, render: &ChannelBuffer<f32>);

    /// Analyzes the full-band capture frame before it is split.
    fn analyze_capture(&mut self, capture: &ChannelBuffer<f32>);

    /// Sets the render-to-capture delay introduced by the audio buffers, in ms.
    fn set_audio_buffer_delay(&mut self, delay_ms: i32);

    /// Removes echo from the band-split capture frame in place.
    ///
    /// When `linear_output` is supplied, the output of the linear filter stage
    /// is written to its lowest band. `level_change` signals a known gain
    /// change in the capture path.
    fn process_capture(
        &mut self,
        capture: &mut ChannelBuffer<f32>,
        linear_output: Option<&mut ChannelBuffer<f32>>,
        level_change: bool,
    );

    /// Collects current metrics from the echo controller.
    fn metrics(&self) -> Metrics;

    /// Returns whether the echo controller is actively processing.
    fn active_processing(&self) -> bool;
}
