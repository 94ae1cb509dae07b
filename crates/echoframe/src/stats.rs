//! Echo statistics reported by a session.

/// Statistics from the echo canceller.
///
/// All fields are `None` until the first frame has been processed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EchoStats {
    /// Echo Return Loss in dB: `ERL = 10 log10(P_far / P_echo)`.
    pub echo_return_loss: Option<f64>,
    /// Echo Return Loss Enhancement in dB: `ERLE = 10 log10(P_echo / P_out)`.
    pub echo_return_loss_enhancement: Option<f64>,
    /// Render-to-capture delay applied by the echo canceller, in ms.
    pub delay_ms: Option<i32>,
}
