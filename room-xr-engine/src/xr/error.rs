use thiserror::Error;

use super::session::XrMode;

/// Failures surfaced by the XR layer.
///
/// None of these are fatal: callers log them and fall back to the degraded
/// view or simply drop the offending event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XrError {
    #[error("WebXR is not supported")]
    Unsupported,

    #[error("immersive {0} is unavailable")]
    ModeUnavailable(XrMode),

    #[error("AR hit testing is not supported")]
    HitTestUnsupported,

    #[error("WebXR immersive session failed to start: {0}")]
    SessionRejected(String),

    #[error("hit test request {request} failed: {message}")]
    HitTestFailed { request: u64, message: String },

    #[error("layer '{layer}' not found for trigger '{trigger}'")]
    MissingLayer { trigger: String, layer: usize },

    #[error("no active hit test stream for request {0}")]
    UnknownSubscription(u64),

    #[error("bridge message rejected: {0}")]
    Bridge(String),
}
