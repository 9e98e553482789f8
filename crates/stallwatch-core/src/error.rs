use std::time::Duration;

use stallwatch_types::CaptureRegion;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    #[error("no window title contains \"{0}\"")]
    NotFound(String),

    #[error("window enumeration failed: {0}")]
    Enumeration(String),

    #[error("window lookup timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    #[error("capture region {0:?} has no area")]
    EmptyRegion(CaptureRegion),

    #[error("capture region {region:?} is outside the screen {screen:?}")]
    OffScreen {
        region: CaptureRegion,
        screen: CaptureRegion,
    },

    #[error("screen capture failed: {0}")]
    Backend(String),

    #[error("screen capture timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecognitionError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("OCR engine misconfigured: {0}")]
    Misconfigured(String),

    #[error("OCR failed on this frame: {0}")]
    Engine(String),

    #[error("OCR timed out after {0:?}")]
    TimedOut(Duration),
}

impl RecognitionError {
    /// Failures that cannot clear up without an operator fixing the engine.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RecognitionError::Unavailable(_) | RecognitionError::Misconfigured(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("target window lost focus while sending")]
    FocusLost,

    #[error("target window is gone")]
    WindowGone,

    #[error("input injection failed: {0}")]
    Injection(String),

    #[error("input injection not supported: {0}")]
    Unsupported(String),

    #[error("input injection timed out after {0:?}")]
    TimedOut(Duration),
}
