//! Perception and decision logic for the stall monitor.
//!
//! Everything here is host-independent: window enumeration, screen capture,
//! OCR and input injection arrive through the traits in [`capability`].

pub mod capability;
pub mod classifier;
pub mod clock;
pub mod debouncer;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod locator;
pub mod monitor;
pub mod preprocess;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capability::{Frame, FrameCapturer, InputInjector, TextRecognizer, WindowSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ActionError, CaptureError, LocateError, RecognitionError};
pub use monitor::{CallTimeouts, Monitor, MonitorParts};
