//! Narrow interfaces to the host: window system, screen, OCR engine, input.
//!
//! Every call is treated as blocking from the monitor's point of view; the
//! monitor bounds each one with its own timeout.

use std::time::Instant;

use async_trait::async_trait;
use image::RgbaImage;
use stallwatch_types::{Ack, ActionCommand, CaptureRegion, RecognitionResult, WindowInfo};

use crate::error::{ActionError, CaptureError, LocateError, RecognitionError};

/// One captured raster, owned by the cycle that produced it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub region: CaptureRegion,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbaImage, region: CaptureRegion, captured_at: Instant) -> Self {
        Self {
            image,
            region,
            captured_at,
        }
    }
}

#[async_trait]
pub trait WindowSource: Send + Sync {
    /// Top-level windows in enumeration order.
    async fn windows(&self) -> Result<Vec<WindowInfo>, LocateError>;
}

#[async_trait]
pub trait FrameCapturer: Send + Sync {
    async fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError>;
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, frame: Frame) -> Result<RecognitionResult, RecognitionError>;

    /// Engine name for diagnostics.
    fn name(&self) -> &str;
}

#[async_trait]
pub trait InputInjector: Send + Sync {
    /// Focus the target, type the payload, submit.
    async fn inject(&self, command: &ActionCommand) -> Result<Ack, ActionError>;
}

/// Rejects regions a capturer must not read: empty, or not fully on `screen`.
pub fn check_capture_region(
    region: CaptureRegion,
    screen: CaptureRegion,
) -> Result<(), CaptureError> {
    if region.is_empty() {
        return Err(CaptureError::EmptyRegion(region));
    }
    if !screen.contains(&region) {
        return Err(CaptureError::OffScreen { region, screen });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_region_checks() {
        let screen = CaptureRegion::new(0, 0, 1920, 1080);

        assert!(check_capture_region(CaptureRegion::new(960, 0, 960, 1080), screen).is_ok());
        assert_eq!(
            check_capture_region(CaptureRegion::new(10, 10, 0, 50), screen),
            Err(CaptureError::EmptyRegion(CaptureRegion::new(10, 10, 0, 50)))
        );
        assert!(matches!(
            check_capture_region(CaptureRegion::new(1800, 0, 400, 100), screen),
            Err(CaptureError::OffScreen { .. })
        ));
    }
}
