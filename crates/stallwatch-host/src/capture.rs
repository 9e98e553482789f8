use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbaImage;
use stallwatch_core::capability::check_capture_region;
use stallwatch_core::{CaptureError, Frame, FrameCapturer, LocateError, WindowSource};
use stallwatch_types::{CaptureRegion, WindowInfo};
use xcap::{Monitor, Window};

/// Window enumeration and screen capture through xcap.
///
/// xcap calls block, so every trait call hops onto the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }
}

/// All titled top-level windows. Enumeration order is front to back, which
/// doubles as the focus rank.
pub fn list_windows() -> Result<Vec<WindowInfo>> {
    let windows = Window::all().context("Failed to enumerate windows")?;
    Ok(windows
        .into_iter()
        .filter(|w| !w.title().is_empty())
        .enumerate()
        .map(|(rank, w)| WindowInfo {
            id: w.id(),
            title: w.title().to_string(),
            bounds: CaptureRegion::new(w.x(), w.y(), w.width(), w.height()),
            minimized: w.is_minimized(),
            focus_rank: Some(rank as u32),
        })
        .collect())
}

fn monitor_bounds(m: &Monitor) -> CaptureRegion {
    CaptureRegion::new(m.x(), m.y(), m.width(), m.height())
}

fn capture_region_blocking(region: CaptureRegion) -> Result<RgbaImage, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;

    let Some(monitor) = monitors
        .iter()
        .find(|m| monitor_bounds(m).contains(&region))
    else {
        let screen = monitors
            .iter()
            .map(monitor_bounds)
            .reduce(|a, b| a.union(&b))
            .ok_or_else(|| CaptureError::Backend("no monitor found".into()))?;
        check_capture_region(region, screen)?;
        return Err(CaptureError::Backend(format!(
            "region {region:?} spans more than one monitor"
        )));
    };

    let image = monitor
        .capture_image()
        .map_err(|e| CaptureError::Backend(e.to_string()))?;

    let cropped = image::imageops::crop_imm(
        &image,
        (region.x - monitor.x()) as u32,
        (region.y - monitor.y()) as u32,
        region.width,
        region.height,
    )
    .to_image();

    Ok(cropped)
}

#[async_trait]
impl WindowSource for XcapScreen {
    async fn windows(&self) -> Result<Vec<WindowInfo>, LocateError> {
        tokio::task::spawn_blocking(list_windows)
            .await
            .map_err(|e| LocateError::Enumeration(e.to_string()))?
            .map_err(|e| LocateError::Enumeration(format!("{e:#}")))
    }
}

#[async_trait]
impl FrameCapturer for XcapScreen {
    async fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError> {
        if region.is_empty() {
            return Err(CaptureError::EmptyRegion(region));
        }

        let image = tokio::task::spawn_blocking(move || capture_region_blocking(region))
            .await
            .map_err(|e| CaptureError::Backend(e.to_string()))??;

        Ok(Frame::new(image, region, Instant::now()))
    }
}
