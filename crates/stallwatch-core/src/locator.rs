use std::sync::Arc;

use stallwatch_config::window::WindowConfig;
use stallwatch_types::{CaptureRegion, RegionFraction, WindowInfo};

use crate::capability::WindowSource;
use crate::error::LocateError;

/// Where to read from and where to type into, resolved for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTarget {
    pub window: WindowInfo,
    pub capture: CaptureRegion,
    pub input_box: CaptureRegion,
}

/// Finds the target window by title and derives the chat panel from it.
pub struct RegionLocator {
    source: Arc<dyn WindowSource>,
    title_needle: String,
    capture_fraction: RegionFraction,
    input_box_rect: Option<CaptureRegion>,
    input_box_fraction: RegionFraction,
    min_size: (u32, u32),
}

impl RegionLocator {
    pub fn new(source: Arc<dyn WindowSource>, config: &WindowConfig) -> Self {
        Self {
            source,
            title_needle: config.window_title_substring.to_lowercase(),
            capture_fraction: config.capture_fraction,
            input_box_rect: config.input_box_rect,
            input_box_fraction: config.input_box_fraction,
            min_size: config.min_window_size,
        }
    }

    pub async fn locate(&self) -> Result<LocatedTarget, LocateError> {
        let windows = self.source.windows().await?;
        let window = self
            .select(&windows)
            .ok_or_else(|| LocateError::NotFound(self.title_needle.clone()))?;
        self.target_for(window)
    }

    /// Most recently focused matching window; first enumerated on ties.
    pub fn select<'a>(&self, windows: &'a [WindowInfo]) -> Option<&'a WindowInfo> {
        windows
            .iter()
            .filter(|w| self.is_candidate(w))
            .min_by_key(|w| w.focus_rank.unwrap_or(u32::MAX))
    }

    pub fn target_for(&self, window: &WindowInfo) -> Result<LocatedTarget, LocateError> {
        let capture = window
            .bounds
            .fraction(&self.capture_fraction)
            .ok_or_else(|| LocateError::NotFound(self.title_needle.clone()))?;

        let input_box = match self.input_box_rect {
            Some(rect) => rect,
            None => window
                .bounds
                .fraction(&self.input_box_fraction)
                .unwrap_or(capture),
        };

        Ok(LocatedTarget {
            window: window.clone(),
            capture,
            input_box,
        })
    }

    fn is_candidate(&self, window: &WindowInfo) -> bool {
        !window.minimized
            && window.bounds.width >= self.min_size.0
            && window.bounds.height >= self.min_size.1
            && window.title.to_lowercase().contains(&self.title_needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWindows;

    fn window(id: u32, title: &str, focus_rank: Option<u32>) -> WindowInfo {
        WindowInfo {
            id,
            title: title.to_string(),
            bounds: CaptureRegion::new(0, 0, 1000, 800),
            minimized: false,
            focus_rank,
        }
    }

    fn locator(windows: Vec<WindowInfo>) -> RegionLocator {
        let config = WindowConfig {
            window_title_substring: "Visual Studio Code".into(),
            ..WindowConfig::default()
        };
        RegionLocator::new(Arc::new(FakeWindows::new(windows)), &config)
    }

    #[tokio::test]
    async fn matches_title_case_insensitively() {
        let loc = locator(vec![
            window(1, "Terminal", Some(0)),
            window(2, "main.rs - project - visual studio code", Some(3)),
        ]);
        let target = loc.locate().await.unwrap();
        assert_eq!(target.window.id, 2);
        assert_eq!(target.capture, CaptureRegion::new(500, 0, 500, 800));
    }

    #[tokio::test]
    async fn no_match_is_not_found() {
        let loc = locator(vec![window(1, "Terminal", Some(0))]);
        assert!(matches!(loc.locate().await, Err(LocateError::NotFound(_))));
    }

    #[test]
    fn prefers_most_recently_focused() {
        let loc = locator(vec![]);
        let windows = vec![
            window(1, "a - Visual Studio Code", Some(4)),
            window(2, "b - Visual Studio Code", Some(1)),
            window(3, "c - Visual Studio Code", None),
        ];
        assert_eq!(loc.select(&windows).unwrap().id, 2);
    }

    #[test]
    fn ties_go_to_first_enumerated() {
        let loc = locator(vec![]);
        let windows = vec![
            window(7, "a - Visual Studio Code", None),
            window(8, "b - Visual Studio Code", None),
        ];
        assert_eq!(loc.select(&windows).unwrap().id, 7);
    }

    #[test]
    fn skips_minimized_and_tiny_windows() {
        let loc = locator(vec![]);
        let mut minimized = window(1, "Visual Studio Code", Some(0));
        minimized.minimized = true;
        let mut tiny = window(2, "Visual Studio Code", Some(1));
        tiny.bounds = CaptureRegion::new(0, 0, 40, 40);
        let ok = window(3, "Visual Studio Code", Some(9));

        let windows = vec![minimized, tiny, ok];
        assert_eq!(loc.select(&windows).unwrap().id, 3);
    }

    #[test]
    fn input_box_defaults_to_bottom_strip() {
        let loc = locator(vec![]);
        let target = loc
            .target_for(&window(1, "Visual Studio Code", None))
            .unwrap();
        assert_eq!(target.input_box, CaptureRegion::new(500, 704, 500, 96));
    }

    #[test]
    fn configured_input_box_wins() {
        let rect = CaptureRegion::new(1200, 900, 300, 30);
        let config = WindowConfig {
            input_box_rect: Some(rect),
            ..WindowConfig::default()
        };
        let loc = RegionLocator::new(Arc::new(FakeWindows::new(vec![])), &config);
        let target = loc
            .target_for(&window(1, "Visual Studio Code", None))
            .unwrap();
        assert_eq!(target.input_box, rect);
    }
}
