use serde::{Deserialize, Serialize};
use stallwatch_types::{CaptureRegion, RegionFraction};

fn default_window_title_substring() -> String {
    "Visual Studio Code".to_string()
}

fn default_input_box_fraction() -> RegionFraction {
    RegionFraction::INPUT_STRIP
}

fn default_min_window_size() -> (u32, u32) {
    (100, 100)
}

/// Where to look on screen.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Case-insensitive substring of the target window title.
    #[serde(default = "default_window_title_substring")]
    pub window_title_substring: String,
    /// Chat panel as a fraction of the window.
    pub capture_fraction: RegionFraction,
    /// Absolute input box in screen coordinates. Wins over `input_box_fraction`.
    pub input_box_rect: Option<CaptureRegion>,
    #[serde(default = "default_input_box_fraction")]
    pub input_box_fraction: RegionFraction,
    /// Windows smaller than this (width, height) are ignored.
    #[serde(default = "default_min_window_size")]
    pub min_window_size: (u32, u32),
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_title_substring: default_window_title_substring(),
            capture_fraction: RegionFraction::default(),
            input_box_rect: None,
            input_box_fraction: default_input_box_fraction(),
            min_window_size: default_min_window_size(),
        }
    }
}
