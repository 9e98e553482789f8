use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_poll_interval_s() -> f64 {
    5.0
}

fn default_locate_timeout_ms() -> u64 {
    2_000
}

fn default_capture_timeout_ms() -> u64 {
    3_000
}

fn default_recognize_timeout_ms() -> u64 {
    15_000
}

fn default_inject_timeout_ms() -> u64 {
    5_000
}

fn default_prevent_sleep() -> bool {
    true
}

fn default_resume_hotkey() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_s")]
    pub poll_interval_s: f64,
    #[serde(default = "default_locate_timeout_ms")]
    pub locate_timeout_ms: u64,
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
    #[serde(default = "default_recognize_timeout_ms")]
    pub recognize_timeout_ms: u64,
    #[serde(default = "default_inject_timeout_ms")]
    pub inject_timeout_ms: u64,
    /// Keep the display awake while monitoring.
    #[serde(default = "default_prevent_sleep")]
    pub prevent_sleep: bool,
    /// Register Ctrl+Shift+R as a global "resume monitoring" hotkey.
    #[serde(default = "default_resume_hotkey")]
    pub resume_hotkey: bool,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        crate::seconds(self.poll_interval_s)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_s: default_poll_interval_s(),
            locate_timeout_ms: default_locate_timeout_ms(),
            capture_timeout_ms: default_capture_timeout_ms(),
            recognize_timeout_ms: default_recognize_timeout_ms(),
            inject_timeout_ms: default_inject_timeout_ms(),
            prevent_sleep: default_prevent_sleep(),
            resume_hotkey: default_resume_hotkey(),
        }
    }
}
