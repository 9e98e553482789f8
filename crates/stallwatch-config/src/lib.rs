use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::action::ActionConfig;
use self::detection::DetectionConfig;
use self::monitor::MonitorConfig;
use self::ocr::{OcrConfig, OcrEngineKind};
use self::window::WindowConfig;

pub mod action;
pub mod detection;
pub mod monitor;
pub mod ocr;
pub mod window;

pub use action::InjectMethod;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Every option the monitor understands. Missing keys take their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub detection: DetectionConfig,
    pub action: ActionConfig,
    pub monitor: MonitorConfig,
    pub ocr: OcrConfig,
}

impl Config {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply `STALLWATCH_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let lookup = |key: &str| {
            let value = lookup(key);
            if value.is_some() {
                tracing::debug!("config override from {key}");
            }
            value
        };

        if let Some(title) = lookup("STALLWATCH_WINDOW_TITLE") {
            self.window.window_title_substring = title;
        }

        if let Some(raw) = lookup("STALLWATCH_POLL_INTERVAL_S") {
            self.monitor.poll_interval_s = raw
                .trim()
                .parse()
                .map_err(|_| invalid("monitor.poll_interval_s", format!("not a number: {raw}")))?;
        }

        if let Some(text) = lookup("STALLWATCH_RESUME_TEXT") {
            self.action.resume_text = text;
        }

        if let Some(raw) = lookup("STALLWATCH_OCR_ENGINE") {
            self.ocr.engine = match raw.trim().to_lowercase().as_str() {
                "tesseract" => OcrEngineKind::Tesseract,
                "windows" => OcrEngineKind::Windows,
                other => return Err(invalid("ocr.engine", format!("unknown engine: {other}"))),
            };
        }

        if let Some(path) = lookup("STALLWATCH_TESSERACT_PATH") {
            self.ocr.tesseract_path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Checked once at startup; the monitor assumes a valid config afterwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.window_title_substring.trim().is_empty() {
            return Err(invalid("window.window_title_substring", "must not be empty"));
        }
        if !self.window.capture_fraction.is_valid() {
            return Err(invalid(
                "window.capture_fraction",
                "fractions must lie in [0, 1] with non-zero size",
            ));
        }
        if !self.window.input_box_fraction.is_valid() {
            return Err(invalid(
                "window.input_box_fraction",
                "fractions must lie in [0, 1] with non-zero size",
            ));
        }
        if self.window.input_box_rect.is_some_and(|r| r.is_empty()) {
            return Err(invalid("window.input_box_rect", "must have a non-zero area"));
        }

        let d = &self.detection;
        if !(0.0..=1.0).contains(&d.ocr_confidence_threshold) {
            return Err(invalid(
                "detection.ocr_confidence_threshold",
                format!("{} is outside [0, 1]", d.ocr_confidence_threshold),
            ));
        }
        if d.stall_markers.iter().all(|m| m.trim().is_empty()) && d.no_change_cycles == 0 {
            return Err(invalid(
                "detection.stall_markers",
                "no stall markers and no_change_cycles = 0 can never detect a stall",
            ));
        }
        if d.no_change_cycles == 1 {
            return Err(invalid(
                "detection.no_change_cycles",
                "needs at least 2 samples to observe no change (0 disables)",
            ));
        }
        if d.history_len == 0 {
            return Err(invalid("detection.history_len", "must be at least 1"));
        }

        let a = &self.action;
        if a.resume_text.trim().is_empty() {
            return Err(invalid("action.resume_text", "must not be empty"));
        }
        check_seconds("action.dwell_time_s", a.dwell_time_s, true)?;
        check_seconds("action.cooldown_s", a.cooldown_s, true)?;

        let m = &self.monitor;
        check_seconds("monitor.poll_interval_s", m.poll_interval_s, false)?;
        for (field, ms) in [
            ("monitor.locate_timeout_ms", m.locate_timeout_ms),
            ("monitor.capture_timeout_ms", m.capture_timeout_ms),
            ("monitor.recognize_timeout_ms", m.recognize_timeout_ms),
            ("monitor.inject_timeout_ms", m.inject_timeout_ms),
        ] {
            if ms == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        if self.ocr.language.trim().is_empty() {
            return Err(invalid("ocr.language", "must not be empty"));
        }
        if self.ocr.upscale == 0 || self.ocr.upscale > 4 {
            return Err(invalid("ocr.upscale", "must be between 1 and 4"));
        }

        Ok(())
    }
}

/// Longest dwell, cooldown or poll interval accepted, one week.
pub const MAX_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

fn check_seconds(field: &'static str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let ok = value.is_finite() && if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !ok {
        return Err(invalid(field, format!("{value} is not a valid duration")));
    }
    if value > MAX_SECONDS {
        return Err(invalid(field, format!("{value} exceeds {MAX_SECONDS} seconds")));
    }
    Ok(())
}

/// Seconds to `Duration`, saturating instead of panicking on values
/// `validate` would reject.
pub(crate) fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}
