use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_resume_text() -> String {
    "continue".to_string()
}

fn default_dwell_time_s() -> f64 {
    10.0
}

fn default_cooldown_s() -> f64 {
    60.0
}

fn default_clear_input() -> bool {
    true
}

fn default_keystroke_delay_ms() -> u64 {
    30
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InjectMethod {
    /// One synthetic keystroke per character.
    #[default]
    Type,
    /// Clipboard + Ctrl+V, previous clipboard restored afterwards.
    Paste,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActionConfig {
    #[serde(default = "default_resume_text")]
    pub resume_text: String,
    /// How long a stall must persist before the first resume.
    #[serde(default = "default_dwell_time_s")]
    pub dwell_time_s: f64,
    /// Minimum spacing between resumes within one stall episode.
    #[serde(default = "default_cooldown_s")]
    pub cooldown_s: f64,
    pub method: InjectMethod,
    /// Select-all + delete before typing.
    #[serde(default = "default_clear_input")]
    pub clear_input: bool,
    #[serde(default = "default_keystroke_delay_ms")]
    pub keystroke_delay_ms: u64,
}

impl ActionConfig {
    pub fn dwell_time(&self) -> Duration {
        crate::seconds(self.dwell_time_s)
    }

    pub fn cooldown(&self) -> Duration {
        crate::seconds(self.cooldown_s)
    }

    pub fn keystroke_delay(&self) -> Duration {
        Duration::from_millis(self.keystroke_delay_ms)
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            resume_text: default_resume_text(),
            dwell_time_s: default_dwell_time_s(),
            cooldown_s: default_cooldown_s(),
            method: InjectMethod::default(),
            clear_input: default_clear_input(),
            keystroke_delay_ms: default_keystroke_delay_ms(),
        }
    }
}
