use serde::{Deserialize, Serialize};

fn default_stall_markers() -> Vec<String> {
    [
        "stopped",
        "rate limit",
        "click continue",
        "continue to iterate",
        "try again",
        "等待",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_active_markers() -> Vec<String> {
    [
        "thinking",
        "generating",
        "working",
        "processing",
        "运行中",
        "处理中",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_no_change_cycles() -> u32 {
    3
}

fn default_ocr_confidence_threshold() -> f32 {
    0.4
}

fn default_history_len() -> usize {
    5
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    #[serde(default = "default_stall_markers")]
    pub stall_markers: Vec<String>,
    #[serde(default = "default_active_markers")]
    pub active_markers: Vec<String>,
    /// Identical samples in a row that count as a silent stall. 0 disables.
    #[serde(default = "default_no_change_cycles")]
    pub no_change_cycles: u32,
    #[serde(default = "default_ocr_confidence_threshold")]
    pub ocr_confidence_threshold: f32,
    /// Rolling history size; raised to `no_change_cycles` if smaller.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            stall_markers: default_stall_markers(),
            active_markers: default_active_markers(),
            no_change_cycles: default_no_change_cycles(),
            ocr_confidence_threshold: default_ocr_confidence_threshold(),
            history_len: default_history_len(),
        }
    }
}
