use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_tesseract_path() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_language() -> String {
    "eng+chi_sim".to_string()
}

fn default_preprocess() -> bool {
    true
}

fn default_upscale() -> u32 {
    2
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    #[default]
    Tesseract,
    /// Windows.Media.Ocr, Windows only.
    Windows,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: PathBuf,
    /// Tesseract language list (`eng+chi_sim`) or a BCP-47 tag for Windows OCR.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_preprocess")]
    pub preprocess: bool,
    /// Integer scale factor applied before recognition; 1 disables.
    #[serde(default = "default_upscale")]
    pub upscale: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::default(),
            tesseract_path: default_tesseract_path(),
            language: default_language(),
            preprocess: default_preprocess(),
            upscale: default_upscale(),
        }
    }
}
