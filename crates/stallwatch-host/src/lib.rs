//! Platform side of the monitor: xcap for windows and pixels, tesseract or
//! Windows OCR for text, synthetic input for the resume.

mod capture;
#[cfg(windows)]
mod com;
mod hotkey;
mod inject;
mod ocr;
mod power;
mod preprocess;
mod tesseract;

pub use capture::{XcapScreen, list_windows};
#[cfg(windows)]
pub use com::ComGuard;
pub use hotkey::ResumeHotkey;
pub use inject::KeyboardInjector;
#[cfg(windows)]
pub use ocr::WindowsOcr;
pub use ocr::windows_language_tag;
pub use power::KeepAwake;
pub use preprocess::prepare_for_ocr;
pub use tesseract::{TesseractEngine, parse_tsv};
