use std::sync::Arc;

use stallwatch_config::Config;
use stallwatch_config::ocr::OcrEngineKind;
use stallwatch_core::{Monitor, MonitorParts, SystemClock, TextRecognizer};
use stallwatch_host::{KeyboardInjector, TesseractEngine, XcapScreen};

/// Real host capabilities wired into a monitor.
pub async fn build_monitor(config: &Config) -> anyhow::Result<Monitor> {
    let screen = Arc::new(XcapScreen::new());
    let recognizer = recognizer(config).await?;

    Ok(Monitor::new(
        config,
        MonitorParts {
            windows: screen.clone(),
            capturer: screen,
            recognizer,
            injector: Arc::new(KeyboardInjector::new(&config.action)),
            clock: Arc::new(SystemClock),
        },
    ))
}

async fn recognizer(config: &Config) -> anyhow::Result<Arc<dyn TextRecognizer>> {
    match config.ocr.engine {
        OcrEngineKind::Tesseract => {
            let engine = TesseractEngine::new(&config.ocr);
            // a broken engine still starts; the first cycle pauses with the reason
            match engine.version().await {
                Ok(version) => tracing::info!("OCR: {} ({})", version, config.ocr.language),
                Err(e) => tracing::error!("{e}"),
            }
            Ok(Arc::new(engine))
        }
        OcrEngineKind::Windows => windows_ocr(config),
    }
}

#[cfg(windows)]
fn windows_ocr(config: &Config) -> anyhow::Result<Arc<dyn TextRecognizer>> {
    tracing::info!(
        "OCR: Windows.Media.Ocr ({})",
        stallwatch_host::windows_language_tag(&config.ocr.language)
    );
    Ok(Arc::new(stallwatch_host::WindowsOcr::new(&config.ocr.language)))
}

#[cfg(not(windows))]
fn windows_ocr(_config: &Config) -> anyhow::Result<Arc<dyn TextRecognizer>> {
    anyhow::bail!("ocr.engine \"windows\" is only available on Windows; use \"tesseract\"")
}
