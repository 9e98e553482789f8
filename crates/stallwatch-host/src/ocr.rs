/// BCP-47 tag for a tesseract-style language list such as `eng+chi_sim`.
///
/// Windows OCR takes a single language, so only the first entry is used.
/// Values that already look like BCP-47 tags pass through.
pub fn windows_language_tag(language: &str) -> String {
    let first = language.split('+').next().unwrap_or_default().trim();
    match first {
        "" | "eng" => "en-US",
        "chi_sim" => "zh-Hans-CN",
        "chi_tra" => "zh-Hant-TW",
        "jpn" => "ja",
        "kor" => "ko",
        "deu" => "de-DE",
        "fra" => "fr-FR",
        "spa" => "es-ES",
        "rus" => "ru",
        other => other,
    }
    .to_string()
}

#[cfg(windows)]
pub use self::winrt::WindowsOcr;

#[cfg(windows)]
mod winrt {
    use std::io::Cursor;

    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat};
    use stallwatch_core::{Frame, RecognitionError, TextRecognizer};
    use stallwatch_types::{CaptureRegion, RecognitionResult, RecognizedLine};
    use windows::{
        core::HSTRING,
        Foundation::Rect,
        Globalization::Language,
        Graphics::Imaging::BitmapDecoder,
        Media::Ocr::OcrEngine as WinOcrEngine,
        Storage::Streams::{DataWriter, InMemoryRandomAccessStream},
    };

    use super::windows_language_tag;
    use crate::com::ComGuard;

    fn engine_err(e: windows::core::Error) -> RecognitionError {
        RecognitionError::Engine(e.to_string())
    }

    /// Windows.Media.Ocr. Reports no per-line confidence, so every line
    /// carries 1.0.
    pub struct WindowsOcr {
        tag: String,
    }

    impl WindowsOcr {
        pub fn new(language: &str) -> Self {
            Self {
                tag: windows_language_tag(language),
            }
        }
    }

    #[async_trait]
    impl TextRecognizer for WindowsOcr {
        async fn recognize(&self, frame: Frame) -> Result<RecognitionResult, RecognitionError> {
            let mut png = Vec::new();
            DynamicImage::ImageRgba8(frame.image)
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| RecognitionError::Engine(format!("failed to encode frame: {e}")))?;

            let tag = self.tag.clone();
            let region = frame.region;
            tokio::task::spawn_blocking(move || recognize_blocking(&png, &tag, region))
                .await
                .map_err(|e| RecognitionError::Engine(e.to_string()))?
        }

        fn name(&self) -> &str {
            "windows"
        }
    }

    fn create_engine(tag: &str) -> Result<WinOcrEngine, RecognitionError> {
        let misconfigured =
            |e: windows::core::Error| RecognitionError::Misconfigured(format!("{tag}: {e}"));

        let language = Language::CreateLanguage(&HSTRING::from(tag)).map_err(misconfigured)?;
        if !WinOcrEngine::IsLanguageSupported(&language).unwrap_or(false) {
            return Err(RecognitionError::Misconfigured(format!(
                "no OCR language pack installed for {tag}"
            )));
        }
        WinOcrEngine::TryCreateFromLanguage(&language).map_err(misconfigured)
    }

    fn recognize_blocking(
        png: &[u8],
        tag: &str,
        region: CaptureRegion,
    ) -> Result<RecognitionResult, RecognitionError> {
        let _com = ComGuard::initialize()?;
        let engine = create_engine(tag)?;

        let stream = InMemoryRandomAccessStream::new().map_err(engine_err)?;
        let writer = DataWriter::CreateDataWriter(&stream).map_err(engine_err)?;
        writer.WriteBytes(png).map_err(engine_err)?;
        writer
            .StoreAsync()
            .and_then(|op| op.get())
            .map_err(engine_err)?;
        writer
            .FlushAsync()
            .and_then(|op| op.get())
            .map_err(engine_err)?;
        stream.Seek(0).map_err(engine_err)?;

        let bitmap = BitmapDecoder::CreateAsync(&stream)
            .and_then(|op| op.get())
            .and_then(|decoder| decoder.GetSoftwareBitmapAsync())
            .and_then(|op| op.get())
            .map_err(engine_err)?;

        let result = engine
            .RecognizeAsync(&bitmap)
            .and_then(|op| op.get())
            .map_err(engine_err)?;

        let lines = result.Lines().map_err(engine_err)?;
        let mut out = Vec::new();
        for i in 0..lines.Size().map_err(engine_err)? {
            let line = lines.GetAt(i).map_err(engine_err)?;
            let words = line.Words().map_err(engine_err)?;

            let mut bounds: Option<CaptureRegion> = None;
            for j in 0..words.Size().map_err(engine_err)? {
                let rect = words
                    .GetAt(j)
                    .and_then(|w| w.BoundingRect())
                    .map_err(engine_err)?;
                let word = to_screen(rect, region);
                bounds = Some(bounds.map_or(word, |b| b.union(&word)));
            }

            out.push(RecognizedLine {
                text: line.Text().map_err(engine_err)?.to_string(),
                confidence: 1.0,
                bounds: bounds.unwrap_or(region),
            });
        }

        Ok(RecognitionResult::new(out))
    }

    fn to_screen(rect: Rect, region: CaptureRegion) -> CaptureRegion {
        CaptureRegion::new(
            region.x + rect.X as i32,
            region.y + rect.Y as i32,
            rect.Width.max(0.0) as u32,
            rect.Height.max(0.0) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tesseract_names_map_to_bcp47() {
        assert_eq!(windows_language_tag("eng"), "en-US");
        assert_eq!(windows_language_tag("eng+chi_sim"), "en-US");
        assert_eq!(windows_language_tag("chi_sim+eng"), "zh-Hans-CN");
        assert_eq!(windows_language_tag("ja-JP"), "ja-JP");
        assert_eq!(windows_language_tag(""), "en-US");
    }
}
