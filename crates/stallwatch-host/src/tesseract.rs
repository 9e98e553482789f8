use std::io::{Cursor, ErrorKind};
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use stallwatch_config::ocr::OcrConfig;
use stallwatch_core::preprocess::join_words;
use stallwatch_core::{Frame, RecognitionError, TextRecognizer};
use stallwatch_types::{CaptureRegion, RecognitionResult, RecognizedLine};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::preprocess::prepare_for_ocr;

/// Runs the `tesseract` binary once per frame and reads its TSV output.
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    preprocess: bool,
    upscale: u32,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.language.clone(),
            preprocess: config.preprocess,
            upscale: config.upscale,
        }
    }

    /// First line of `tesseract --version`.
    pub async fn version(&self) -> Result<String, RecognitionError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        // older builds print the banner on stderr
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn spawn_error(&self, e: std::io::Error) -> RecognitionError {
        match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                RecognitionError::Unavailable(format!("cannot run {}: {e}", self.binary.display()))
            }
            _ => RecognitionError::Engine(e.to_string()),
        }
    }

    fn encode(&self, frame: &Frame) -> Result<(Vec<u8>, u32), RecognitionError> {
        let (image, scale) = if self.preprocess {
            (
                DynamicImage::ImageLuma8(prepare_for_ocr(&frame.image, self.upscale)),
                self.upscale.max(1),
            )
        } else {
            (DynamicImage::ImageRgba8(frame.image.clone()), 1)
        };

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| RecognitionError::Engine(format!("failed to encode frame: {e}")))?;
        Ok((png, scale))
    }
}

#[async_trait]
impl TextRecognizer for TesseractEngine {
    async fn recognize(&self, frame: Frame) -> Result<RecognitionResult, RecognitionError> {
        let (png, scale) = self.encode(&frame)?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str(), "--psm", "6", "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognitionError::Engine("tesseract stdin unavailable".into()))?;
        stdin
            .write_all(&png)
            .await
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv, frame.region, scale))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

fn classify_failure(stderr: &str) -> RecognitionError {
    let message = stderr.trim().to_string();
    if message.contains("Failed loading language") || message.contains("Error opening data file")
    {
        RecognitionError::Misconfigured(message)
    } else {
        RecognitionError::Engine(message)
    }
}

/// Word rows of the TSV grouped into lines, in reading order.
///
/// Word boxes are in the coordinates of the image tesseract saw, so they
/// are divided by `scale` and offset by `region` to land back on screen.
pub fn parse_tsv(tsv: &str, region: CaptureRegion, scale: u32) -> RecognitionResult {
    struct Line {
        key: (u32, u32, u32, u32),
        words: Vec<String>,
        confidence: f32,
        bounds: CaptureRegion,
    }

    let scale = scale.max(1);
    let mut lines: Vec<Line> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        let Ok(conf) = cols[10].parse::<f32>() else {
            continue;
        };
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let num = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let key = (num(1), num(2), num(3), num(4));
        let bounds = CaptureRegion::new(
            region.x + (num(6) / scale) as i32,
            region.y + (num(7) / scale) as i32,
            num(8) / scale,
            num(9) / scale,
        );

        match lines.last_mut() {
            Some(line) if line.key == key => {
                line.words.push(text.to_string());
                line.confidence += conf;
                line.bounds = line.bounds.union(&bounds);
            }
            _ => lines.push(Line {
                key,
                words: vec![text.to_string()],
                confidence: conf,
                bounds,
            }),
        }
    }

    RecognitionResult::new(
        lines
            .into_iter()
            .map(|line| RecognizedLine {
                confidence: line.confidence / line.words.len() as f32 / 100.0,
                text: join_words(line.words.iter().map(String::as_str)),
                bounds: line.bounds,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn words_group_into_lines() {
        let data = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "4\t1\t1\t1\t1\t0\t20\t20\t300\t30\t-1\t",
            "5\t1\t1\t1\t1\t1\t20\t20\t100\t30\t96.0\tResponse",
            "5\t1\t1\t1\t1\t2\t130\t20\t90\t30\t90.0\tstopped",
            "5\t1\t1\t1\t2\t1\t20\t60\t80\t30\t40.0\tRetry",
        ]);
        let result = parse_tsv(&data, CaptureRegion::new(0, 0, 400, 300), 1);

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].text, "Response stopped");
        assert!((result.lines[0].confidence - 0.93).abs() < 1e-4);
        assert_eq!(result.lines[0].bounds, CaptureRegion::new(20, 20, 200, 30));
        assert_eq!(result.lines[1].text, "Retry");
        assert!((result.lines[1].confidence - 0.40).abs() < 1e-4);
    }

    #[test]
    fn cjk_glyph_words_join_without_spaces() {
        let data = tsv(&[
            "5\t1\t1\t1\t1\t1\t20\t20\t60\t30\t91.0\tCopilot",
            "5\t1\t1\t1\t1\t2\t90\t20\t20\t30\t88.0\t等",
            "5\t1\t1\t1\t1\t3\t112\t20\t20\t30\t85.0\t待",
            "5\t1\t1\t1\t1\t4\t134\t20\t20\t30\t87.0\t中",
        ]);
        let result = parse_tsv(&data, CaptureRegion::new(0, 0, 400, 300), 1);
        assert_eq!(result.lines[0].text, "Copilot 等待中");
    }

    #[test]
    fn boxes_map_back_to_screen() {
        let data = tsv(&["5\t1\t1\t1\t1\t1\t40\t20\t100\t30\t80\tcontinue"]);
        let result = parse_tsv(&data, CaptureRegion::new(800, 100, 400, 300), 2);
        assert_eq!(result.lines[0].bounds, CaptureRegion::new(820, 110, 50, 15));
    }

    #[test]
    fn blank_and_unscored_words_are_dropped() {
        let data = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\t ",
            "5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t88\t",
            "garbage",
        ]);
        assert!(parse_tsv(&data, CaptureRegion::new(0, 0, 10, 10), 1).is_empty());
    }

    #[test]
    fn missing_language_is_a_configuration_problem() {
        let err = classify_failure(
            "Error opening data file /usr/share/tessdata/chi_sim.traineddata\nFailed loading language 'chi_sim'\n",
        );
        assert!(err.is_fatal());
        assert!(matches!(err, RecognitionError::Misconfigured(_)));

        assert_eq!(
            classify_failure("Image too small to scale!!"),
            RecognitionError::Engine("Image too small to scale!!".into())
        );
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let engine = TesseractEngine::new(&OcrConfig {
            tesseract_path: "/nonexistent/tesseract-binary".into(),
            ..OcrConfig::default()
        });
        let err = engine.version().await.unwrap_err();
        assert!(matches!(err, RecognitionError::Unavailable(_)));
    }
}
