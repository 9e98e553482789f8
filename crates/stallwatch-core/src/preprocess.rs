use unicode_normalization::UnicodeNormalization;

/// Scripts written without spaces between words: CJK ideographs, kana and
/// CJK punctuation.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{3000}'..='\u{30FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
    )
}

/// Joins OCR words with single spaces, except between two CJK characters.
/// Tesseract reports each CJK glyph as its own word.
pub fn join_words<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for word in words {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        if let (Some(prev), Some(next)) = (out.chars().next_back(), word.chars().next()) {
            if !(is_cjk(prev) && is_cjk(next)) {
                out.push(' ');
            }
        }
        out.push_str(word);
    }
    out
}

pub trait Preprocessor {
    /// Normalizes OCR text for comparison: NFKC, lowercase, single spaces,
    /// none between CJK characters.
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        // NFKC folds full-width letters and ligatures OCR tends to emit
        let folded: String = text.nfkc().collect::<String>().to_lowercase();

        join_words(folded.split_whitespace())
    }
}

pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_case() {
        let p = DefaultPreprocessor;
        assert_eq!(
            p.process("  Copilot   has\n\nSTOPPED \t responding "),
            "copilot has stopped responding"
        );
    }

    #[test]
    fn folds_full_width_text() {
        let p = DefaultPreprocessor;
        assert_eq!(p.process("ＣＯＮＴＩＮＵＥ"), "continue");
    }

    #[test]
    fn spaced_cjk_glyphs_are_rejoined() {
        let p = DefaultPreprocessor;
        assert_eq!(p.process("等 待 中"), "等待中");
        assert_eq!(p.process("Copilot 运 行 中 ..."), "copilot 运行中 ...");
        assert_eq!(p.process("继续 continue"), "继续 continue");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(DefaultPreprocessor.process(" \n\t "), "");
    }
}
