use stallwatch_config::detection::DetectionConfig;
use stallwatch_types::{Classification, ConversationState, Evidence, RecognitionResult};

use crate::history::RecentHistory;
use crate::preprocess::{DefaultPreprocessor, Preprocessor};

struct Marker {
    /// As configured, reported as evidence.
    label: String,
    normalized: String,
}

/// Maps recognized text plus recent history to a conversation state.
///
/// Order of checks: stall markers, active markers, then repetition. A sample
/// matching both marker kinds is `Stalled`; a spurious resume costs less
/// than a missed stall.
pub struct StateClassifier {
    stall_markers: Vec<Marker>,
    active_markers: Vec<Marker>,
    no_change_cycles: u32,
    confidence_threshold: f32,
    preprocessor: DefaultPreprocessor,
}

impl StateClassifier {
    pub fn new(config: &DetectionConfig) -> Self {
        let preprocessor = DefaultPreprocessor;
        let markers = |raw: &[String]| -> Vec<Marker> {
            raw.iter()
                .map(|m| Marker {
                    label: m.clone(),
                    normalized: preprocessor.process(m),
                })
                .filter(|m| !m.normalized.is_empty())
                .collect()
        };

        let stall_markers = markers(&config.stall_markers);
        let active_markers = markers(&config.active_markers);

        Self {
            stall_markers,
            active_markers,
            no_change_cycles: config.no_change_cycles,
            confidence_threshold: config.ocr_confidence_threshold,
            preprocessor,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Normalized text of the lines confident enough to classify on.
    pub fn normalize(&self, result: &RecognitionResult) -> String {
        self.preprocessor
            .process(&result.confident_text(self.confidence_threshold))
    }

    pub fn classify(&self, result: &RecognitionResult, history: &RecentHistory) -> Classification {
        self.classify_text(&self.normalize(result), history)
    }

    /// `history` holds the previous samples; the current one is not in it yet.
    pub fn classify_text(&self, normalized: &str, history: &RecentHistory) -> Classification {
        if normalized.is_empty() {
            return Classification::new(ConversationState::Unknown, Evidence::NoText);
        }

        if let Some(marker) = find_marker(&self.stall_markers, normalized) {
            return Classification::new(
                ConversationState::Stalled,
                Evidence::StallMarker(marker.label.clone()),
            );
        }

        if let Some(marker) = find_marker(&self.active_markers, normalized) {
            return Classification::new(
                ConversationState::Active,
                Evidence::ActiveMarker(marker.label.clone()),
            );
        }

        if self.no_change_cycles >= 2 {
            let identical = history.unchanged_run(normalized) + 1;
            if identical >= self.no_change_cycles {
                return Classification::new(
                    ConversationState::Stalled,
                    Evidence::NoChange { cycles: identical },
                );
            }
        }

        Classification::new(ConversationState::Unknown, Evidence::Ambiguous)
    }
}

fn find_marker<'a>(markers: &'a [Marker], text: &str) -> Option<&'a Marker> {
    markers.iter().find(|m| text.contains(&m.normalized))
}
