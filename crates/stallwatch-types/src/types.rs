use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::region::CaptureRegion;

/// A top-level window as reported by the window system for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: u32,
    pub title: String,
    pub bounds: CaptureRegion,
    pub minimized: bool,
    /// 0 = currently focused, larger = focused longer ago. `None` when unknown.
    pub focus_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub text: String,
    /// Engine confidence in [0, 1].
    pub confidence: f32,
    /// Position inside the frame, frame-local pixels.
    pub bounds: CaptureRegion,
}

/// OCR output for one frame, lines in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub lines: Vec<RecognizedLine>,
}

impl RecognitionResult {
    pub fn new(lines: Vec<RecognizedLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }

    /// Lines at or above `threshold`; these feed classification.
    pub fn confident_lines(&self, threshold: f32) -> impl Iterator<Item = &RecognizedLine> {
        self.lines.iter().filter(move |l| l.confidence >= threshold)
    }

    /// Lines below `threshold`, kept for diagnostics only.
    pub fn rejected_lines(&self, threshold: f32) -> impl Iterator<Item = &RecognizedLine> {
        self.lines.iter().filter(move |l| l.confidence < threshold)
    }

    pub fn confident_text(&self, threshold: f32) -> String {
        self.confident_lines(threshold)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationState {
    Active,
    Stalled,
    Unknown,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationState::Active => "active",
            ConversationState::Stalled => "stalled",
            ConversationState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Why the classifier produced its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evidence {
    StallMarker(String),
    ActiveMarker(String),
    NoChange { cycles: u32 },
    /// Nothing legible above the confidence threshold.
    NoText,
    /// Text present but neither marker nor repetition matched.
    Ambiguous,
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::StallMarker(m) => write!(f, "stall marker \"{m}\""),
            Evidence::ActiveMarker(m) => write!(f, "active marker \"{m}\""),
            Evidence::NoChange { cycles } => write!(f, "no change for {cycles} cycles"),
            Evidence::NoText => f.write_str("no legible text"),
            Evidence::Ambiguous => f.write_str("no marker matched"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub state: ConversationState,
    pub evidence: Evidence,
}

impl Classification {
    pub fn new(state: ConversationState, evidence: Evidence) -> Self {
        Self { state, evidence }
    }
}

/// What gets typed into the application, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub text_payload: String,
    pub target_region: CaptureRegion,
    /// Window that must own focus while the payload is sent.
    pub window_id: Option<u32>,
}

/// Successful injection receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub chars_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSnapshot {
    pub id: Uuid,
    pub open_for: Duration,
    pub action_taken: bool,
    pub consecutive_stall_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    WindowNotFound,
    Locate(String),
    Capture(String),
    Recognition(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WindowNotFound => f.write_str("target window not found"),
            SkipReason::Locate(e) => write!(f, "window lookup failed: {e}"),
            SkipReason::Capture(e) => write!(f, "capture failed: {e}"),
            SkipReason::Recognition(e) => write!(f, "recognition failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Classified,
    /// Transient sensing gap, episode untouched.
    Skipped(SkipReason),
    /// This cycle hit a dependency failure and the monitor is now paused.
    Paused { reason: String },
    /// Monitor was already paused; nothing ran.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    NotAttempted,
    Sent {
        attempt: u32,
        forced: bool,
    },
    Failed {
        attempt: u32,
        forced: bool,
        error: String,
    },
    /// A resume was due but automatic sending is switched off.
    Suppressed { attempt: u32 },
}

/// Per-cycle diagnostic record handed to the reporting side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    pub classification: Option<Classification>,
    pub action: ActionOutcome,
    pub episode: Option<EpisodeSnapshot>,
    /// Recognized lines dropped for low confidence.
    pub rejected_lines: Vec<String>,
}

/// Operator requests delivered to the monitor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Resume,
    Status,
    SendNow,
    /// Switch automatic resumes on or off; monitoring continues either way.
    AutoSend(bool),
    Stop,
}
