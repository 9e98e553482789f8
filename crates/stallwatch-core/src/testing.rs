//! In-memory stand-ins for the host capabilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use image::RgbaImage;
use stallwatch_types::{
    Ack, ActionCommand, CaptureRegion, RecognitionResult, RecognizedLine, WindowInfo,
};

use crate::capability::{
    check_capture_region, Frame, FrameCapturer, InputInjector, TextRecognizer, WindowSource,
};
use crate::clock::{Clock, ManualClock};
use crate::error::{ActionError, CaptureError, LocateError, RecognitionError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Result with one confident line per input line.
pub fn text_result(text: &str) -> RecognitionResult {
    let lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| RecognizedLine {
            text: l.to_string(),
            confidence: 0.9,
            bounds: CaptureRegion::new(0, i as i32 * 20, 400, 18),
        })
        .collect();
    RecognitionResult::new(lines)
}

pub fn editor_window(id: u32) -> WindowInfo {
    WindowInfo {
        id,
        title: "main.rs - demo - Visual Studio Code".to_string(),
        bounds: CaptureRegion::new(0, 0, 1600, 900),
        minimized: false,
        focus_rank: Some(0),
    }
}

pub struct FakeWindows {
    windows: Mutex<Result<Vec<WindowInfo>, LocateError>>,
}

impl FakeWindows {
    pub fn new(windows: Vec<WindowInfo>) -> Self {
        Self {
            windows: Mutex::new(Ok(windows)),
        }
    }

    pub fn set(&self, windows: Vec<WindowInfo>) {
        *lock(&self.windows) = Ok(windows);
    }

    pub fn fail(&self, error: LocateError) {
        *lock(&self.windows) = Err(error);
    }
}

#[async_trait]
impl WindowSource for FakeWindows {
    async fn windows(&self) -> Result<Vec<WindowInfo>, LocateError> {
        lock(&self.windows).clone()
    }
}

/// Produces blank frames stamped by the shared manual clock.
pub struct FakeCapturer {
    clock: Arc<ManualClock>,
    screen: CaptureRegion,
    failures: Mutex<VecDeque<CaptureError>>,
    captures: Mutex<Vec<CaptureRegion>>,
}

impl FakeCapturer {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            screen: CaptureRegion::new(0, 0, 1920, 1080),
            failures: Mutex::new(VecDeque::new()),
            captures: Mutex::new(Vec::new()),
        }
    }

    /// The next capture fails with `error`.
    pub fn fail_next(&self, error: CaptureError) {
        lock(&self.failures).push_back(error);
    }

    pub fn captures(&self) -> Vec<CaptureRegion> {
        lock(&self.captures).clone()
    }
}

#[async_trait]
impl FrameCapturer for FakeCapturer {
    async fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError> {
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        check_capture_region(region, self.screen)?;
        lock(&self.captures).push(region);
        Ok(Frame::new(
            RgbaImage::new(region.width.min(8), region.height.min(8)),
            region,
            self.clock.now(),
        ))
    }
}

enum Scripted {
    Reply(Result<RecognitionResult, RecognitionError>),
    /// Never answers; the caller's timeout has to fire.
    Hang,
}

/// Plays back queued results; once drained, repeats the last success.
pub struct ScriptedRecognizer {
    queue: Mutex<VecDeque<Scripted>>,
    last: Mutex<RecognitionResult>,
    calls: Mutex<usize>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            last: Mutex::new(RecognitionResult::default()),
            calls: Mutex::new(0),
        }
    }

    pub fn push_text(&self, text: &str) {
        self.push_result(text_result(text));
    }

    pub fn push_result(&self, result: RecognitionResult) {
        lock(&self.queue).push_back(Scripted::Reply(Ok(result)));
    }

    pub fn push_error(&self, error: RecognitionError) {
        lock(&self.queue).push_back(Scripted::Reply(Err(error)));
    }

    /// The next call blocks forever.
    pub fn push_hang(&self) {
        lock(&self.queue).push_back(Scripted::Hang);
    }

    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn recognize(&self, _frame: Frame) -> Result<RecognitionResult, RecognitionError> {
        *lock(&self.calls) += 1;
        let next = lock(&self.queue).pop_front();
        match next {
            Some(Scripted::Reply(Ok(result))) => {
                *lock(&self.last) = result.clone();
                Ok(result)
            }
            Some(Scripted::Reply(Err(error))) => Err(error),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(lock(&self.last).clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Records every command; optionally fails the next few.
pub struct RecordingInjector {
    sent: Mutex<Vec<ActionCommand>>,
    failures: Mutex<VecDeque<ActionError>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_next(&self, error: ActionError) {
        lock(&self.failures).push_back(error);
    }

    /// Every command received, failed ones included.
    pub fn sent(&self) -> Vec<ActionCommand> {
        lock(&self.sent).clone()
    }
}

impl Default for RecordingInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputInjector for RecordingInjector {
    async fn inject(&self, command: &ActionCommand) -> Result<Ack, ActionError> {
        lock(&self.sent).push(command.clone());
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        Ok(Ack {
            chars_sent: command.text_payload.chars().count(),
        })
    }
}
