use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stallwatch_config::Config;
use stallwatch_config::monitor::MonitorConfig;
use stallwatch_types::{
    ActionOutcome, CaptureRegion, Classification, CycleOutcome, CycleReport, EpisodeSnapshot,
    SkipReason,
};

use crate::capability::{FrameCapturer, InputInjector, TextRecognizer, WindowSource};
use crate::classifier::StateClassifier;
use crate::clock::Clock;
use crate::debouncer::{DebounceDecision, StallDebouncer};
use crate::dispatcher::ActionDispatcher;
use crate::error::{ActionError, CaptureError, LocateError, RecognitionError};
use crate::history::{HistoryEntry, RecentHistory};
use crate::locator::{LocatedTarget, RegionLocator};

/// Upper bounds for each external call made during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub locate: Duration,
    pub capture: Duration,
    pub recognize: Duration,
    pub inject: Duration,
}

impl From<&MonitorConfig> for CallTimeouts {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            locate: Duration::from_millis(config.locate_timeout_ms),
            capture: Duration::from_millis(config.capture_timeout_ms),
            recognize: Duration::from_millis(config.recognize_timeout_ms),
            inject: Duration::from_millis(config.inject_timeout_ms),
        }
    }
}

/// Host capabilities the monitor drives.
pub struct MonitorParts {
    pub windows: Arc<dyn WindowSource>,
    pub capturer: Arc<dyn FrameCapturer>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub injector: Arc<dyn InputInjector>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunState {
    Running,
    Paused { reason: String },
}

/// The perception-and-decision loop body. Owns all cross-cycle state.
///
/// `tick` runs exactly one cycle; scheduling is the caller's business.
pub struct Monitor {
    locator: RegionLocator,
    capturer: Arc<dyn FrameCapturer>,
    recognizer: Arc<dyn TextRecognizer>,
    classifier: StateClassifier,
    debouncer: StallDebouncer,
    dispatcher: ActionDispatcher,
    history: RecentHistory,
    clock: Arc<dyn Clock>,
    timeouts: CallTimeouts,
    region: Option<CaptureRegion>,
    run_state: RunState,
    force_send: bool,
    cycle: u64,
}

impl Monitor {
    pub fn new(config: &Config, parts: MonitorParts) -> Self {
        let history_len = config
            .detection
            .history_len
            .max(config.detection.no_change_cycles as usize);

        Self {
            locator: RegionLocator::new(parts.windows, &config.window),
            capturer: parts.capturer,
            recognizer: parts.recognizer,
            classifier: StateClassifier::new(&config.detection),
            debouncer: StallDebouncer::new(config.action.dwell_time(), config.action.cooldown()),
            dispatcher: ActionDispatcher::new(parts.injector, config.action.resume_text.clone()),
            history: RecentHistory::with_capacity(history_len),
            clock: parts.clock,
            timeouts: CallTimeouts::from(&config.monitor),
            region: None,
            run_state: RunState::Running,
            force_send: false,
            cycle: 0,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.run_state, RunState::Paused { .. })
    }

    /// Leave the paused state. Returns false if the monitor was not paused.
    pub fn resume(&mut self) -> bool {
        if !self.is_paused() {
            return false;
        }
        tracing::debug!("monitor resumed");
        self.run_state = RunState::Running;
        true
    }

    /// Send one resume at the next cycle that locates the window. Refused while paused.
    pub fn request_resume_action(&mut self) -> bool {
        if self.is_paused() {
            return false;
        }
        self.force_send = true;
        true
    }

    /// Switch automatic resumes on or off. Classification and stall tracking
    /// carry on while off. Returns false if nothing changed.
    pub fn set_auto_send(&mut self, enabled: bool) -> bool {
        if self.debouncer.auto_send() == enabled {
            return false;
        }
        self.debouncer.set_auto_send(enabled);
        true
    }

    pub fn auto_send(&self) -> bool {
        self.debouncer.auto_send()
    }

    pub fn current_region(&self) -> Option<CaptureRegion> {
        self.region
    }

    pub fn episode(&self) -> Option<EpisodeSnapshot> {
        self.debouncer
            .episode()
            .map(|e| e.snapshot(self.clock.now()))
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    pub async fn tick(&mut self) -> CycleReport {
        self.cycle += 1;

        if self.is_paused() {
            return self.report(CycleOutcome::Idle, None, ActionOutcome::NotAttempted, Vec::new());
        }

        let target = match timed(
            self.timeouts.locate,
            self.locator.locate(),
            LocateError::TimedOut,
        )
        .await
        {
            Ok(target) => target,
            Err(LocateError::NotFound(_)) => {
                return self.skip(SkipReason::WindowNotFound);
            }
            Err(e) => return self.skip(SkipReason::Locate(e.to_string())),
        };

        if self.region != Some(target.capture) {
            tracing::debug!("capture region now {:?}", target.capture);
            self.region = Some(target.capture);
        }

        let frame = match timed(
            self.timeouts.capture,
            self.capturer.capture(target.capture),
            CaptureError::TimedOut,
        )
        .await
        {
            Ok(frame) => frame,
            Err(e) => return self.skip(SkipReason::Capture(e.to_string())),
        };
        let sample_at = frame.captured_at;

        let result = match timed(
            self.timeouts.recognize,
            self.recognizer.recognize(frame),
            RecognitionError::TimedOut,
        )
        .await
        {
            Ok(result) => result,
            Err(e) if e.is_fatal() => {
                let reason = e.to_string();
                self.run_state = RunState::Paused {
                    reason: reason.clone(),
                };
                self.force_send = false;
                return self.report(
                    CycleOutcome::Paused { reason },
                    None,
                    ActionOutcome::NotAttempted,
                    Vec::new(),
                );
            }
            Err(e) => return self.skip(SkipReason::Recognition(e.to_string())),
        };

        let rejected: Vec<String> = result
            .rejected_lines(self.classifier.confidence_threshold())
            .map(|l| l.text.clone())
            .collect();

        let normalized = self.classifier.normalize(&result);
        let classification = self.classifier.classify_text(&normalized, &self.history);
        self.history.push(HistoryEntry {
            text: normalized,
            state: classification.state,
        });

        let now = self.clock.now();
        let decision = self.debouncer.observe(&classification, sample_at, now);
        tracing::debug!(
            "cycle {}: {} ({}) -> {:?}",
            self.cycle,
            classification.state,
            classification.evidence,
            decision
        );

        let action = match decision {
            DebounceDecision::Dispatch { attempt } => {
                self.force_send = false;
                self.send(&target, attempt, false).await
            }
            _ if self.force_send => {
                self.force_send = false;
                let attempt = self.debouncer.record_manual_action(now);
                self.send(&target, attempt, true).await
            }
            DebounceDecision::Suppressed { attempt } => {
                tracing::debug!("cycle {}: resume due, auto-send is off", self.cycle);
                ActionOutcome::Suppressed { attempt }
            }
            _ => ActionOutcome::NotAttempted,
        };

        self.report(CycleOutcome::Classified, Some(classification), action, rejected)
    }

    async fn send(&self, target: &LocatedTarget, attempt: u32, forced: bool) -> ActionOutcome {
        let command = self.dispatcher.command_for(target);
        match timed(
            self.timeouts.inject,
            self.dispatcher.dispatch(&command),
            ActionError::TimedOut,
        )
        .await
        {
            Ok(_) => ActionOutcome::Sent { attempt, forced },
            Err(e) => ActionOutcome::Failed {
                attempt,
                forced,
                error: e.to_string(),
            },
        }
    }

    fn skip(&self, reason: SkipReason) -> CycleReport {
        self.report(
            CycleOutcome::Skipped(reason),
            None,
            ActionOutcome::NotAttempted,
            Vec::new(),
        )
    }

    fn report(
        &self,
        outcome: CycleOutcome,
        classification: Option<Classification>,
        action: ActionOutcome,
        rejected_lines: Vec<String>,
    ) -> CycleReport {
        CycleReport {
            cycle: self.cycle,
            outcome,
            classification,
            action,
            episode: self.episode(),
            rejected_lines,
        }
    }
}

async fn timed<T, E>(
    limit: Duration,
    call: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use stallwatch_types::{ConversationState, Evidence};

    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{
        editor_window, FakeCapturer, FakeWindows, RecordingInjector, ScriptedRecognizer,
    };

    const POLL: Duration = Duration::from_secs(5);

    struct Rig {
        monitor: Monitor,
        clock: Arc<ManualClock>,
        windows: Arc<FakeWindows>,
        capturer: Arc<FakeCapturer>,
        recognizer: Arc<ScriptedRecognizer>,
        injector: Arc<RecordingInjector>,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_config(Config::default())
        }

        fn with_config(config: Config) -> Self {
            let clock = Arc::new(ManualClock::new());
            let windows = Arc::new(FakeWindows::new(vec![editor_window(42)]));
            let capturer = Arc::new(FakeCapturer::new(clock.clone()));
            let recognizer = Arc::new(ScriptedRecognizer::new());
            let injector = Arc::new(RecordingInjector::new());

            let monitor = Monitor::new(
                &config,
                MonitorParts {
                    windows: windows.clone(),
                    capturer: capturer.clone(),
                    recognizer: recognizer.clone(),
                    injector: injector.clone(),
                    clock: clock.clone(),
                },
            );

            Self {
                monitor,
                clock,
                windows,
                capturer,
                recognizer,
                injector,
            }
        }

        /// One cycle, then one poll interval of sleep.
        async fn step(&mut self) -> CycleReport {
            let report = self.monitor.tick().await;
            self.clock.advance(POLL);
            report
        }

        async fn steps(&mut self, n: usize) -> Vec<CycleReport> {
            let mut reports = Vec::with_capacity(n);
            for _ in 0..n {
                reports.push(self.step().await);
            }
            reports
        }
    }

    fn sent(reports: &[CycleReport]) -> usize {
        reports
            .iter()
            .filter(|r| matches!(r.action, ActionOutcome::Sent { .. }))
            .count()
    }

    #[tokio::test]
    async fn sustained_stall_sends_one_resume() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("Copilot\nResponse stopped.");

        // 50s of stall, dwell 10s, cooldown 60s
        let reports = rig.steps(11).await;

        assert_eq!(sent(&reports), 1);
        assert_eq!(reports[2].action, ActionOutcome::Sent { attempt: 1, forced: false });

        let commands = rig.injector.sent();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].text_payload, "continue");
        assert_eq!(commands[0].window_id, Some(42));
        assert_eq!(
            commands[0].target_region,
            CaptureRegion::new(800, 792, 800, 108)
        );
    }

    #[tokio::test]
    async fn stall_that_clears_before_dwell_sends_nothing() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("Request stopped");
        rig.recognizer.push_text("Request stopped");
        rig.recognizer.push_text("Generating answer");

        let reports = rig.steps(6).await;
        assert_eq!(sent(&reports), 0);
        assert!(rig.injector.sent().is_empty());
        assert!(rig.monitor.episode().is_none());
    }

    #[tokio::test]
    async fn cooldown_allows_second_resume() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("You hit the rate limit");

        // 0..=75s: first send at 10s, second at 70s
        let reports = rig.steps(16).await;

        let attempts: Vec<u32> = reports
            .iter()
            .filter_map(|r| match r.action {
                ActionOutcome::Sent { attempt, .. } => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, [1, 2]);
        assert_eq!(
            rig.monitor.episode().unwrap().consecutive_stall_count,
            2
        );
    }

    #[tokio::test]
    async fn capture_gap_keeps_episode_open() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("stopped");

        rig.step().await;
        let id = rig.monitor.episode().unwrap().id;

        rig.capturer
            .fail_next(CaptureError::Backend("display asleep".into()));
        let gap = rig.step().await;
        assert!(matches!(
            gap.outcome,
            CycleOutcome::Skipped(SkipReason::Capture(_))
        ));
        assert_eq!(gap.episode.as_ref().unwrap().id, id);

        // t = 10s: dwell met, second distinct sample arrives
        let next = rig.step().await;
        assert_eq!(next.action, ActionOutcome::Sent { attempt: 1, forced: false });
        assert_eq!(next.episode.unwrap().id, id);
    }

    #[tokio::test]
    async fn missing_window_skips_without_touching_episode() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("stopped");
        rig.step().await;

        rig.windows.set(vec![]);
        let report = rig.step().await;
        assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::WindowNotFound));
        assert!(report.episode.is_some());

        rig.windows.set(vec![editor_window(42)]);
        assert_eq!(sent(&[rig.step().await]), 1);
    }

    #[tokio::test]
    async fn fatal_recognition_error_pauses_until_resumed() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("stopped");
        rig.recognizer
            .push_error(RecognitionError::Unavailable("tesseract not found".into()));

        rig.step().await;
        let paused = rig.step().await;
        assert!(matches!(paused.outcome, CycleOutcome::Paused { .. }));
        assert!(rig.monitor.is_paused());

        let calls = rig.recognizer.calls();
        let idle = rig.steps(10).await;
        assert!(idle.iter().all(|r| r.outcome == CycleOutcome::Idle));
        assert_eq!(rig.recognizer.calls(), calls);
        assert!(rig.injector.sent().is_empty());
        assert!(!rig.monitor.request_resume_action());

        assert!(rig.monitor.resume());
        // episode survived the pause and is long past its dwell
        let back = rig.step().await;
        assert_eq!(back.outcome, CycleOutcome::Classified);
        assert_eq!(sent(&[back]), 1);
    }

    #[tokio::test]
    async fn transient_recognition_error_only_skips() {
        let mut rig = Rig::new();
        rig.recognizer
            .push_error(RecognitionError::Engine("garbled frame".into()));
        let report = rig.step().await;
        assert!(matches!(
            report.outcome,
            CycleOutcome::Skipped(SkipReason::Recognition(_))
        ));
        assert!(!rig.monitor.is_paused());
    }

    #[tokio::test]
    async fn failed_send_waits_for_cooldown() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("stopped");
        rig.injector.fail_next(ActionError::FocusLost);

        let reports = rig.steps(14).await;
        assert!(matches!(
            reports[2].action,
            ActionOutcome::Failed { attempt: 1, .. }
        ));
        // no retry inside the cooldown; the re-armed attempt lands at 70s
        assert_eq!(sent(&reports), 0);
        assert_eq!(rig.injector.sent().len(), 1);

        let retry = rig.step().await;
        assert_eq!(retry.action, ActionOutcome::Sent { attempt: 2, forced: false });
    }

    #[tokio::test]
    async fn marker_precedence_and_no_change_fallback() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("Thinking... stopped");
        let first = rig.step().await;
        assert_eq!(
            first.classification.unwrap().state,
            ConversationState::Stalled
        );

        let mut rig = Rig::new();
        rig.recognizer.push_text("All tests pass.");
        let reports = rig.steps(3).await;
        let states: Vec<_> = reports
            .iter()
            .map(|r| r.classification.as_ref().unwrap().state)
            .collect();
        assert_eq!(
            states,
            [
                ConversationState::Unknown,
                ConversationState::Unknown,
                ConversationState::Stalled
            ]
        );
        assert_eq!(
            reports[2].classification.as_ref().unwrap().evidence,
            Evidence::NoChange { cycles: 3 }
        );
    }

    #[tokio::test]
    async fn forced_send_goes_out_once() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("Generating");
        assert!(rig.monitor.request_resume_action());

        let reports = rig.steps(3).await;
        assert_eq!(reports[0].action, ActionOutcome::Sent { attempt: 0, forced: true });
        assert_eq!(rig.injector.sent().len(), 1);
    }

    #[tokio::test]
    async fn forced_send_during_a_stall_starts_the_cooldown() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("Response stopped");

        rig.step().await;
        assert!(rig.monitor.request_resume_action());
        // forced at 5s; the automatic resume would otherwise fire at 10s
        let reports = rig.steps(14).await;

        let sends: Vec<_> = reports
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r.action, ActionOutcome::Sent { .. }))
            .map(|(i, r)| (i, r.action.clone()))
            .collect();
        assert_eq!(
            sends,
            [
                (0, ActionOutcome::Sent { attempt: 1, forced: true }),
                (12, ActionOutcome::Sent { attempt: 2, forced: false }),
            ]
        );
        assert_eq!(rig.injector.sent().len(), 2);
    }

    #[tokio::test]
    async fn disabled_auto_send_keeps_watching_without_sending() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("Response stopped");
        assert!(rig.monitor.set_auto_send(false));
        assert!(!rig.monitor.set_auto_send(false));

        let reports = rig.steps(4).await;
        assert_eq!(sent(&reports), 0);
        assert!(rig.injector.sent().is_empty());
        assert_eq!(reports[2].action, ActionOutcome::Suppressed { attempt: 1 });
        assert!(reports
            .iter()
            .all(|r| r.outcome == CycleOutcome::Classified));
        assert!(rig.monitor.episode().is_some());

        // operator sends still go out while automatic ones are off
        assert!(rig.monitor.request_resume_action());
        assert_eq!(
            rig.step().await.action,
            ActionOutcome::Sent { attempt: 1, forced: true }
        );

        let mut rig = Rig::new();
        rig.recognizer.push_text("Response stopped");
        rig.monitor.set_auto_send(false);
        rig.steps(3).await;
        assert!(rig.monitor.set_auto_send(true));
        assert_eq!(
            rig.step().await.action,
            ActionOutcome::Sent { attempt: 1, forced: false }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_recognizer_times_out_and_keeps_episode() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("stopped");
        rig.recognizer.push_hang();

        rig.step().await;
        let id = rig.monitor.episode().unwrap().id;

        let hung = rig.step().await;
        match &hung.outcome {
            CycleOutcome::Skipped(SkipReason::Recognition(e)) => {
                assert!(e.contains("timed out"), "{e}")
            }
            other => panic!("expected a recognition skip, got {other:?}"),
        }
        assert!(!rig.monitor.is_paused());
        assert_eq!(hung.episode.as_ref().unwrap().id, id);
        assert_eq!(hung.action, ActionOutcome::NotAttempted);

        let next = rig.step().await;
        assert_eq!(next.action, ActionOutcome::Sent { attempt: 1, forced: false });
        assert_eq!(next.episode.unwrap().id, id);
    }

    #[tokio::test]
    async fn window_enumeration_failure_skips_and_keeps_episode() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("stopped");
        rig.step().await;
        let id = rig.monitor.episode().unwrap().id;

        rig.windows
            .fail(LocateError::Enumeration("display server went away".into()));
        let report = rig.step().await;
        assert_eq!(
            report.outcome,
            CycleOutcome::Skipped(SkipReason::Locate(
                "window enumeration failed: display server went away".into()
            ))
        );
        assert_eq!(report.episode.unwrap().id, id);
        assert_eq!(rig.recognizer.calls(), 1);

        rig.windows.set(vec![editor_window(42)]);
        assert_eq!(sent(&[rig.step().await]), 1);
    }

    #[tokio::test]
    async fn low_confidence_lines_are_reported() {
        let mut rig = Rig::new();
        let mut result = crate::testing::text_result("Here you go");
        result.lines.push(stallwatch_types::RecognizedLine {
            text: "st0pped?".into(),
            confidence: 0.1,
            bounds: CaptureRegion::new(0, 40, 100, 18),
        });
        rig.recognizer.push_result(result);

        let report = rig.step().await;
        assert_eq!(report.rejected_lines, ["st0pped?"]);
        assert_eq!(
            report.classification.unwrap().state,
            ConversationState::Unknown
        );
    }

    #[tokio::test]
    async fn window_move_updates_capture_region() {
        let mut rig = Rig::new();
        rig.recognizer.push_text("hello");
        rig.step().await;
        assert_eq!(
            rig.monitor.current_region(),
            Some(CaptureRegion::new(800, 0, 800, 900))
        );

        let mut moved = editor_window(42);
        moved.bounds = CaptureRegion::new(100, 100, 1000, 700);
        rig.windows.set(vec![moved]);
        rig.step().await;
        assert_eq!(
            rig.monitor.current_region(),
            Some(CaptureRegion::new(600, 100, 500, 700))
        );
        assert_eq!(rig.capturer.captures().len(), 2);
    }
}
