//! Monitor driver against in-memory capabilities and real channels.

use std::sync::Arc;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use stallwatch_config::Config;
use stallwatch_core::testing::{
    FakeCapturer, FakeWindows, RecordingInjector, ScriptedRecognizer, editor_window,
};
use stallwatch_core::{ManualClock, Monitor, MonitorParts, RecognitionError};
use stallwatch_types::{ActionOutcome, ControlEvent, CycleOutcome, CycleReport};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::driver::run_monitor;
use crate::status::AppStatus;

const FAST: Duration = Duration::from_millis(20);
const NEVER: Duration = Duration::from_secs(3600);
const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

struct Harness {
    clock: Arc<ManualClock>,
    recognizer: Arc<ScriptedRecognizer>,
    injector: Arc<RecordingInjector>,
    reports_rx: AsyncReceiver<CycleReport>,
    control_tx: AsyncSender<ControlEvent>,
    cancel: CancellationToken,
    status: Arc<AppStatus>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(interval: Duration, script: impl FnOnce(&ScriptedRecognizer)) -> Self {
        let clock = Arc::new(ManualClock::new());
        let recognizer = Arc::new(ScriptedRecognizer::new());
        let injector = Arc::new(RecordingInjector::new());
        script(&recognizer);

        let monitor = Monitor::new(
            &Config::default(),
            MonitorParts {
                windows: Arc::new(FakeWindows::new(vec![editor_window(9)])),
                capturer: Arc::new(FakeCapturer::new(clock.clone())),
                recognizer: recognizer.clone(),
                injector: injector.clone(),
                clock: clock.clone(),
            },
        );

        let (reports_tx, reports_rx) = kanal::bounded_async(64);
        let (control_tx, control_rx) = kanal::bounded_async(16);
        let cancel = CancellationToken::new();
        let status = Arc::new(AppStatus::new());

        let task = tokio::spawn(run_monitor(
            monitor,
            interval,
            cancel.clone(),
            reports_tx,
            control_rx,
            status.clone(),
        ));

        Self {
            clock,
            recognizer,
            injector,
            reports_rx,
            control_tx,
            cancel,
            status,
            task,
        }
    }

    async fn next_report(&self) -> CycleReport {
        timeout(WAIT, self.reports_rx.recv())
            .await
            .expect("no report in time")
            .expect("report channel closed")
    }

    async fn assert_quiet(&self) {
        tokio::time::sleep(QUIET).await;
        assert!(
            matches!(self.reports_rx.try_recv(), Ok(None)),
            "driver ran a cycle it should not have"
        );
    }

    async fn finished(self) -> anyhow::Result<()> {
        timeout(WAIT, self.task)
            .await
            .expect("driver did not stop")
            .expect("driver panicked")
    }
}

#[tokio::test]
async fn ticks_on_interval_until_stop() {
    let h = Harness::start(FAST, |r| r.push_text("Generating a plan"));

    assert_eq!(h.next_report().await.cycle, 1);
    assert_eq!(h.next_report().await.cycle, 2);

    h.control_tx.send(ControlEvent::Stop).await.unwrap();
    assert!(h.finished().await.is_ok());
}

#[tokio::test]
async fn cancellation_is_seen_between_cycles() {
    let h = Harness::start(NEVER, |r| r.push_text("Generating"));

    let first = h.next_report().await;
    assert_eq!(first.outcome, CycleOutcome::Classified);

    h.cancel.cancel();
    let calls = h.recognizer.calls();
    assert!(h.finished().await.is_ok());
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn pause_holds_until_resume() {
    let h = Harness::start(FAST, |r| {
        r.push_error(RecognitionError::Unavailable("tesseract: not found".into()));
        r.push_text("Thinking");
    });

    let paused = h.next_report().await;
    assert!(matches!(paused.outcome, CycleOutcome::Paused { .. }));
    assert!(h.status.summary().await.starts_with("PAUSED"));

    h.assert_quiet().await;
    assert_eq!(h.recognizer.calls(), 1);

    // forced sends are refused while paused
    h.control_tx.send(ControlEvent::SendNow).await.unwrap();
    h.assert_quiet().await;

    h.control_tx.send(ControlEvent::Resume).await.unwrap();
    let resumed = h.next_report().await;
    assert_eq!(resumed.outcome, CycleOutcome::Classified);
    assert!(h.status.summary().await.starts_with("running"));
    assert!(h.injector.sent().is_empty());

    h.cancel.cancel();
    assert!(h.finished().await.is_ok());
}

#[tokio::test]
async fn send_now_runs_a_cycle_with_a_forced_resume() {
    let h = Harness::start(NEVER, |r| r.push_text("Generating"));
    h.next_report().await;

    h.control_tx.send(ControlEvent::SendNow).await.unwrap();
    let report = h.next_report().await;
    assert_eq!(
        report.action,
        ActionOutcome::Sent {
            attempt: 0,
            forced: true
        }
    );

    let sent = h.injector.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].window_id, Some(9));

    h.cancel.cancel();
    assert!(h.finished().await.is_ok());
}

#[tokio::test]
async fn status_request_does_not_run_a_cycle() {
    let h = Harness::start(NEVER, |r| r.push_text("Generating"));
    h.next_report().await;

    h.control_tx.send(ControlEvent::Status).await.unwrap();
    h.assert_quiet().await;
    assert!(h.status.summary().await.contains("cycles 1 classified 1"));

    h.control_tx.send(ControlEvent::Stop).await.unwrap();
    assert!(h.finished().await.is_ok());
}

// Paused time: the driver's sleeps only elapse while this test is awaiting,
// so each clock step lands between two cycles.
#[tokio::test(start_paused = true)]
async fn disabled_auto_send_holds_resumes_until_enabled() {
    let h = Harness::start(FAST, |r| r.push_text("Response stopped"));
    h.control_tx
        .send(ControlEvent::AutoSend(false))
        .await
        .unwrap();

    let mut actions = Vec::new();
    for _ in 0..4 {
        actions.push(h.next_report().await.action);
        h.clock.advance(Duration::from_secs(5));
    }
    assert_eq!(
        actions,
        [
            ActionOutcome::NotAttempted,
            ActionOutcome::NotAttempted,
            ActionOutcome::Suppressed { attempt: 1 },
            ActionOutcome::Suppressed { attempt: 1 },
        ]
    );
    assert!(h.injector.sent().is_empty());
    assert!(h.status.summary().await.contains("auto-send OFF"));

    h.control_tx
        .send(ControlEvent::AutoSend(true))
        .await
        .unwrap();
    let report = h.next_report().await;
    assert_eq!(
        report.action,
        ActionOutcome::Sent {
            attempt: 1,
            forced: false
        }
    );
    assert_eq!(h.injector.sent().len(), 1);
    assert!(!h.status.summary().await.contains("auto-send OFF"));

    h.control_tx.send(ControlEvent::Stop).await.unwrap();
    assert!(h.finished().await.is_ok());
}
