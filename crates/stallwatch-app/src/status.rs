use std::fmt::Write;
use std::sync::Arc;
use std::time::SystemTime;

use stallwatch_types::{
    ActionOutcome, Classification, CycleOutcome, CycleReport, EpisodeSnapshot, SkipReason,
};
use tokio::sync::RwLock;

/// Running counters over every cycle report.
#[derive(Clone, Debug, Default)]
pub struct MonitorStatus {
    pub cycles: u64,
    pub classified: u64,
    pub skipped: u64,
    pub actions_sent: u64,
    pub actions_failed: u64,
    /// Resumes that were due while auto-send was off.
    pub actions_suppressed: u64,
    pub auto_send_off: bool,
    pub last_cycle_at: Option<SystemTime>,
    pub last_classification: Option<Classification>,
    pub last_skip: Option<SkipReason>,
    pub paused_reason: Option<String>,
    pub episode: Option<EpisodeSnapshot>,
}

impl MonitorStatus {
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles = report.cycle;
        self.last_cycle_at = Some(SystemTime::now());

        match &report.outcome {
            CycleOutcome::Classified => {
                self.classified += 1;
                self.last_classification = report.classification.clone();
                self.paused_reason = None;
            }
            CycleOutcome::Skipped(reason) => {
                self.skipped += 1;
                self.last_skip = Some(reason.clone());
                self.paused_reason = None;
            }
            CycleOutcome::Paused { reason } => self.paused_reason = Some(reason.clone()),
            CycleOutcome::Idle => {}
        }

        match report.action {
            ActionOutcome::Sent { .. } => self.actions_sent += 1,
            ActionOutcome::Failed { .. } => self.actions_failed += 1,
            ActionOutcome::Suppressed { .. } => self.actions_suppressed += 1,
            ActionOutcome::NotAttempted => {}
        }

        self.episode = report.episode.clone();
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        match &self.paused_reason {
            Some(reason) => {
                let _ = write!(out, "PAUSED ({reason})");
            }
            None => out.push_str("running"),
        }
        if self.auto_send_off {
            out.push_str(", auto-send OFF");
        }
        let _ = write!(
            out,
            " | cycles {} classified {} skipped {} | resumes sent {} failed {}",
            self.cycles, self.classified, self.skipped, self.actions_sent, self.actions_failed
        );
        if self.actions_suppressed > 0 {
            let _ = write!(out, " held {}", self.actions_suppressed);
        }
        if let Some(ago) = self.last_cycle_at.and_then(|at| at.elapsed().ok()) {
            let _ = write!(out, " | last cycle {:.0?} ago", ago);
        }
        if let Some(c) = &self.last_classification {
            let _ = write!(out, " | last: {} ({})", c.state, c.evidence);
        }
        if let Some(e) = &self.episode {
            let _ = write!(
                out,
                " | stall {} open {:.0?}, {} resume(s)",
                e.id, e.open_for, e.consecutive_stall_count
            );
        }
        out
    }
}

/// Application status
pub struct AppStatus {
    pub monitor: Arc<RwLock<MonitorStatus>>,
}

impl AppStatus {
    pub fn new() -> Self {
        Self {
            monitor: Arc::new(RwLock::new(MonitorStatus::default())),
        }
    }

    pub async fn record(&self, report: &CycleReport) {
        self.monitor.write().await.record(report);
    }

    pub async fn mark_resumed(&self) {
        self.monitor.write().await.paused_reason = None;
    }

    pub async fn set_auto_send(&self, enabled: bool) {
        self.monitor.write().await.auto_send_off = !enabled;
    }

    pub async fn summary(&self) -> String {
        self.monitor.read().await.summary()
    }
}

impl Default for AppStatus {
    fn default() -> Self {
        Self::new()
    }
}
