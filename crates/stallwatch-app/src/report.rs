use kanal::AsyncReceiver;
use stallwatch_types::{ActionOutcome, ConversationState, CycleOutcome, CycleReport};
use tokio_util::sync::CancellationToken;

/// Turns cycle reports into the log narrative.
pub async fn report_loop(
    reports_rx: AsyncReceiver<CycleReport>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut reporter = Reporter::default();
    loop {
        let report = tokio::select! {
            _ = cancel.cancelled() => break,
            report = reports_rx.recv() => report,
        };
        match report {
            Ok(report) => reporter.log(&report),
            Err(_) => break,
        }
    }
    // flush what the driver sent before it stopped
    while let Ok(Some(report)) = reports_rx.try_recv() {
        reporter.log(&report);
    }
    Ok(())
}

#[derive(Default)]
pub struct Reporter {
    last_state: Option<ConversationState>,
}

impl Reporter {
    pub fn log(&mut self, report: &CycleReport) {
        match &report.outcome {
            CycleOutcome::Classified => {}
            CycleOutcome::Skipped(reason) => {
                tracing::warn!("cycle {}: skipped, {}", report.cycle, reason);
            }
            CycleOutcome::Paused { reason } => {
                tracing::error!(
                    "cycle {}: monitoring PAUSED: {}. Fix the OCR setup, then type `resume` or press the resume hotkey",
                    report.cycle,
                    reason
                );
            }
            CycleOutcome::Idle => tracing::debug!("cycle {}: paused", report.cycle),
        }

        if let Some(c) = &report.classification {
            if self.state_changed(c.state) {
                tracing::info!("cycle {}: {} ({})", report.cycle, c.state, c.evidence);
            } else {
                tracing::debug!("cycle {}: {} ({})", report.cycle, c.state, c.evidence);
            }
            self.last_state = Some(c.state);
        }

        if !report.rejected_lines.is_empty() {
            tracing::debug!(
                "cycle {}: ignored {} low-confidence line(s): {:?}",
                report.cycle,
                report.rejected_lines.len(),
                report.rejected_lines
            );
        }

        let episode = report
            .episode
            .as_ref()
            .map(|e| e.id.to_string())
            .unwrap_or_default();
        match &report.action {
            ActionOutcome::NotAttempted => {}
            ActionOutcome::Sent { attempt, forced } => {
                if *forced {
                    tracing::info!("cycle {}: resume sent on request", report.cycle);
                } else {
                    tracing::info!(
                        "cycle {}: resume sent (attempt {}, stall {})",
                        report.cycle,
                        attempt,
                        episode
                    );
                }
            }
            ActionOutcome::Suppressed { attempt } => {
                tracing::info!(
                    "cycle {}: resume attempt {} held, auto-send is off (stall {})",
                    report.cycle,
                    attempt,
                    episode
                );
            }
            ActionOutcome::Failed {
                attempt, error, ..
            } => {
                tracing::warn!(
                    "cycle {}: resume attempt {} failed: {} (stall {})",
                    report.cycle,
                    attempt,
                    error,
                    episode
                );
            }
        }
    }

    fn state_changed(&self, state: ConversationState) -> bool {
        self.last_state != Some(state)
    }
}
