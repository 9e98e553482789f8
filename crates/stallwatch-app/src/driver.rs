use std::sync::Arc;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use stallwatch_core::Monitor;
use stallwatch_types::{ControlEvent, CycleReport};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::status::AppStatus;

enum Wake {
    Tick,
    Stop,
}

/// Drives the monitor: one cycle, then sleep until the next tick or an
/// operator request. Cycles always run to completion; cancellation and
/// control events are only looked at between them.
pub async fn run_monitor(
    mut monitor: Monitor,
    interval: Duration,
    cancel: CancellationToken,
    reports_tx: AsyncSender<CycleReport>,
    control_rx: AsyncReceiver<ControlEvent>,
    status: Arc<AppStatus>,
) -> anyhow::Result<()> {
    tracing::info!(
        "Monitoring every {:?} using {} OCR",
        interval,
        monitor.recognizer_name()
    );

    let mut controls_open = true;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let started = Instant::now();
        let report = monitor.tick().await;
        status.record(&report).await;
        if reports_tx.send(report).await.is_err() {
            tracing::warn!("report channel closed, stopping monitor");
            break;
        }

        // paused: no deadline, only an operator can wake us
        let deadline = (!monitor.is_paused()).then(|| started + interval);
        let wake = wait(
            &mut monitor,
            deadline,
            &cancel,
            &control_rx,
            &mut controls_open,
            &status,
        )
        .await;

        if let Wake::Stop = wake {
            break;
        }
    }

    tracing::info!("Monitor stopped");
    Ok(())
}

async fn wait(
    monitor: &mut Monitor,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
    control_rx: &AsyncReceiver<ControlEvent>,
    controls_open: &mut bool,
    status: &AppStatus,
) -> Wake {
    let sleep = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(sleep);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Wake::Stop,
            _ = &mut sleep => return Wake::Tick,
            event = control_rx.recv(), if *controls_open => event,
        };

        let Ok(event) = event else {
            tracing::debug!("control channel closed");
            *controls_open = false;
            continue;
        };

        match event {
            ControlEvent::Stop => {
                tracing::info!("Stop requested");
                cancel.cancel();
                return Wake::Stop;
            }
            ControlEvent::Resume => {
                if monitor.resume() {
                    status.mark_resumed().await;
                    tracing::info!("Monitoring resumed");
                    return Wake::Tick;
                }
                tracing::info!("Monitor is not paused");
            }
            ControlEvent::SendNow => {
                if monitor.request_resume_action() {
                    tracing::info!("Sending resume on this cycle");
                    return Wake::Tick;
                }
                tracing::warn!("Monitor is paused; resume it before sending");
            }
            ControlEvent::AutoSend(enabled) => {
                let state = if enabled { "on" } else { "off" };
                if monitor.set_auto_send(enabled) {
                    status.set_auto_send(enabled).await;
                    tracing::info!("Automatic resumes switched {state}");
                } else {
                    tracing::info!("Automatic resumes already {state}");
                }
            }
            ControlEvent::Status => {
                let region = monitor
                    .current_region()
                    .map(|r| format!("{}x{} at ({}, {})", r.width, r.height, r.x, r.y))
                    .unwrap_or_else(|| "none yet".to_string());
                tracing::info!("Status: {} | region {}", status.summary().await, region);
            }
        }
    }
}
