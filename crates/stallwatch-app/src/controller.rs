use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use stallwatch_config::Config;
use stallwatch_core::Monitor;
use stallwatch_types::{ControlEvent, CycleReport};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::control::{hotkey_watcher, spawn_stdin_reader};
use crate::driver::run_monitor;
use crate::report::report_loop;
use crate::status::AppStatus;

/// Centralized channel management
pub struct ChannelSet {
    pub reports: (AsyncSender<CycleReport>, AsyncReceiver<CycleReport>),
    pub control: (AsyncSender<ControlEvent>, AsyncReceiver<ControlEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            reports: kanal::bounded_async(64),
            control: kanal::bounded_async(16),
        }
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    config: Arc<Config>,
    status: Arc<AppStatus>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(config: Config) -> Self {
        Self {
            channels: ChannelSet::new(),
            config: Arc::new(config),
            status: Arc::new(AppStatus::new()),
            cancel_token: CancellationToken::new(),
        }
    }

    /// The driver task finishes first on a clean stop; everything else runs
    /// until `shutdown`.
    pub fn spawn_tasks(&self, monitor: Monitor) -> anyhow::Result<JoinSet<anyhow::Result<()>>> {
        let mut tasks = JoinSet::new();

        tasks.spawn(run_monitor(
            monitor,
            self.config.monitor.poll_interval(),
            self.cancel_token.child_token(),
            self.channels.reports.0.clone(),
            self.channels.control.1.clone(),
            self.status.clone(),
        ));

        tasks.spawn(report_loop(
            self.channels.reports.1.clone(),
            self.cancel_token.child_token(),
        ));

        if self.config.monitor.resume_hotkey {
            tasks.spawn(hotkey_watcher(
                self.channels.control.0.clone(),
                self.cancel_token.child_token(),
            ));
        }

        spawn_stdin_reader(self.channels.control.0.clone())?;

        Ok(tasks)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
