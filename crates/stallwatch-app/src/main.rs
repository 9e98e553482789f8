use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use stallwatch_core::WindowSource;
use stallwatch_core::locator::RegionLocator;
use stallwatch_host::{KeepAwake, XcapScreen};
use tokio::signal;
use tracing_subscriber::EnvFilter;

mod backends;
mod control;
mod controller;
mod driver;
mod profile;
mod report;
mod status;


use self::controller::AppController;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Watches an AI chat panel and types a resume message when it stalls.
#[derive(Debug, Parser)]
#[command(name = "stallwatch", version)]
struct Args {
    /// Config file; defaults to <config dir>/stallwatch/config.json.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print visible windows and which one would be monitored, then exit.
    #[arg(long)]
    list_windows: bool,

    /// Run a single cycle, print its report as JSON, then exit.
    #[arg(long)]
    once: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stallwatch=info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(atty::is(atty::Stream::Stdout))
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_logging(args.log_format);

    let (config, _) = profile::load_config(args.config.as_deref())?;

    if args.list_windows {
        return list_windows(&config).await;
    }

    let mut monitor = backends::build_monitor(&config).await?;

    if args.once {
        let report = monitor.tick().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let _awake = if config.monitor.prevent_sleep {
        KeepAwake::acquire()
            .inspect_err(|e| tracing::warn!("Could not prevent sleep: {e:#}"))
            .ok()
    } else {
        None
    };

    tracing::info!(
        "Watching windows titled \"{}\"; {}",
        config.window.window_title_substring,
        control::HELP
    );

    let controller = AppController::new(config);
    let mut tasks = controller.spawn_tasks(monitor)?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => match result {
            Ok(Ok(())) => tracing::debug!("monitor task finished"),
            Ok(Err(e)) => tracing::error!("task failed: {e:#}"),
            Err(e) => tracing::error!("task panicked: {e}"),
        }
    }

    controller.shutdown();
    while let Ok(Some(result)) = tokio::time::timeout(SHUTDOWN_GRACE, tasks.join_next()).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task failed during shutdown: {e:#}"),
            Err(e) => tracing::error!("task panicked during shutdown: {e}"),
        }
    }

    Ok(())
}

async fn list_windows(config: &stallwatch_config::Config) -> anyhow::Result<()> {
    let screen = Arc::new(XcapScreen::new());
    let windows = screen
        .windows()
        .await
        .context("Failed to enumerate windows")?;
    let locator = RegionLocator::new(screen, &config.window);
    let chosen = locator.select(&windows).map(|w| w.id);

    for w in &windows {
        let marker = if Some(w.id) == chosen { "*" } else { " " };
        let state = if w.minimized { " (minimized)" } else { "" };
        println!(
            "{marker} {:>10}  {:>5}x{:<5} at ({}, {}){state}  {}",
            w.id, w.bounds.width, w.bounds.height, w.bounds.x, w.bounds.y, w.title
        );
    }
    if chosen.is_none() {
        println!(
            "no window matches \"{}\"",
            config.window.window_title_substring
        );
    }
    Ok(())
}
