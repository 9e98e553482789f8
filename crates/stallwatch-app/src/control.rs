use std::io::BufRead;
use std::time::Duration;

use kanal::AsyncSender;
use stallwatch_host::ResumeHotkey;
use stallwatch_types::ControlEvent;
use tokio_util::sync::CancellationToken;

const HOTKEY_POLL: Duration = Duration::from_millis(50);

pub const HELP: &str = "commands: resume | status | send | enable | disable | quit";

/// One console line to a control event.
pub fn parse_command(line: &str) -> Option<ControlEvent> {
    match line.trim().to_lowercase().as_str() {
        "resume" | "r" => Some(ControlEvent::Resume),
        "status" | "s" => Some(ControlEvent::Status),
        "send" => Some(ControlEvent::SendNow),
        "enable" | "on" => Some(ControlEvent::AutoSend(true)),
        "disable" | "off" => Some(ControlEvent::AutoSend(false)),
        "quit" | "exit" | "q" => Some(ControlEvent::Stop),
        _ => None,
    }
}

fn forward(control_tx: &AsyncSender<ControlEvent>, event: ControlEvent) {
    match control_tx.try_send(event) {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Control queue full, dropped {:?}", event),
        Err(e) => tracing::warn!("Dropped {:?}: {}", event, e),
    }
}

/// Reads commands from stdin on a plain thread. Blocking reads there do not
/// hold up runtime shutdown; the thread dies with the process.
pub fn spawn_stdin_reader(control_tx: AsyncSender<ControlEvent>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(event) => forward(&control_tx, event),
                    None => tracing::warn!("Unknown command {:?}; {}", line.trim(), HELP),
                }
                if control_tx.is_closed() {
                    break;
                }
            }
            tracing::debug!("stdin closed");
        })?;
    Ok(())
}

/// Global resume hotkey. A registration failure is logged and the task
/// idles until shutdown; the console still works.
pub async fn hotkey_watcher(
    control_tx: AsyncSender<ControlEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let blocking_cancel = cancel.clone();
    let result =
        tokio::task::spawn_blocking(move || watch_hotkey(control_tx, blocking_cancel)).await?;

    if let Err(e) = result {
        tracing::warn!("Resume hotkey unavailable: {e:#}");
        cancel.cancelled().await;
    }
    Ok(())
}

fn watch_hotkey(
    control_tx: AsyncSender<ControlEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let hotkey = ResumeHotkey::register()?;
    tracing::info!("Resume hotkey registered ({})", ResumeHotkey::LABEL);

    while !cancel.is_cancelled() {
        if hotkey.poll() {
            tracing::info!("Resume hotkey pressed");
            forward(&control_tx, ControlEvent::Resume);
        }
        std::thread::sleep(HOTKEY_POLL);
    }

    tracing::debug!("Resume hotkey listener stopping");
    Ok(())
}
