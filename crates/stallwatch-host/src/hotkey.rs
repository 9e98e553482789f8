use anyhow::{Context, Result};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};

/// Global shortcut that lifts a paused monitor.
pub struct ResumeHotkey {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl ResumeHotkey {
    pub const LABEL: &'static str = "Ctrl+Shift+R";

    /// Register Ctrl+Shift+R.
    pub fn register() -> Result<Self> {
        Self::with_hotkey(Modifiers::CONTROL | Modifiers::SHIFT, Code::KeyR)
    }

    pub fn with_hotkey(modifiers: Modifiers, code: Code) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
        let hotkey = HotKey::new(Some(modifiers), code);

        manager
            .register(hotkey)
            .context("Failed to register hotkey")?;

        Ok(Self { manager, hotkey })
    }

    /// Drain pending hotkey events; true if ours was pressed (non-blocking).
    pub fn poll(&self) -> bool {
        let receiver = GlobalHotKeyEvent::receiver();
        let mut pressed = false;
        while let Ok(event) = receiver.try_recv() {
            if event.id == self.hotkey.id() && event.state == HotKeyState::Pressed {
                pressed = true;
            } else {
                tracing::trace!("ignoring hotkey event {:?}", event.id);
            }
        }
        pressed
    }
}

impl Drop for ResumeHotkey {
    fn drop(&mut self) {
        let _ = self.manager.unregister(self.hotkey);
    }
}
