use std::thread;
use std::time::Duration;

use arboard::Clipboard;
use async_trait::async_trait;
use stallwatch_config::InjectMethod;
use stallwatch_config::action::ActionConfig;
use stallwatch_core::{ActionError, InputInjector};
use stallwatch_types::{Ack, ActionCommand};

const FOCUS_SETTLE: Duration = Duration::from_millis(150);
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(80);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Focus(u32),
    Click { x: i32, y: i32 },
    Settle(Duration),
    ClearInput,
    Type(String),
    Paste(String),
    Submit,
}

/// Clicks the chat input box and types the resume text with synthetic input.
///
/// SendInput on Windows. Elsewhere rdev drives the mouse and keyboard, and
/// text always goes in through the clipboard since rdev cannot type
/// arbitrary characters.
pub struct KeyboardInjector {
    method: InjectMethod,
    clear_input: bool,
    keystroke_delay: Duration,
}

impl KeyboardInjector {
    pub fn new(config: &ActionConfig) -> Self {
        Self {
            method: config.method,
            clear_input: config.clear_input,
            keystroke_delay: config.keystroke_delay(),
        }
    }

    fn plan(&self, command: &ActionCommand) -> Vec<Step> {
        let (x, y) = command.target_region.center();
        let mut steps = Vec::with_capacity(7);

        if let Some(id) = command.window_id {
            steps.push(Step::Focus(id));
        }
        steps.push(Step::Click { x, y });
        steps.push(Step::Settle(FOCUS_SETTLE));
        if self.clear_input {
            steps.push(Step::ClearInput);
        }

        let text = command.text_payload.clone();
        match self.method {
            InjectMethod::Type if cfg!(windows) => steps.push(Step::Type(text)),
            _ => steps.push(Step::Paste(text)),
        }
        steps.push(Step::Submit);
        steps
    }
}

#[async_trait]
impl InputInjector for KeyboardInjector {
    async fn inject(&self, command: &ActionCommand) -> Result<Ack, ActionError> {
        let steps = self.plan(command);
        let window_id = command.window_id;
        let delay = self.keystroke_delay;
        let chars_sent = command.text_payload.chars().count();

        tokio::task::spawn_blocking(move || run_steps(&steps, window_id, delay))
            .await
            .map_err(|e| ActionError::Injection(e.to_string()))??;

        Ok(Ack { chars_sent })
    }
}

fn run_steps(steps: &[Step], window_id: Option<u32>, delay: Duration) -> Result<(), ActionError> {
    for step in steps {
        match step {
            Step::Focus(id) => {
                ensure_window_exists(*id)?;
                platform::focus(*id)?;
            }
            Step::Click { x, y } => platform::click(*x, *y)?,
            Step::Settle(d) => thread::sleep(*d),
            Step::ClearInput => {
                platform::select_all()?;
                platform::delete()?;
            }
            Step::Type(text) => {
                for ch in text.chars() {
                    platform::type_char(ch)?;
                    thread::sleep(delay);
                }
            }
            Step::Paste(text) => paste(text)?,
            Step::Submit => {
                if let Some(id) = window_id {
                    platform::ensure_focused(id)?;
                }
                platform::enter()?;
            }
        }
    }
    Ok(())
}

fn ensure_window_exists(id: u32) -> Result<(), ActionError> {
    let windows = crate::capture::list_windows()
        .map_err(|e| ActionError::Injection(format!("{e:#}")))?;
    if windows.iter().any(|w| w.id == id) {
        Ok(())
    } else {
        Err(ActionError::WindowGone)
    }
}

trait TextClipboard {
    fn get_text(&mut self) -> Option<String>;
    fn set_text(&mut self, text: String) -> Result<(), String>;
}

impl TextClipboard for Clipboard {
    fn get_text(&mut self) -> Option<String> {
        Clipboard::get_text(self).ok()
    }

    fn set_text(&mut self, text: String) -> Result<(), String> {
        Clipboard::set_text(self, text).map_err(|e| e.to_string())
    }
}

fn paste(text: &str) -> Result<(), ActionError> {
    let mut clipboard = Clipboard::new().map_err(|e| ActionError::Injection(e.to_string()))?;
    paste_with(&mut clipboard, text, CLIPBOARD_SETTLE, platform::paste_shortcut)
}

/// Paste through the clipboard. The previous text contents are put back
/// whether or not the shortcut went through.
fn paste_with(
    clipboard: &mut impl TextClipboard,
    text: &str,
    settle: Duration,
    shortcut: impl FnOnce() -> Result<(), ActionError>,
) -> Result<(), ActionError> {
    let previous = clipboard.get_text();

    clipboard
        .set_text(text.to_owned())
        .map_err(ActionError::Injection)?;
    thread::sleep(settle);
    let pasted = shortcut();
    if pasted.is_ok() {
        // let the target read the clipboard before it changes back
        thread::sleep(settle);
    }

    if let Some(previous) = previous
        && let Err(e) = clipboard.set_text(previous)
    {
        tracing::warn!("could not restore clipboard: {e}");
    }
    pasted
}

#[cfg(windows)]
mod platform {
    use std::ffi::c_void;
    use std::mem;
    use std::thread;
    use std::time::Duration;

    use stallwatch_core::ActionError;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT,
        KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEINPUT, SendInput, VIRTUAL_KEY, VK_A, VK_CONTROL, VK_DELETE, VK_RETURN, VK_V,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, SetCursorPos, SetForegroundWindow,
    };

    fn hwnd(id: u32) -> HWND {
        HWND(id as usize as *mut c_void)
    }

    fn send(inputs: &[INPUT]) -> Result<(), ActionError> {
        let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
        if sent as usize == inputs.len() {
            Ok(())
        } else {
            Err(ActionError::Injection(format!(
                "SendInput accepted {sent} of {} events",
                inputs.len()
            )))
        }
    }

    fn key(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn mouse(flags: windows::Win32::UI::Input::KeyboardAndMouse::MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn tap(vk: VIRTUAL_KEY) -> Result<(), ActionError> {
        send(&[
            key(vk, 0, KEYBD_EVENT_FLAGS(0)),
            key(vk, 0, KEYEVENTF_KEYUP),
        ])
    }

    fn ctrl(vk: VIRTUAL_KEY) -> Result<(), ActionError> {
        send(&[
            key(VK_CONTROL, 0, KEYBD_EVENT_FLAGS(0)),
            key(vk, 0, KEYBD_EVENT_FLAGS(0)),
            key(vk, 0, KEYEVENTF_KEYUP),
            key(VK_CONTROL, 0, KEYEVENTF_KEYUP),
        ])
    }

    pub fn focus(id: u32) -> Result<(), ActionError> {
        unsafe {
            let _ = SetForegroundWindow(hwnd(id));
        }
        thread::sleep(Duration::from_millis(50));
        ensure_focused(id)
    }

    pub fn ensure_focused(id: u32) -> Result<(), ActionError> {
        if unsafe { GetForegroundWindow() } == hwnd(id) {
            Ok(())
        } else {
            Err(ActionError::FocusLost)
        }
    }

    pub fn click(x: i32, y: i32) -> Result<(), ActionError> {
        unsafe {
            let _ = SetCursorPos(x, y);
        }
        send(&[mouse(MOUSEEVENTF_LEFTDOWN), mouse(MOUSEEVENTF_LEFTUP)])
    }

    pub fn select_all() -> Result<(), ActionError> {
        ctrl(VK_A)
    }

    pub fn delete() -> Result<(), ActionError> {
        tap(VK_DELETE)
    }

    pub fn paste_shortcut() -> Result<(), ActionError> {
        ctrl(VK_V)
    }

    pub fn enter() -> Result<(), ActionError> {
        tap(VK_RETURN)
    }

    pub fn type_char(ch: char) -> Result<(), ActionError> {
        let mut units = [0u16; 2];
        for &unit in ch.encode_utf16(&mut units).iter() {
            send(&[
                key(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                key(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
            ])?;
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod platform {
    use std::thread;
    use std::time::Duration;

    use rdev::{Button, EventType, Key, simulate};
    use stallwatch_core::ActionError;

    /// Gap between synthetic events; some platforms drop events sent back to back.
    const EVENT_GAP: Duration = Duration::from_millis(20);

    fn emit(event: EventType) -> Result<(), ActionError> {
        simulate(&event).map_err(|e| ActionError::Injection(format!("{event:?}: {e:?}")))?;
        thread::sleep(EVENT_GAP);
        Ok(())
    }

    fn tap(key: Key) -> Result<(), ActionError> {
        emit(EventType::KeyPress(key))?;
        emit(EventType::KeyRelease(key))
    }

    fn ctrl(key: Key) -> Result<(), ActionError> {
        let modifier = if cfg!(target_os = "macos") {
            Key::MetaLeft
        } else {
            Key::ControlLeft
        };
        emit(EventType::KeyPress(modifier))?;
        let pressed = tap(key);
        emit(EventType::KeyRelease(modifier))?;
        pressed
    }

    /// Clicking the input box is what focuses the window here.
    pub fn focus(_id: u32) -> Result<(), ActionError> {
        Ok(())
    }

    pub fn ensure_focused(_id: u32) -> Result<(), ActionError> {
        Ok(())
    }

    pub fn click(x: i32, y: i32) -> Result<(), ActionError> {
        emit(EventType::MouseMove {
            x: x as f64,
            y: y as f64,
        })?;
        emit(EventType::ButtonPress(Button::Left))?;
        emit(EventType::ButtonRelease(Button::Left))
    }

    pub fn select_all() -> Result<(), ActionError> {
        ctrl(Key::KeyA)
    }

    pub fn delete() -> Result<(), ActionError> {
        tap(Key::Delete)
    }

    pub fn paste_shortcut() -> Result<(), ActionError> {
        ctrl(Key::KeyV)
    }

    pub fn enter() -> Result<(), ActionError> {
        tap(Key::Return)
    }

    pub fn type_char(ch: char) -> Result<(), ActionError> {
        Err(ActionError::Unsupported(format!(
            "typing {ch:?} needs the paste method on this platform"
        )))
    }
}
