/// Keeps the machine and display awake while held.
///
/// Windows only; elsewhere acquiring succeeds and does nothing. The request
/// is per thread, so hold the guard on the thread that stays alive for the
/// whole run.
pub struct KeepAwake {
    _private: (),
}

impl KeepAwake {
    #[cfg(windows)]
    pub fn acquire() -> anyhow::Result<Self> {
        use windows::Win32::System::Power::{
            ES_CONTINUOUS, ES_DISPLAY_REQUIRED, ES_SYSTEM_REQUIRED, SetThreadExecutionState,
        };

        let previous = unsafe {
            SetThreadExecutionState(ES_CONTINUOUS | ES_SYSTEM_REQUIRED | ES_DISPLAY_REQUIRED)
        };
        anyhow::ensure!(previous.0 != 0, "SetThreadExecutionState failed");
        tracing::debug!("sleep prevention enabled");
        Ok(Self { _private: () })
    }

    #[cfg(not(windows))]
    pub fn acquire() -> anyhow::Result<Self> {
        tracing::debug!("sleep prevention is not supported on this platform");
        Ok(Self { _private: () })
    }
}

impl Drop for KeepAwake {
    fn drop(&mut self) {
        #[cfg(windows)]
        unsafe {
            windows::Win32::System::Power::SetThreadExecutionState(
                windows::Win32::System::Power::ES_CONTINUOUS,
            );
        }
    }
}
