use stallwatch_core::RecognitionError;

/// RAII guard for COM initialization on the current thread.
///
/// Windows OCR objects are created and used on blocking-pool threads, so
/// each recognition call holds one of these for its duration.
pub struct ComGuard;

impl ComGuard {
    pub fn initialize() -> Result<Self, RecognitionError> {
        unsafe {
            windows::Win32::System::Com::CoInitializeEx(
                Some(std::ptr::null()),
                windows::Win32::System::Com::COINIT_MULTITHREADED,
            )
            .ok()
            .map_err(|e| RecognitionError::Unavailable(format!("COM initialization failed: {e}")))?;
        }
        Ok(ComGuard)
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            windows::Win32::System::Com::CoUninitialize();
        }
    }
}
