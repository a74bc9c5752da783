//! Windows sink adapters.

use std::io;
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle};
use std::ptr;

use windows_sys::Win32::Foundation::{GENERIC_READ, GENERIC_WRITE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};
use windows_sys::Win32::System::Diagnostics::Debug::OutputDebugStringW;
use windows_sys::Win32::System::IO::DeviceIoControl;

use crate::error::{Result, SinkError};
use crate::sys::{PROCMON_DEBUG_OUT, PROCMON_DEVICE_PATH, to_wide, wide_byte_len};

/// Writes to the attached debugger through `OutputDebugStringW`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebuggerSink;

impl DebuggerSink {
    /// The debugger channel always exists on Windows.
    pub(crate) const fn is_supported() -> bool {
        true
    }

    /// Sends one message to the debugger.
    ///
    /// # Errors
    /// Returns [`SinkError::InteriorNul`] if the message cannot be encoded.
    pub fn send(&self, message: &str) -> Result<()> {
        let wide = to_wide(message).ok_or(SinkError::InteriorNul)?;
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        unsafe { OutputDebugStringW(wide.as_ptr()) };
        Ok(())
    }
}

/// Writes to the Process Monitor log through its driver device.
#[derive(Debug)]
pub struct ProcessMonitorSink {
    device: OwnedHandle,
}

impl ProcessMonitorSink {
    /// Opens the Process Monitor device.
    ///
    /// # Errors
    /// Returns [`SinkError::Unavailable`] if Process Monitor is not running.
    pub fn open() -> Result<Self> {
        let path: Vec<u16> = PROCMON_DEVICE_PATH
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: `path` is NUL-terminated; all pointer arguments are valid or null.
        let handle = unsafe {
            CreateFileW(
                path.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                ptr::null(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE || handle.is_null() {
            let e = io::Error::last_os_error();
            return Err(SinkError::unavailable(format!(
                "cannot open {PROCMON_DEVICE_PATH}: {e}"
            )));
        }

        // SAFETY: `handle` is a freshly opened, owned device handle.
        let device = unsafe { OwnedHandle::from_raw_handle(handle) };
        Ok(Self { device })
    }

    /// Sends one message to the Process Monitor log.
    ///
    /// # Errors
    /// Returns an error if the message cannot be encoded or the driver
    /// rejects the request.
    pub fn send(&self, message: &str) -> Result<()> {
        let wide = to_wide(message).ok_or(SinkError::InteriorNul)?;
        let len = u32::try_from(wide_byte_len(&wide))
            .map_err(|_| SinkError::Io(io::Error::other("message too large")))?;
        let mut returned = 0u32;

        // SAFETY: the input buffer is valid for `len` bytes; no output buffer.
        let ok = unsafe {
            DeviceIoControl(
                self.device.as_raw_handle(),
                PROCMON_DEBUG_OUT,
                wide.as_ptr().cast(),
                len,
                ptr::null_mut(),
                0,
                &raw mut returned,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(SinkError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }
}
