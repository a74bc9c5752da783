//! Unsupported platform implementation.
//!
//! Neither OS channel exists; adapters report themselves unavailable.

use crate::error::{Result, SinkError};

/// Attached-debugger sink. Unavailable on this platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebuggerSink;

impl DebuggerSink {
    pub(crate) const fn is_supported() -> bool {
        false
    }

    /// Always fails with [`SinkError::Unavailable`].
    pub fn send(&self, _message: &str) -> Result<()> {
        Err(SinkError::unavailable("no debugger channel on this platform"))
    }
}

/// Process Monitor sink. Unavailable on this platform.
#[derive(Debug)]
pub struct ProcessMonitorSink {
    _private: (),
}

impl ProcessMonitorSink {
    /// Always fails with [`SinkError::Unavailable`].
    pub fn open() -> Result<Self> {
        Err(SinkError::unavailable("Process Monitor requires Windows"))
    }

    /// Always fails with [`SinkError::Unavailable`].
    pub fn send(&self, _message: &str) -> Result<()> {
        Err(SinkError::unavailable("Process Monitor requires Windows"))
    }
}
