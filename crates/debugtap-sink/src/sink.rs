//! The debug sink capability and its closed set of implementations.

use std::fmt;
use std::io;

use crate::error::Result;
use crate::platform::{DebuggerSink, ProcessMonitorSink};

/// A destination for short diagnostic strings.
///
/// Writes never block and, on success, always report the full input length.
pub trait DebugSink {
    /// Writes a byte buffer. Non-UTF-8 bytes are replaced before delivery.
    fn write(&self, buf: &[u8]) -> Result<usize>;

    /// Writes a string.
    fn write_str(&self, s: &str) -> Result<usize>;

    /// Formats and writes a message, returning the formatted length.
    fn print(&self, args: fmt::Arguments<'_>) -> Result<usize> {
        match args.as_str() {
            Some(s) => self.write_str(s),
            None => self.write_str(&args.to_string()),
        }
    }
}

/// Sink that performs no I/O and always succeeds.
///
/// Installed whenever no observer is configured or detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        Ok(buf.len())
    }

    fn write_str(&self, s: &str) -> Result<usize> {
        Ok(s.len())
    }
}

/// The selectable sink handed to code that wants to emit debug output.
///
/// Chosen once (see [`detect_sink`](crate::detect_sink)) and then passed
/// around by the caller. Errors from the underlying OS channel are logged at
/// `trace` level and swallowed: observability must never fail the caller.
#[derive(Debug, Default)]
pub enum Sink {
    /// No observer; every write is a successful no-op.
    #[default]
    Null,
    /// The attached-debugger channel (`OutputDebugStringW`).
    Debugger(DebuggerSink),
    /// The Process Monitor driver log.
    ProcessMonitor(ProcessMonitorSink),
}

impl Sink {
    /// Returns the attached-debugger sink, or [`Sink::Null`] on hosts without
    /// one.
    #[must_use]
    pub fn debugger() -> Self {
        if DebuggerSink::is_supported() {
            Self::Debugger(DebuggerSink)
        } else {
            Self::Null
        }
    }

    /// Returns the sink name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Debugger(_) => "debugger",
            Self::ProcessMonitor(_) => "procmon",
        }
    }

    /// Returns true if writes are discarded.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn deliver(&self, message: &str) {
        let result = match self {
            Self::Null => Ok(()),
            Self::Debugger(sink) => sink.send(message),
            Self::ProcessMonitor(sink) => sink.send(message),
        };
        if let Err(e) = result {
            tracing::trace!(sink = self.name(), error = %e, "debug sink write dropped");
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl DebugSink for Sink {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        if !self.is_null() {
            self.deliver(&String::from_utf8_lossy(buf));
        }
        Ok(buf.len())
    }

    fn write_str(&self, s: &str) -> Result<usize> {
        self.deliver(s);
        Ok(s.len())
    }
}

impl io::Write for &Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(DebugSink::write(*self, buf).unwrap_or(buf.len()))
    }

    // One formatted message per call, not one per format fragment.
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        DebugSink::print(*self, args)
            .map(drop)
            .map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        io::Write::write_fmt(&mut &*self, args)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
