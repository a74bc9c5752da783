//! Unsupported platform implementation.
//!
//! The `DBWIN_*` objects only exist on Windows; opening always fails.

use std::io;
use std::time::Duration;

use super::{Mailbox, WaitOutcome};
use crate::config::{ChannelNames, ReceiverConfig};
use crate::error::{ReceiverError, Result};

/// The system-wide debug output segment. Unavailable on this platform.
#[derive(Debug)]
pub struct SharedSegment {
    names: ChannelNames,
}

impl SharedSegment {
    /// Always fails with [`ReceiverError::ResourceUnavailable`].
    pub fn open(config: &ReceiverConfig) -> Result<Self> {
        config.validate()?;
        let names = config.resolved_names();
        Err(ReceiverError::resource_unavailable(
            names.buffer,
            io::Error::new(
                io::ErrorKind::Unsupported,
                "debug output segment requires Windows",
            ),
        ))
    }

    /// Returns the resolved object names.
    #[must_use]
    pub const fn names(&self) -> &ChannelNames {
        &self.names
    }
}

impl Mailbox for SharedSegment {
    fn signal_ready(&self) -> Result<()> {
        Err(ReceiverError::signal_failure("set", unsupported()))
    }

    fn wait_for_data(&self, _timeout: Duration) -> Result<WaitOutcome> {
        Err(ReceiverError::signal_failure("wait", unsupported()))
    }

    fn read_segment(&self, _buf: &mut [u8]) -> usize {
        0
    }

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "requires Windows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_resource_unavailable() {
        let err = SharedSegment::open(&ReceiverConfig::default()).unwrap_err();
        assert!(matches!(err, ReceiverError::ResourceUnavailable { .. }));
        assert!(err.to_string().contains("DBWIN_BUFFER"));
    }

    #[test]
    fn test_open_validates_config_first() {
        let config = ReceiverConfig::builder().wait_timeout(Duration::ZERO).build();
        let err = SharedSegment::open(&config).unwrap_err();
        assert!(matches!(err, ReceiverError::Config(_)));
    }
}
