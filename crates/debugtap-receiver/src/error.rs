//! Error types for debugtap-receiver.
//!
//! Receiver errors are never swallowed: acquisition failures are returned by
//! [`Receiver::start`](crate::Receiver::start), everything later terminates
//! the background loop and is returned by
//! [`Receiver::close`](crate::Receiver::close).

use std::io;

/// Result type alias for receiver operations.
pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Receiver error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// The shared segment or a named signal could not be created, opened or
    /// mapped.
    #[error("resource unavailable: {resource}: {source}")]
    ResourceUnavailable {
        /// Name of the OS object that could not be acquired.
        resource: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A record in the segment has no terminator within bounds.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Setting or waiting on a signal failed (a timeout is not a failure).
    #[error("signal failure during {operation}: {source}")]
    SignalFailure {
        /// The signal operation that failed.
        operation: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The consumer dropped the output channel.
    #[error("output channel closed by consumer")]
    OutputClosed,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The async runtime could not run the receiver loop.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ReceiverError {
    /// Creates a resource unavailable error.
    #[must_use]
    pub fn resource_unavailable(resource: impl Into<String>, source: io::Error) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
            source,
        }
    }

    /// Creates a malformed record error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Creates a signal failure error.
    #[must_use]
    pub const fn signal_failure(operation: &'static str, source: io::Error) -> Self {
        Self::SignalFailure { operation, source }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_unavailable_display() {
        let err = ReceiverError::resource_unavailable(
            "DBWIN_BUFFER",
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("resource unavailable"));
        assert!(msg.contains("DBWIN_BUFFER"));
    }

    #[test]
    fn test_malformed_display() {
        let err = ReceiverError::malformed("no terminator");
        assert!(err.to_string().contains("malformed record"));
    }

    #[test]
    fn test_signal_failure_display() {
        let err = ReceiverError::signal_failure("wait", io::Error::other("handle closed"));
        let msg = err.to_string();
        assert!(msg.contains("signal failure during wait"));
        assert!(msg.contains("handle closed"));
    }

    #[test]
    fn test_output_closed_display() {
        assert!(ReceiverError::OutputClosed.to_string().contains("output"));
    }

    #[test]
    fn test_config_error() {
        let err = ReceiverError::config("wait_timeout must be at least 1ms");
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let err = ReceiverError::signal_failure("set", io::Error::other("boom"));
        assert!(err.source().is_some());
    }
}
