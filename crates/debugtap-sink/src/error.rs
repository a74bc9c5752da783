//! Sink error types.

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors raised by the concrete sink adapters.
///
/// The [`Sink`](crate::Sink) facade never returns these to its caller; they
/// are only visible through the adapters' `send()` methods.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The OS sink could not be reached.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The message contains a NUL character and cannot be passed as a
    /// C string.
    #[error("message contains an interior NUL character")]
    InteriorNul,

    /// The OS call itself failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
