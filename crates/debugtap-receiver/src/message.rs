//! Decoded debug message.

use std::fmt;

/// One message published by a producer process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebugMessage {
    /// Process id of the producer.
    pub pid: u32,
    /// Message text, without the terminator.
    pub text: String,
}

impl DebugMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(pid: u32, text: impl Into<String>) -> Self {
        Self {
            pid,
            text: text.into(),
        }
    }
}

impl fmt::Display for DebugMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pid, self.text.trim_end_matches(['\r', '\n']))
    }
}
