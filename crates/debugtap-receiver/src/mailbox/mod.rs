//! The single-slot mailbox: one shared segment plus the ready/data signals.
//!
//! [`Mailbox`] is the seam between the receive loop and the OS objects.
//! [`SharedSegment`] binds the real `DBWIN_*` objects; [`MemoryMailbox`]
//! is an in-process stand-in with the same auto-reset semantics.

use std::time::Duration;

use crate::error::Result;

mod memory;

#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
mod unsupported;

pub use memory::{MailboxEvent, MemoryMailbox};

#[cfg(windows)]
pub use self::windows::SharedSegment;

#[cfg(not(windows))]
pub use unsupported::SharedSegment;

/// Outcome of a bounded wait on the data-ready signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A producer deposited a record.
    Signaled,
    /// Nobody wrote within the timeout.
    TimedOut,
}

/// Consumer half of the mailbox protocol.
///
/// Exactly one reader may drive a mailbox. Implementations must be usable
/// from a blocking thread while the loop awaits elsewhere.
pub trait Mailbox: Send + Sync + 'static {
    /// Asserts the ready signal: the slot may be written.
    ///
    /// # Errors
    /// Returns [`ReceiverError::SignalFailure`](crate::ReceiverError::SignalFailure)
    /// if the signal cannot be set.
    fn signal_ready(&self) -> Result<()>;

    /// Waits up to `timeout` for the data-ready signal.
    ///
    /// # Errors
    /// Returns [`ReceiverError::SignalFailure`](crate::ReceiverError::SignalFailure)
    /// if the wait itself fails. A timeout is not an error.
    fn wait_for_data(&self, timeout: Duration) -> Result<WaitOutcome>;

    /// Copies the segment into `buf`, returning the number of bytes copied.
    fn read_segment(&self, buf: &mut [u8]) -> usize;

    /// Releases the OS objects.
    ///
    /// Idempotent: the first call releases everything and returns the first
    /// error encountered; later calls return `Ok(())`.
    ///
    /// # Errors
    /// Returns the first release failure.
    fn release(&self) -> Result<()>;
}
