//! In-process mailbox.
//!
//! Models the segment and both auto-reset signals in memory, so the receive
//! loop can run without the OS objects. The producer side mirrors what
//! `OutputDebugString` does: wait for ready, write the record, raise
//! data-ready. Every consumer call is logged for protocol-order assertions.

use std::io;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Mailbox, WaitOutcome};
use crate::codec::{self, SEGMENT_SIZE};
use crate::error::{ReceiverError, Result};

/// A consumer-side call observed by a [`MemoryMailbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxEvent {
    /// The ready signal was asserted.
    Ready,
    /// Asserting the ready signal failed.
    ReadyFailed,
    /// A wait returned because data was signaled.
    DataSignaled,
    /// A wait timed out.
    TimedOut,
    /// A wait failed.
    WaitFailed,
    /// The segment was read.
    Read,
    /// The mailbox was released.
    Released,
}

struct State {
    segment: Box<[u8]>,
    buffer_ready: bool,
    data_ready: bool,
    events: Vec<MailboxEvent>,
    ready_calls: usize,
    wait_calls: usize,
    release_calls: usize,
    fail_ready_on: Option<usize>,
    fail_wait_on: Option<usize>,
    released: bool,
}

/// In-process stand-in for the shared segment and its signals.
pub struct MemoryMailbox {
    state: Mutex<State>,
    buffer_ready_cv: Condvar,
    data_ready_cv: Condvar,
}

impl Default for MemoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMailbox {
    /// Creates an empty mailbox with both signals reset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                segment: vec![0; SEGMENT_SIZE].into_boxed_slice(),
                buffer_ready: false,
                data_ready: false,
                events: Vec::new(),
                ready_calls: 0,
                wait_calls: 0,
                release_calls: 0,
                fail_ready_on: None,
                fail_wait_on: None,
                released: false,
            }),
            buffer_ready_cv: Condvar::new(),
            data_ready_cv: Condvar::new(),
        }
    }

    /// Makes the `n`th ready assertion (1-based) fail.
    #[must_use]
    pub fn fail_ready_on(self, n: usize) -> Self {
        self.state.lock().fail_ready_on = Some(n);
        self
    }

    /// Makes the `n`th wait (1-based) fail.
    #[must_use]
    pub fn fail_wait_on(self, n: usize) -> Self {
        self.state.lock().fail_wait_on = Some(n);
        self
    }

    /// Deposits a record like a producer would.
    ///
    /// Waits up to `timeout` for the ready signal, consuming it. Returns
    /// `Ok(false)` if the receiver never signaled readiness.
    ///
    /// # Errors
    /// Returns an error if the record cannot be encoded.
    pub fn deposit(&self, pid: u32, text: &str, timeout: Duration) -> Result<bool> {
        let mut record = vec![0; SEGMENT_SIZE];
        let len = codec::encode(pid, text, &mut record)?;
        Ok(self.deposit_raw(&record[..len], timeout))
    }

    /// Deposits raw bytes into the segment, truncated to its size.
    ///
    /// Same handshake as [`deposit`](Self::deposit); no encoding is applied,
    /// so malformed records can be produced.
    pub fn deposit_raw(&self, bytes: &[u8], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.buffer_ready {
            if self
                .buffer_ready_cv
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        if !state.buffer_ready {
            return false;
        }
        state.buffer_ready = false;

        let len = bytes.len().min(SEGMENT_SIZE);
        state.segment[..len].copy_from_slice(&bytes[..len]);
        state.data_ready = true;
        self.data_ready_cv.notify_one();
        true
    }

    /// Returns true if the ready signal is currently set.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.lock().buffer_ready
    }

    /// Returns every consumer call observed so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<MailboxEvent> {
        self.state.lock().events.clone()
    }

    /// Number of successful ready assertions.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.count(MailboxEvent::Ready)
    }

    /// Number of timed-out waits.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.count(MailboxEvent::TimedOut)
    }

    /// Number of `release` calls, including no-op repeats.
    #[must_use]
    pub fn release_calls(&self) -> usize {
        self.state.lock().release_calls
    }

    /// Returns true once the mailbox has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    fn count(&self, event: MailboxEvent) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| **e == event)
            .count()
    }
}

impl Mailbox for MemoryMailbox {
    fn signal_ready(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ready_calls += 1;
        if state.released || state.fail_ready_on == Some(state.ready_calls) {
            state.events.push(MailboxEvent::ReadyFailed);
            return Err(ReceiverError::signal_failure(
                "set",
                io::Error::other("injected ready failure"),
            ));
        }
        state.buffer_ready = true;
        state.events.push(MailboxEvent::Ready);
        self.buffer_ready_cv.notify_one();
        Ok(())
    }

    fn wait_for_data(&self, timeout: Duration) -> Result<WaitOutcome> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        state.wait_calls += 1;
        if state.released || state.fail_wait_on == Some(state.wait_calls) {
            state.events.push(MailboxEvent::WaitFailed);
            return Err(ReceiverError::signal_failure(
                "wait",
                io::Error::other("injected wait failure"),
            ));
        }

        while !state.data_ready {
            if self
                .data_ready_cv
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        if state.data_ready {
            state.data_ready = false;
            state.events.push(MailboxEvent::DataSignaled);
            Ok(WaitOutcome::Signaled)
        } else {
            state.events.push(MailboxEvent::TimedOut);
            Ok(WaitOutcome::TimedOut)
        }
    }

    fn read_segment(&self, buf: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let len = buf.len().min(state.segment.len());
        buf[..len].copy_from_slice(&state.segment[..len]);
        state.events.push(MailboxEvent::Read);
        len
    }

    fn release(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.release_calls += 1;
        if !state.released {
            state.released = true;
            state.events.push(MailboxEvent::Released);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryMailbox")
            .field("buffer_ready", &state.buffer_ready)
            .field("data_ready", &state.data_ready)
            .field("events", &state.events.len())
            .field("released", &state.released)
            .finish()
    }
}
