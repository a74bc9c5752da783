//! The rendezvous receiver.
//!
//! One background task per receiver drives the mailbox handshake:
//!
//! 1. assert ready (the slot may be written),
//! 2. wait on data-ready for at most `wait_timeout`,
//! 3. on data: decode the record and publish it on the output channel,
//! 4. check for shutdown, then go back to 1.
//!
//! Ready is never reasserted before the previous record has been decoded and
//! published, so the single slot cannot be overwritten mid-read. Shutdown is
//! only observed between waits, bounding close latency by one wait.
//!
//! # Error surfacing
//!
//! [`Receiver::start`] reports acquisition errors only. Any later failure
//! ends the loop, moves the receiver to [`ReceiverState::Faulted`], and is
//! returned by the first [`Receiver::close`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, SEGMENT_SIZE};
use crate::config::ReceiverConfig;
use crate::error::{ReceiverError, Result};
use crate::mailbox::{Mailbox, SharedSegment, WaitOutcome};
use crate::message::DebugMessage;

/// Lifecycle of a [`Receiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverState {
    /// The loop is polling the mailbox.
    Running,
    /// Shutdown was requested; waiting for the loop to exit.
    Closing,
    /// The loop stopped on an error; `close()` returns it.
    Faulted,
    /// All resources are released.
    Closed,
}

impl ReceiverState {
    /// Returns the state name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Closing => "closing",
            Self::Faulted => "faulted",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Monitor-side consumer of the debug output mailbox.
///
/// Only one receiver may observe a given set of object names at a time.
///
/// # Example
///
/// ```rust,no_run
/// use debugtap_receiver::Receiver;
/// use tokio::sync::mpsc;
///
/// # async fn run() -> debugtap_receiver::Result<()> {
/// let (tx, mut rx) = mpsc::channel(64);
/// let mut receiver = Receiver::start(tx)?;
///
/// while let Some(message) = rx.recv().await {
///     println!("{message}");
/// #   break;
/// }
///
/// receiver.close().await
/// # }
/// ```
pub struct Receiver {
    mailbox: Arc<dyn Mailbox>,
    cancel: CancellationToken,
    state: Arc<Mutex<ReceiverState>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl Receiver {
    /// Opens the system debug output segment with the default
    /// configuration and starts receiving.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`ReceiverError::ResourceUnavailable`] if the segment or a
    /// signal cannot be acquired, or [`ReceiverError::Runtime`] outside a
    /// runtime.
    pub fn start(output: mpsc::Sender<DebugMessage>) -> Result<Self> {
        Self::start_with_config(&ReceiverConfig::default(), output)
    }

    /// Opens the system debug output segment described by `config` and
    /// starts receiving.
    ///
    /// # Errors
    /// See [`Receiver::start`]; also fails on invalid configuration.
    pub fn start_with_config(
        config: &ReceiverConfig,
        output: mpsc::Sender<DebugMessage>,
    ) -> Result<Self> {
        let segment = SharedSegment::open(config)?;
        Self::start_with(Arc::new(segment), config, output)
    }

    /// Starts receiving from an already acquired mailbox.
    ///
    /// The receiver takes over the mailbox: on failure it is released before
    /// this returns, on success it is released by [`close`](Self::close).
    ///
    /// # Errors
    /// Returns [`ReceiverError::Config`] on invalid configuration or
    /// [`ReceiverError::Runtime`] outside a tokio runtime.
    pub fn start_with<M: Mailbox>(
        mailbox: Arc<M>,
        config: &ReceiverConfig,
        output: mpsc::Sender<DebugMessage>,
    ) -> Result<Self> {
        let mailbox: Arc<dyn Mailbox> = mailbox;

        let runtime = config
            .validate()
            .and_then(|()| {
                tokio::runtime::Handle::try_current()
                    .map_err(|e| ReceiverError::Runtime(e.to_string()))
            });
        let runtime = match runtime {
            Ok(runtime) => runtime,
            Err(e) => {
                if let Err(release_err) = mailbox.release() {
                    tracing::warn!(error = %release_err, "failed to release mailbox after start failure");
                }
                return Err(e);
            }
        };

        tracing::info!(
            wait_timeout_ms = config.wait_timeout_ms(),
            "debug output receiver started"
        );
        let cancel = CancellationToken::new();
        let state = Arc::new(Mutex::new(ReceiverState::Running));
        let task = runtime.spawn(run(
            Arc::clone(&mailbox),
            output,
            cancel.clone(),
            config.wait_timeout,
            Arc::clone(&state),
        ));

        Ok(Self {
            mailbox,
            cancel,
            state,
            task: Some(task),
        })
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReceiverState {
        *self.state.lock()
    }

    /// Returns true once the background loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the loop, waits for it to exit, and releases the mailbox.
    ///
    /// Returns the error that stopped the loop, if any, otherwise the first
    /// release error. Calling `close` again is a no-op returning `Ok(())`.
    ///
    /// # Errors
    /// Returns the loop's fatal error or a release failure.
    pub async fn close(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        {
            let mut state = self.state.lock();
            if *state == ReceiverState::Running {
                *state = ReceiverState::Closing;
            }
        }
        self.cancel.cancel();

        let loop_result = match task.await {
            Ok(result) => result,
            Err(e) => Err(ReceiverError::Runtime(format!("receiver task failed: {e}"))),
        };
        let release_result = self.mailbox.release();
        *self.state.lock() = ReceiverState::Closed;
        tracing::debug!("debug output receiver closed");

        loop_result.and(release_result)
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        // The loop exits after its current wait and drops its mailbox handle.
        self.cancel.cancel();
    }
}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("state", &self.state())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

async fn run(
    mailbox: Arc<dyn Mailbox>,
    output: mpsc::Sender<DebugMessage>,
    cancel: CancellationToken,
    wait_timeout: Duration,
    state: Arc<Mutex<ReceiverState>>,
) -> Result<()> {
    let result = receive_loop(mailbox, &output, &cancel, wait_timeout).await;
    match &result {
        Ok(()) => tracing::info!("debug output receiver stopped"),
        Err(e) => {
            tracing::warn!(error = %e, "debug output receiver stopped on error");
            *state.lock() = ReceiverState::Faulted;
        }
    }
    result
}

async fn receive_loop(
    mailbox: Arc<dyn Mailbox>,
    output: &mpsc::Sender<DebugMessage>,
    cancel: &CancellationToken,
    wait_timeout: Duration,
) -> Result<()> {
    let mut segment = vec![0u8; SEGMENT_SIZE];

    loop {
        mailbox.signal_ready()?;

        let waiter = Arc::clone(&mailbox);
        let outcome = tokio::task::spawn_blocking(move || waiter.wait_for_data(wait_timeout))
            .await
            .map_err(|e| ReceiverError::Runtime(format!("wait task failed: {e}")))??;

        match outcome {
            WaitOutcome::Signaled => {
                let len = mailbox.read_segment(&mut segment);
                let message = codec::decode(&segment[..len])?;
                tracing::trace!(pid = message.pid, len = message.text.len(), "received debug message");

                tokio::select! {
                    biased;
                    sent = output.send(message) => {
                        sent.map_err(|_| ReceiverError::OutputClosed)?;
                    }
                    () = cancel.cancelled() => {
                        tracing::debug!("shutdown requested while publishing, message dropped");
                        return Ok(());
                    }
                }
            }
            WaitOutcome::TimedOut => tracing::trace!("no debug output within wait timeout"),
        }

        if cancel.is_cancelled() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{MailboxEvent, MemoryMailbox};

    fn fast_config() -> ReceiverConfig {
        ReceiverConfig::builder()
            .wait_timeout(Duration::from_millis(20))
            .build()
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ReceiverState::Running.to_string(), "running");
        assert_eq!(ReceiverState::Faulted.to_string(), "faulted");
    }

    #[test]
    fn test_start_outside_runtime_releases_mailbox() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let (tx, _rx) = mpsc::channel(1);

        let err = Receiver::start_with(Arc::clone(&mailbox), &fast_config(), tx).unwrap_err();
        assert!(matches!(err, ReceiverError::Runtime(_)));
        assert!(mailbox.is_released());
        assert_eq!(mailbox.ready_count(), 0);
    }

    #[tokio::test]
    async fn test_start_with_invalid_config_releases_mailbox() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let (tx, _rx) = mpsc::channel(1);
        let config = ReceiverConfig::builder().wait_timeout(Duration::ZERO).build();

        let err = Receiver::start_with(Arc::clone(&mailbox), &config, tx).unwrap_err();
        assert!(matches!(err, ReceiverError::Config(_)));
        assert!(mailbox.is_released());
    }

    #[tokio::test]
    async fn test_close_immediately_after_start() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let (tx, _rx) = mpsc::channel(1);

        let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &fast_config(), tx).unwrap();
        assert_eq!(receiver.state(), ReceiverState::Running);
        receiver.close().await.unwrap();

        assert_eq!(receiver.state(), ReceiverState::Closed);
        assert!(receiver.is_finished());
        assert!(mailbox.is_released());
        assert_eq!(mailbox.events().last(), Some(&MailboxEvent::Released));
    }

    #[tokio::test]
    async fn test_drop_stops_loop() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let (tx, _rx) = mpsc::channel(1);

        let receiver = Receiver::start_with(Arc::clone(&mailbox), &fast_config(), tx).unwrap();
        drop(receiver);

        // Only the test keeps the mailbox once the loop has exited.
        tokio::time::timeout(Duration::from_secs(2), async {
            while Arc::strong_count(&mailbox) > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_start_without_segment_fails() {
        let (tx, _rx) = mpsc::channel(1);
        let err = Receiver::start(tx).unwrap_err();
        assert!(matches!(err, ReceiverError::ResourceUnavailable { .. }));
    }
}
