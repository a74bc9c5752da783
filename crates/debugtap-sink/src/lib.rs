// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # debugtap-sink
//!
//! Fire-and-forget writers for the two OS-level debug channels on Windows:
//!
//! - **Debugger**: `OutputDebugStringW`, visible to an attached debugger or
//!   to a monitor such as DebugView (or [`debugtap-receiver`]).
//! - **Process Monitor**: the Sysinternals driver log, written through a
//!   device control request.
//!
//! Every write reports the full input length. If nobody listens, or the
//! channel is missing, writes are successful no-ops.
//!
//! ## Example
//!
//! ```rust,no_run
//! use debugtap_sink::{DebugSink, detect_sink};
//!
//! let sink = detect_sink();
//! sink.write_str("opening configuration")?;
//! sink.print(format_args!("loaded {} entries", 12))?;
//! # Ok::<(), debugtap_sink::SinkError>(())
//! ```
//!
//! [`debugtap-receiver`]: https://docs.rs/debugtap-receiver

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

mod detect;
mod error;
mod sink;
pub mod sys;
mod writer;

#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
mod unsupported;

mod platform {
    #[cfg(not(windows))]
    pub use crate::unsupported::{DebuggerSink, ProcessMonitorSink};
    #[cfg(windows)]
    pub use crate::windows::{DebuggerSink, ProcessMonitorSink};
}

pub use detect::detect_sink;
pub use error::{Result, SinkError};
pub use platform::{DebuggerSink, ProcessMonitorSink};
pub use sink::{DebugSink, NullSink, Sink};
