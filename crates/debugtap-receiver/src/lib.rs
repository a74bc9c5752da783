// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # debugtap-receiver
//!
//! Monitor side of the Windows `OutputDebugString` protocol.
//!
//! Producers call `OutputDebugString`; the OS writes each message into a
//! 4096-byte shared segment (`DBWIN_BUFFER`) and hands it over through two
//! auto-reset events:
//!
//! ```text
//! receiver                         producer
//!    | -- set DBWIN_BUFFER_READY -->  |
//!    |                                | write pid + text + NUL
//!    | <-- set DBWIN_DATA_READY ----  |
//!    | decode, publish                |
//!    | -- set DBWIN_BUFFER_READY -->  |
//! ```
//!
//! [`Receiver`] runs that loop on a background task and publishes each
//! record as a [`DebugMessage`] on a bounded tokio channel.
//!
//! ## Example
//!
//! ```rust,no_run
//! use debugtap_receiver::{Receiver, ReceiverConfig};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> debugtap_receiver::Result<()> {
//! let config = ReceiverConfig::load("debugtap.toml")?;
//! let (tx, mut rx) = mpsc::channel(256);
//! let mut receiver = Receiver::start_with_config(&config, tx)?;
//!
//! if let Some(message) = rx.recv().await {
//!     println!("[{}] {}", message.pid, message.text);
//! }
//! receiver.close().await
//! # }
//! ```
//!
//! ## Single reader
//!
//! The protocol has one slot and no reader arbitration. With
//! [`ReceiverConfig::exclusive`] set (the default), attaching while another
//! monitor owns the segment fails with
//! [`ReceiverError::ResourceUnavailable`].

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod codec;
mod config;
mod error;
pub mod mailbox;
mod message;
mod receiver;

pub use codec::{MAX_TEXT_LEN, SEGMENT_SIZE};
pub use config::{ChannelNames, ReceiverConfig, ReceiverConfigBuilder, Scope};
pub use error::{ReceiverError, Result};
pub use mailbox::{Mailbox, MailboxEvent, MemoryMailbox, SharedSegment, WaitOutcome};
pub use message::DebugMessage;
pub use receiver::{Receiver, ReceiverState};
