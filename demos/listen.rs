// Demos are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! DebugView-style listener.
//!
//! Prints every `OutputDebugString` message written on this machine until
//! Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! # Current session, default protocol names
//! cargo run --example listen
//!
//! # With a TOML configuration (e.g. scope = "global")
//! cargo run --example listen -- debugtap.toml
//!
//! # Verbose receiver logging
//! RUST_LOG=debugtap_receiver=trace cargo run --example listen
//! ```

use debugtap::prelude::*;
use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ReceiverError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ReceiverConfig::load(path)?,
        None => ReceiverConfig::default(),
    };

    let (tx, mut rx) = mpsc::channel::<DebugMessage>(256);
    let mut receiver = Receiver::start_with_config(&config, tx)?;
    tracing::info!(scope = ?config.scope, "listening for debug output, press Ctrl-C to stop");

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => println!("{message}"),
                None => break,
            },
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    receiver.close().await
}
