// Demos are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Writes a few messages to both debug sinks.
//!
//! Run `listen` (or DebugView / Process Monitor) first to see them.
//!
//! ```bash
//! cargo run --example emit
//! ```

use std::io::Write;

use debugtap::prelude::*;

fn main() {
    let debugger = Sink::debugger();
    let procmon = detect_sink();
    println!("debugger sink: {debugger}, monitoring sink: {procmon}");

    debugger.write_str("debugtap emit demo starting").unwrap();
    for i in 1..=3 {
        debugger.print(format_args!("tick {i} of 3")).unwrap();
        procmon.print(format_args!("tick {i} of 3")).unwrap();
    }
    writeln!(&debugger, "written through std::io::Write").unwrap();

    // Route this program's own tracing output to the debugger channel.
    tracing_subscriber::fmt()
        .with_writer(debugger)
        .with_ansi(false)
        .init();
    tracing::info!(pid = std::process::id(), "tracing event routed to the debugger");
}
