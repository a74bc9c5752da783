//! `tracing-subscriber` integration.
//!
//! Lets an application send its own `tracing` output to the selected sink:
//!
//! ```rust,no_run
//! use debugtap_sink::detect_sink;
//!
//! tracing_subscriber::fmt()
//!     .with_writer(detect_sink())
//!     .with_ansi(false)
//!     .init();
//! ```

use tracing_subscriber::fmt::MakeWriter;

use crate::sink::Sink;

impl<'a> MakeWriter<'a> for Sink {
    type Writer = &'a Sink;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}
