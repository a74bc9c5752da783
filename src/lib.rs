//! debugtap: Windows debug output taps
//!
//! - [`sink`]: write diagnostic strings to the attached debugger or to the
//!   Process Monitor log, falling back to a silent null sink.
//! - [`receiver`]: observe every process's `OutputDebugString` output, the
//!   way DebugView does.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use debugtap::prelude::*;
//!
//! let sink = detect_sink();
//! sink.write_str("service starting")?;
//! # Ok::<(), SinkError>(())
//! ```

pub use debugtap_receiver as receiver;
pub use debugtap_sink as sink;

/// Prelude module for common imports.
pub mod prelude {
    pub use debugtap_receiver::{
        DebugMessage, Receiver, ReceiverConfig, ReceiverError, ReceiverState, Scope,
    };
    pub use debugtap_sink::{DebugSink, NullSink, Sink, SinkError, detect_sink};
}
