//! Sink detection.
//!
//! Probe once at startup and fall back to the null sink if detection fails.

use crate::platform::ProcessMonitorSink;
use crate::sink::Sink;

/// Probes for the Process Monitor device and returns the matching sink.
///
/// # Detection Order
/// 1. Process Monitor: open its driver device
/// 2. Fallback: [`Sink::Null`]
///
/// Every probe outcome is logged; no error escapes.
#[must_use]
pub fn detect_sink() -> Sink {
    tracing::debug!("detecting whether Process Monitor is installed");

    match ProcessMonitorSink::open() {
        Ok(sink) => {
            tracing::info!("Process Monitor debug logging is enabled");
            Sink::ProcessMonitor(sink)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Process Monitor is not available, using null sink");
            Sink::Null
        }
    }
}
