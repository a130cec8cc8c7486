//! # Wire Logging Utilities
//!
//! Debug-level tracing of SCS packets and transactions, plus a small timer
//! for the slow multi-step operations (display table reads, reconfiguration).

use std::time::Instant;

use crate::scs::transport::{ProtocolResponse, ScsCommand};

/// Limit hex output to keep a single log line readable
const MAX_LOG_BYTES: usize = 64;

/// Log packet bytes in hex under the `scs::frame` target.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    if data.len() > MAX_LOG_BYTES {
        log::debug!(target: "scs::frame", "{prefix}: {hex_str} ... ({} bytes total)", data.len());
    } else {
        log::debug!(target: "scs::frame", "{prefix}: {hex_str}");
    }
}

/// Log the outcome of one upload or download.
pub fn log_transaction(command: ScsCommand, address: u16, length: usize, response: ProtocolResponse) {
    if response.is_ack() {
        log::debug!(target: "scs::transaction", "{command} 0x{address:04X} len={length}: {response}");
    } else {
        log::info!(target: "scs::transaction", "{command} 0x{address:04X} len={length}: {response}");
    }
}

/// A simple timer for logging operation durations
#[derive(Debug)]
pub struct PerfTimer {
    start: Instant,
    operation: &'static str,
}

impl PerfTimer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Finish timing and log the result
    pub fn finish(self) {
        log::debug!("Operation '{}' took {:?}", self.operation, self.start.elapsed());
    }
}
