//! Unit tests for the logging functionality in the `scs-rs` crate.

use scs_rs::logging::{init_logger, log_debug, log_error, log_info, log_warn};
use scs_rs::util::logging::{log_frame_hex, log_transaction, PerfTimer};
use scs_rs::{ProtocolResponse, ScsCommand};

/// Tests that the logging helpers work with and without a logger installed.
#[test]
fn test_logging() {
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
}

/// Tests that the logger can be initialized more than once.
#[test]
fn test_init_logger_twice() {
    init_logger();
    init_logger();
}

/// Tests the wire tracing helpers, including packets longer than one log line.
#[test]
fn test_wire_tracing() {
    init_logger();
    log_frame_hex("TX", &[0x02, 0x55, 0x05, 0x51, 0x00, 0x04]);
    log_frame_hex("RX", &[0xAA; 200]);
    log_transaction(ScsCommand::Upload, 0x0551, 4, ProtocolResponse::Ack);
    log_transaction(ScsCommand::Download, 0x2000, 1, ProtocolResponse::Can);

    let timer = PerfTimer::start("wire tracing");
    timer.finish();
}
