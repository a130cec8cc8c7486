//! # Utility Modules
//!
//! Common helpers used throughout the scs-rs crate: hex rendering for wire
//! traces and the logging patterns built on top of it.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex_upper, format_hex_compact};
pub use logging::{log_frame_hex, log_transaction, PerfTimer};
