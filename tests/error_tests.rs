//! Unit tests for the `ScsError` enum and its associated `Display` trait implementation.

use scs_rs::error::{ErrorKind, ScsError};
use scs_rs::{ProtocolResponse, ScsCommand};

/// Tests that the `SerialPortError` variant is correctly formatted.
#[test]
fn test_serial_port_error() {
    let err = ScsError::SerialPortError("Test error".to_string());
    assert_eq!(err.to_string(), "Serial port error: Test error");
    assert_eq!(err.kind(), ErrorKind::Transport);
}

/// Tests that the `FrameParseError` variant is correctly formatted.
#[test]
fn test_frame_parse_error() {
    let err = ScsError::FrameParseError("bad".to_string());
    assert_eq!(err.to_string(), "Error parsing SCS packet: bad");
}

/// Tests that the `InvalidChecksum` variant shows both values.
#[test]
fn test_invalid_checksum_error() {
    let err = ScsError::InvalidChecksum {
        expected: 0x1234,
        calculated: 0xABCD,
    };
    assert_eq!(
        err.to_string(),
        "Invalid checksum: expected 0x1234, calculated 0xABCD"
    );
}

/// Tests that a protocol failure names the command, field, address and response.
#[test]
fn test_protocol_error() {
    let err = ScsError::protocol(
        ScsCommand::Download,
        ProtocolResponse::Unexpected(0x42),
        0x2109,
        "clock",
    );
    assert_eq!(
        err.to_string(),
        "Download of clock at 0x2109 failed: unexpected response 0x42"
    );
    assert_eq!(err.kind(), ErrorKind::ProtocolFailure);
    assert!(!err.is_insufficient_security());
}

/// Tests that only a CAN response counts as a security failure.
#[test]
fn test_insufficient_security() {
    let can = ScsError::protocol(ScsCommand::Download, ProtocolResponse::Can, 0x2000, "stop");
    assert!(can.is_insufficient_security());
    assert_eq!(can.response(), Some(ProtocolResponse::Can));

    let timeout = ScsError::protocol(
        ScsCommand::Upload,
        ProtocolResponse::NoResponse,
        0x2000,
        "stop",
    );
    assert!(!timeout.is_insufficient_security());
    assert_eq!(timeout.to_string(), "Upload of stop at 0x2000 failed: no response");
}

/// Tests the remaining variants and their kinds.
#[test]
fn test_other_variants() {
    let err = ScsError::unsupported("transformer ratio");
    assert_eq!(err.to_string(), "Not supported by this meter: transformer ratio");
    assert_eq!(err.kind(), ErrorKind::UnsupportedByModel);
    assert_eq!(err.response(), None);

    let err = ScsError::DataIntegrity("year 2031 is not in the TOU calendar".into());
    assert_eq!(
        err.to_string(),
        "Data integrity violation: year 2031 is not in the TOU calendar"
    );

    let err = ScsError::InvalidArgument("season index 9".into());
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(ScsError::NotLoggedOn.to_string(), "Not logged on to the meter");
    assert_eq!(ScsError::NotLoggedOn.kind(), ErrorKind::ProtocolFailure);

    let err = ScsError::Other("Test error message".to_string());
    assert_eq!(err.to_string(), "Other error: Test error message");
}

/// Tests that I/O errors become serial port errors.
#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
    let err: ScsError = io.into();
    assert!(matches!(err, ScsError::SerialPortError(ref msg) if msg == "read timed out"));
}
