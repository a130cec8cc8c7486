//! # SCS Error Handling
//!
//! This module defines the ScsError enum, which represents the different error
//! types that can occur in the scs-rs crate.

use crate::scs::transport::{ProtocolResponse, ScsCommand};
use thiserror::Error;

/// Coarse classification of an [`ScsError`], for callers that need to decide
/// between retrying, prompting for credentials and giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The meter answered with something other than ACK.
    ProtocolFailure,
    /// The feature does not exist on this meter family. Do not retry.
    UnsupportedByModel,
    /// Calendar or schedule data cannot be reconciled with the request.
    DataIntegrityViolation,
    /// Serial port, framing or checksum trouble below the protocol.
    Transport,
    /// The caller passed a value the operation cannot represent.
    InvalidArgument,
}

/// Represents the different error types that can occur in the SCS crate.
#[derive(Debug, Error)]
pub enum ScsError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Indicates an error when parsing an SCS packet.
    #[error("Error parsing SCS packet: {0}")]
    FrameParseError(String),

    /// Indicates a CRC mismatch on a data packet.
    #[error("Invalid checksum: expected 0x{expected:04X}, calculated 0x{calculated:04X}")]
    InvalidChecksum { expected: u16, calculated: u16 },

    /// The meter did not acknowledge a transaction the caller expected to succeed.
    #[error("{command} of {field} at 0x{address:04X} failed: {response}")]
    Protocol {
        command: ScsCommand,
        response: ProtocolResponse,
        address: u16,
        field: String,
    },

    /// The operation is not available on this meter family.
    #[error("Not supported by this meter: {0}")]
    Unsupported(String),

    /// TOU data could not be reconciled (missing year, calendar too large).
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    /// An argument could not be encoded for the meter.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A transaction was attempted before a successful log-on.
    #[error("Not logged on to the meter")]
    NotLoggedOn,

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl ScsError {
    /// Builds the protocol failure raised when `response` is not ACK.
    pub fn protocol(
        command: ScsCommand,
        response: ProtocolResponse,
        address: u16,
        field: impl Into<String>,
    ) -> Self {
        ScsError::Protocol {
            command,
            response,
            address,
            field: field.into(),
        }
    }

    /// Builds an unsupported-operation error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        ScsError::Unsupported(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScsError::Protocol { .. } | ScsError::NotLoggedOn => ErrorKind::ProtocolFailure,
            ScsError::Unsupported(_) => ErrorKind::UnsupportedByModel,
            ScsError::DataIntegrity(_) => ErrorKind::DataIntegrityViolation,
            ScsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ScsError::SerialPortError(_)
            | ScsError::FrameParseError(_)
            | ScsError::InvalidChecksum { .. }
            | ScsError::Other(_) => ErrorKind::Transport,
        }
    }

    /// True when the meter cancelled the request for lack of privilege.
    pub fn is_insufficient_security(&self) -> bool {
        matches!(
            self,
            ScsError::Protocol {
                response: ProtocolResponse::Can,
                ..
            }
        )
    }

    /// The response code carried by a protocol failure, if any.
    pub fn response(&self) -> Option<ProtocolResponse> {
        match self {
            ScsError::Protocol { response, .. } => Some(*response),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScsError {
    fn from(err: std::io::Error) -> Self {
        ScsError::SerialPortError(err.to_string())
    }
}

impl From<tokio_serial::Error> for ScsError {
    fn from(err: tokio_serial::Error) -> Self {
        ScsError::SerialPortError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ScsError::protocol(
            ScsCommand::Upload,
            ProtocolResponse::Nak,
            0x0551,
            "watts received energy",
        );
        assert_eq!(
            err.to_string(),
            "Upload of watts received energy at 0x0551 failed: NAK"
        );
        assert_eq!(err.kind(), ErrorKind::ProtocolFailure);
        assert_eq!(err.response(), Some(ProtocolResponse::Nak));
    }

    #[test]
    fn test_can_is_insufficient_security() {
        let err = ScsError::protocol(ScsCommand::Download, ProtocolResponse::Can, 0x2000, "stop");
        assert!(err.is_insufficient_security());

        let err = ScsError::protocol(ScsCommand::Download, ProtocolResponse::Nak, 0x2000, "stop");
        assert!(!err.is_insufficient_security());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ScsError::unsupported("display lists").kind(),
            ErrorKind::UnsupportedByModel
        );
        assert_eq!(
            ScsError::DataIntegrity("year 2031 not found".into()).kind(),
            ErrorKind::DataIntegrityViolation
        );
        assert_eq!(
            ScsError::InvalidChecksum {
                expected: 1,
                calculated: 2
            }
            .kind(),
            ErrorKind::Transport
        );
    }
}
