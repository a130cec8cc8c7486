//! # SCS Transport Abstraction
//!
//! The address-based upload/download primitive every higher layer is built on.
//! A transport performs exactly one request/response exchange per call and
//! reports the meter's single-byte answer as a [`ProtocolResponse`]. It never
//! retries and never chunks; both are caller policy.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::constants::{
    SCS_ACK, SCS_CAN, SCS_CMD_DOWNLOAD, SCS_CMD_EXIT, SCS_CMD_IDENTIFY, SCS_CMD_SECURITY,
    SCS_CMD_UPLOAD, SCS_NAK,
};
use crate::error::ScsError;

/// Commands understood by SCS meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScsCommand {
    Identify,
    Security,
    Upload,
    Download,
    Exit,
}

impl ScsCommand {
    pub fn code(self) -> u8 {
        match self {
            ScsCommand::Identify => SCS_CMD_IDENTIFY,
            ScsCommand::Security => SCS_CMD_SECURITY,
            ScsCommand::Upload => SCS_CMD_UPLOAD,
            ScsCommand::Download => SCS_CMD_DOWNLOAD,
            ScsCommand::Exit => SCS_CMD_EXIT,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            SCS_CMD_IDENTIFY => Some(ScsCommand::Identify),
            SCS_CMD_SECURITY => Some(ScsCommand::Security),
            SCS_CMD_UPLOAD => Some(ScsCommand::Upload),
            SCS_CMD_DOWNLOAD => Some(ScsCommand::Download),
            SCS_CMD_EXIT => Some(ScsCommand::Exit),
            _ => None,
        }
    }

    /// Upload and Download carry an address and a length.
    pub fn is_addressed(self) -> bool {
        matches!(self, ScsCommand::Upload | ScsCommand::Download)
    }
}

impl fmt::Display for ScsCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScsCommand::Identify => "Identify",
            ScsCommand::Security => "Security",
            ScsCommand::Upload => "Upload",
            ScsCommand::Download => "Download",
            ScsCommand::Exit => "Exit",
        };
        f.write_str(name)
    }
}

/// Outcome of a single transaction. Every exchange yields exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProtocolResponse {
    /// Success
    Ack,
    /// Request rejected as invalid
    Nak,
    /// Request cancelled, typically insufficient security
    Can,
    /// Timed out waiting for the meter
    NoResponse,
    /// A status byte that is none of the above
    Unexpected(u8),
}

impl ProtocolResponse {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            SCS_ACK => ProtocolResponse::Ack,
            SCS_NAK => ProtocolResponse::Nak,
            SCS_CAN => ProtocolResponse::Can,
            other => ProtocolResponse::Unexpected(other),
        }
    }

    /// Status byte sent on the wire, if the response has one.
    pub fn to_byte(self) -> Option<u8> {
        match self {
            ProtocolResponse::Ack => Some(SCS_ACK),
            ProtocolResponse::Nak => Some(SCS_NAK),
            ProtocolResponse::Can => Some(SCS_CAN),
            ProtocolResponse::NoResponse => None,
            ProtocolResponse::Unexpected(b) => Some(b),
        }
    }

    pub fn is_ack(self) -> bool {
        self == ProtocolResponse::Ack
    }
}

impl fmt::Display for ProtocolResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolResponse::Ack => f.write_str("ACK"),
            ProtocolResponse::Nak => f.write_str("NAK"),
            ProtocolResponse::Can => f.write_str("CAN"),
            ProtocolResponse::NoResponse => f.write_str("no response"),
            ProtocolResponse::Unexpected(b) => write!(f, "unexpected response 0x{b:02X}"),
        }
    }
}

/// Address-based block access to a meter's basepage.
///
/// On `Ack`, `upload` returns exactly `length` bytes. On any other response
/// the returned buffer is empty and the caller decides what the failure means.
#[async_trait]
pub trait ScsTransport: Send {
    async fn upload(
        &mut self,
        address: u16,
        length: usize,
    ) -> Result<(Vec<u8>, ProtocolResponse), ScsError>;

    async fn download(&mut self, address: u16, data: &[u8]) -> Result<ProtocolResponse, ScsError>;
}

/// A link that can be torn down and re-established. The meter forgets the
/// session, so the caller logs on again afterwards.
#[async_trait]
pub trait Reconnect: Send {
    async fn reconnect(&mut self) -> Result<(), ScsError>;
}

#[async_trait]
impl<T: ScsTransport + ?Sized> ScsTransport for Box<T> {
    async fn upload(
        &mut self,
        address: u16,
        length: usize,
    ) -> Result<(Vec<u8>, ProtocolResponse), ScsError> {
        (**self).upload(address, length).await
    }

    async fn download(&mut self, address: u16, data: &[u8]) -> Result<ProtocolResponse, ScsError> {
        (**self).download(address, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_bytes() {
        assert_eq!(ProtocolResponse::from_byte(0x06), ProtocolResponse::Ack);
        assert_eq!(ProtocolResponse::from_byte(0x15), ProtocolResponse::Nak);
        assert_eq!(ProtocolResponse::from_byte(0x18), ProtocolResponse::Can);
        assert_eq!(ProtocolResponse::from_byte(0x3F), ProtocolResponse::Unexpected(0x3F));
        assert_eq!(ProtocolResponse::NoResponse.to_byte(), None);
    }

    #[test]
    fn test_command_codes() {
        for cmd in [
            ScsCommand::Identify,
            ScsCommand::Security,
            ScsCommand::Upload,
            ScsCommand::Download,
            ScsCommand::Exit,
        ] {
            assert_eq!(ScsCommand::from_code(cmd.code()), Some(cmd));
        }
        assert!(ScsCommand::Upload.is_addressed());
        assert!(!ScsCommand::Identify.is_addressed());
    }
}
