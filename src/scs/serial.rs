//! # SCS Serial Communication
//!
//! This module provides the serial/optical-probe side of the SCS protocol:
//! opening the port, logging on with a security code, and performing single
//! upload/download exchanges. The handle is generic over the byte stream so
//! the same code runs against a `tokio_serial::SerialStream` or a mock port.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{SCS_IDENTIFY_LENGTH, SCS_SECURITY_CODE_LENGTH};
use crate::error::ScsError;
use crate::payload::bcd::int_to_bcd;
use crate::scs::frame::{data_packet_len, decode_data_packet, pack_request, ScsRequest};
use crate::scs::transport::{ProtocolResponse, Reconnect, ScsCommand, ScsTransport};
use crate::util::logging::{log_frame_hex, log_transaction};

/// How the meter is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeType {
    /// Optical probe powered from DTR/RTS
    #[default]
    Optical,
    /// Direct serial connection
    Direct,
}

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
    pub probe: ProbeType,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: 9600,
            timeout: Duration::from_secs(2),
            probe: ProbeType::Optical,
        }
    }
}

/// Meter security code, up to eight decimal digits sent as four BCD bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecurityCode([u8; SCS_SECURITY_CODE_LENGTH]);

impl SecurityCode {
    pub fn parse(digits: &str) -> Result<Self, ScsError> {
        let digits = digits.trim();
        if digits.is_empty()
            || digits.len() > SCS_SECURITY_CODE_LENGTH * 2
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ScsError::InvalidArgument(
                "security code must be 1 to 8 decimal digits".into(),
            ));
        }
        let value: u32 = digits
            .parse()
            .map_err(|_| ScsError::InvalidArgument("security code".into()))?;
        let mut code = [0u8; SCS_SECURITY_CODE_LENGTH];
        code.copy_from_slice(&int_to_bcd(value, SCS_SECURITY_CODE_LENGTH));
        Ok(SecurityCode(code))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityCode(****)")
    }
}

/// Represents a handle to an SCS meter over a serial or optical link.
pub struct ScsDeviceHandle<P = SerialStream> {
    port: P,
    config: SerialConfig,
    port_name: Option<String>,
    logged_on: bool,
}

impl ScsDeviceHandle<SerialStream> {
    /// Opens the serial port (8N1) and powers the probe if needed.
    pub async fn open(port_name: &str, config: SerialConfig) -> Result<Self, ScsError> {
        let port = Self::open_stream(port_name, &config)?;
        log::info!("Opened {port_name} at {} baud ({:?})", config.baudrate, config.probe);
        Ok(ScsDeviceHandle {
            port,
            config,
            port_name: Some(port_name.to_string()),
            logged_on: false,
        })
    }

    /// Closes and reopens the port. The meter drops the session, so the
    /// handle is no longer logged on.
    pub async fn reopen(&mut self) -> Result<(), ScsError> {
        let name = self
            .port_name
            .clone()
            .ok_or_else(|| ScsError::Other("handle was not opened by name".into()))?;
        self.port = Self::open_stream(&name, &self.config)?;
        self.logged_on = false;
        Ok(())
    }

    fn open_stream(port_name: &str, config: &SerialConfig) -> Result<SerialStream, ScsError> {
        let mut port = tokio_serial::new(port_name, config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(config.timeout)
            .open_native_async()?;

        let powered = config.probe == ProbeType::Optical;
        port.write_data_terminal_ready(powered)?;
        port.write_request_to_send(powered)?;
        Ok(port)
    }
}

impl<P> ScsDeviceHandle<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already-open byte stream.
    pub fn from_port(port: P, config: SerialConfig) -> Self {
        ScsDeviceHandle {
            port,
            config,
            port_name: None,
            logged_on: false,
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_logged_on(&self) -> bool {
        self.logged_on
    }

    /// Identifies the meter and presents the security code. Returns the
    /// three-character device-type code reported by Identify.
    pub async fn log_on(&mut self, code: &SecurityCode) -> Result<String, ScsError> {
        self.logged_on = false;

        let response = self.exchange(&ScsRequest::identify()).await?;
        if !response.is_ack() {
            return Err(ScsError::protocol(ScsCommand::Identify, response, 0, "identify"));
        }
        let ident = self.read_data_packet(SCS_IDENTIFY_LENGTH).await?;
        let device_type = String::from_utf8_lossy(&ident).trim().to_string();

        let response = self.exchange(&ScsRequest::security(code.as_bytes())).await?;
        if !response.is_ack() {
            return Err(ScsError::protocol(ScsCommand::Security, response, 0, "security code"));
        }

        self.logged_on = true;
        log::info!("Logged on to SCS device type {device_type}");
        Ok(device_type)
    }

    /// Ends the session. The handle is logged off even if the meter does not answer.
    pub async fn log_off(&mut self) -> Result<(), ScsError> {
        let response = self.exchange(&ScsRequest::exit()).await;
        self.logged_on = false;
        match response? {
            ProtocolResponse::Ack | ProtocolResponse::NoResponse => Ok(()),
            other => Err(ScsError::protocol(ScsCommand::Exit, other, 0, "exit")),
        }
    }

    /// Closes the connection; dropping the stream releases the port.
    pub async fn close(mut self) -> Result<(), ScsError> {
        if self.logged_on {
            self.log_off().await?;
        }
        self.port.shutdown().await?;
        Ok(())
    }

    /// Sends one request and waits for the status byte.
    async fn exchange(&mut self, request: &ScsRequest) -> Result<ProtocolResponse, ScsError> {
        let packet = pack_request(request);
        log_frame_hex("TX", &packet);
        self.port.write_all(&packet).await?;
        self.port.flush().await?;

        let mut status = [0u8; 1];
        match timeout(self.config.timeout, self.port.read_exact(&mut status)).await {
            Err(_) => Ok(ProtocolResponse::NoResponse),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(ProtocolResponse::NoResponse)
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(_)) => {
                log_frame_hex("RX", &status);
                Ok(ProtocolResponse::from_byte(status[0]))
            }
        }
    }

    async fn read_data_packet(&mut self, length: usize) -> Result<Vec<u8>, ScsError> {
        let mut packet = vec![0u8; data_packet_len(length)];
        match timeout(self.config.timeout, self.port.read_exact(&mut packet)).await {
            Err(_) => {
                return Err(ScsError::FrameParseError(format!(
                    "timed out waiting for {length} byte data packet"
                )))
            }
            Ok(result) => {
                result.map_err(|e| ScsError::FrameParseError(format!("truncated data packet: {e}")))?;
            }
        }
        log_frame_hex("RX", &packet);
        decode_data_packet(&packet, length)
    }

    fn ensure_logged_on(&self) -> Result<(), ScsError> {
        if self.logged_on {
            Ok(())
        } else {
            Err(ScsError::NotLoggedOn)
        }
    }
}

#[async_trait]
impl Reconnect for ScsDeviceHandle<SerialStream> {
    async fn reconnect(&mut self) -> Result<(), ScsError> {
        self.reopen().await
    }
}

#[async_trait]
impl<P> ScsTransport for ScsDeviceHandle<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn upload(
        &mut self,
        address: u16,
        length: usize,
    ) -> Result<(Vec<u8>, ProtocolResponse), ScsError> {
        self.ensure_logged_on()?;
        let len = u16::try_from(length)
            .map_err(|_| ScsError::InvalidArgument(format!("upload length {length}")))?;

        let response = self.exchange(&ScsRequest::upload(address, len)).await?;
        log_transaction(ScsCommand::Upload, address, length, response);
        if !response.is_ack() {
            return Ok((Vec::new(), response));
        }
        let data = self.read_data_packet(length).await?;
        Ok((data, response))
    }

    async fn download(&mut self, address: u16, data: &[u8]) -> Result<ProtocolResponse, ScsError> {
        self.ensure_logged_on()?;
        if data.len() > usize::from(u16::MAX) {
            return Err(ScsError::InvalidArgument(format!("download length {}", data.len())));
        }

        let response = self.exchange(&ScsRequest::download(address, data)).await?;
        log_transaction(ScsCommand::Download, address, data.len(), response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scs::frame::parse_request;
    use crate::scs::serial_mock::{MockSerialPort, MockReply};

    fn config() -> SerialConfig {
        SerialConfig {
            timeout: Duration::from_millis(20),
            ..SerialConfig::default()
        }
    }

    async fn logged_on(mock: &MockSerialPort) -> ScsDeviceHandle<MockSerialPort> {
        mock.queue_reply(MockReply::Identify("VEC".into()));
        mock.queue_reply(MockReply::Ack);
        let mut handle = ScsDeviceHandle::from_port(mock.clone(), config());
        let code = SecurityCode::parse("1234").unwrap();
        assert_eq!(handle.log_on(&code).await.unwrap(), "VEC");
        mock.clear();
        handle
    }

    #[test]
    fn test_security_code_parse() {
        let code = SecurityCode::parse("12345678").unwrap();
        assert_eq!(code.as_bytes(), &[0x12, 0x34, 0x56, 0x78]);
        assert!(SecurityCode::parse("123456789").is_err());
        assert!(SecurityCode::parse("12a4").is_err());
        assert_eq!(format!("{code:?}"), "SecurityCode(****)");
    }

    #[tokio::test]
    async fn test_upload_before_log_on() {
        let mock = MockSerialPort::new();
        let mut handle = ScsDeviceHandle::from_port(mock, config());
        assert!(matches!(handle.upload(0x0100, 2).await, Err(ScsError::NotLoggedOn)));
    }

    #[tokio::test]
    async fn test_log_on_rejected_security() {
        let mock = MockSerialPort::new();
        mock.queue_reply(MockReply::Identify("MT2".into()));
        mock.queue_reply(MockReply::Can);
        let mut handle = ScsDeviceHandle::from_port(mock.clone(), config());
        let err = handle.log_on(&SecurityCode::parse("1").unwrap()).await.unwrap_err();
        assert!(err.is_insufficient_security());
        assert!(!handle.is_logged_on());
    }

    #[tokio::test]
    async fn test_upload_ack() {
        let mock = MockSerialPort::new();
        let mut handle = logged_on(&mock).await;
        mock.queue_reply(MockReply::Data(vec![0x00, 0x01, 0x23, 0x45]));

        let (data, response) = handle.upload(0x0551, 4).await.unwrap();
        assert_eq!(response, ProtocolResponse::Ack);
        assert_eq!(data, vec![0x00, 0x01, 0x23, 0x45]);

        let tx = mock.get_tx_data();
        let (_, request) = parse_request(&tx).unwrap();
        assert_eq!(request, ScsRequest::upload(0x0551, 4));
    }

    #[tokio::test]
    async fn test_upload_nak_returns_no_data() {
        let mock = MockSerialPort::new();
        let mut handle = logged_on(&mock).await;
        mock.queue_reply(MockReply::Nak);

        let (data, response) = handle.upload(0x9999, 4).await.unwrap();
        assert_eq!(response, ProtocolResponse::Nak);
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_download_timeout_is_no_response() {
        let mock = MockSerialPort::new();
        let mut handle = logged_on(&mock).await;

        let response = handle.download(0x2000, &[0x01]).await.unwrap();
        assert_eq!(response, ProtocolResponse::NoResponse);
    }

    #[tokio::test]
    async fn test_corrupt_data_packet() {
        let mock = MockSerialPort::new();
        let mut handle = logged_on(&mock).await;
        mock.queue_reply(MockReply::CorruptData(vec![0x12, 0x34]));

        let err = handle.upload(0x0100, 2).await.unwrap_err();
        assert!(matches!(err, ScsError::InvalidChecksum { .. }));
    }

    #[tokio::test]
    async fn test_log_off_clears_flag() {
        let mock = MockSerialPort::new();
        let mut handle = logged_on(&mock).await;
        mock.queue_reply(MockReply::Ack);
        handle.log_off().await.unwrap();
        assert!(!handle.is_logged_on());
    }

    #[tokio::test]
    async fn test_io_error_propagates() {
        let mock = MockSerialPort::new();
        let mut handle = logged_on(&mock).await;
        mock.set_next_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"));

        let err = handle.download(0x2000, &[0x01]).await.unwrap_err();
        assert!(matches!(err, ScsError::SerialPortError(_)));
    }
}
