//! # SCS Packet Encoder/Decoder
//!
//! Packs requests sent to the meter and parses the data packets it returns.
//! Parsing uses `nom`; packing uses `bytes::BytesMut`.
//!
//! ## Layout
//!
//! Request: `STX | cmd | [addr_hi addr_lo len_hi len_lo] | payload | crc_hi crc_lo`
//! where the address and length are present for Upload and Download only.
//!
//! Data packet (after an ACK to Upload or Identify): `STX | data | crc_hi crc_lo`.
//!
//! Both CRCs are CRC-16/XMODEM over every byte after STX.
//!
//! ```rust
//! use scs_rs::scs::frame::{pack_request, parse_request, ScsRequest};
//!
//! let request = ScsRequest::upload(0x0551, 4);
//! let bytes = pack_request(&request);
//! let (_, parsed) = parse_request(&bytes).unwrap();
//! assert_eq!(parsed, request);
//! ```

use bytes::{BufMut, BytesMut};
use crc::{Crc, CRC_16_XMODEM};
use nom::{
    bytes::complete::{tag, take},
    number::complete::{be_u16, be_u8},
    IResult,
};

use crate::constants::{SCS_CRC_LENGTH, SCS_SECURITY_CODE_LENGTH, SCS_STX};
use crate::error::ScsError;
use crate::scs::transport::ScsCommand;

const SCS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC-16/XMODEM as used by SCS packets.
pub fn crc16(data: &[u8]) -> u16 {
    SCS_CRC.checksum(data)
}

/// One request packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsRequest {
    pub command: ScsCommand,
    pub address: u16,
    pub length: u16,
    pub payload: Vec<u8>,
}

impl ScsRequest {
    pub fn upload(address: u16, length: u16) -> Self {
        ScsRequest {
            command: ScsCommand::Upload,
            address,
            length,
            payload: Vec::new(),
        }
    }

    pub fn download(address: u16, data: &[u8]) -> Self {
        ScsRequest {
            command: ScsCommand::Download,
            address,
            length: data.len() as u16,
            payload: data.to_vec(),
        }
    }

    pub fn identify() -> Self {
        Self::unaddressed(ScsCommand::Identify, Vec::new())
    }

    pub fn security(code: &[u8]) -> Self {
        Self::unaddressed(ScsCommand::Security, code.to_vec())
    }

    pub fn exit() -> Self {
        Self::unaddressed(ScsCommand::Exit, Vec::new())
    }

    fn unaddressed(command: ScsCommand, payload: Vec<u8>) -> Self {
        ScsRequest {
            command,
            address: 0,
            length: 0,
            payload,
        }
    }
}

/// Packs a request for transmission.
pub fn pack_request(request: &ScsRequest) -> BytesMut {
    let mut body = BytesMut::with_capacity(5 + request.payload.len());
    body.put_u8(request.command.code());
    if request.command.is_addressed() {
        body.put_u16(request.address);
        body.put_u16(request.length);
    }
    body.put_slice(&request.payload);

    let crc = crc16(&body);
    let mut out = BytesMut::with_capacity(body.len() + 1 + SCS_CRC_LENGTH);
    out.put_u8(SCS_STX);
    out.put_slice(&body);
    out.put_u16(crc);
    out
}

/// Parses a request packet. Used by test doubles standing in for the meter.
pub fn parse_request(input: &[u8]) -> IResult<&[u8], ScsRequest> {
    let (rest, _) = tag(&[SCS_STX][..])(input)?;
    let body_start = rest;

    let (rest, code) = be_u8(rest)?;
    let command = ScsCommand::from_code(code).ok_or_else(|| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
    })?;

    let (rest, address, length) = if command.is_addressed() {
        let (rest, address) = be_u16(rest)?;
        let (rest, length) = be_u16(rest)?;
        (rest, address, length)
    } else {
        (rest, 0, 0)
    };

    let payload_len = match command {
        ScsCommand::Download => usize::from(length),
        ScsCommand::Security => SCS_SECURITY_CODE_LENGTH,
        _ => 0,
    };
    let (rest, payload) = take(payload_len)(rest)?;

    let body_len = body_start.len() - rest.len();
    let (rest, crc) = be_u16(rest)?;
    if crc != crc16(&body_start[..body_len]) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    Ok((
        rest,
        ScsRequest {
            command,
            address,
            length,
            payload: payload.to_vec(),
        },
    ))
}

/// Packs a data packet as the meter sends it after an ACK.
pub fn pack_data_packet(data: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(data.len() + 1 + SCS_CRC_LENGTH);
    out.put_u8(SCS_STX);
    out.put_slice(data);
    out.put_u16(crc16(data));
    out
}

/// Splits a data packet of `length` data bytes into data and received CRC.
pub fn parse_data_packet(input: &[u8], length: usize) -> IResult<&[u8], (&[u8], u16)> {
    let (rest, _) = tag(&[SCS_STX][..])(input)?;
    let (rest, data) = take(length)(rest)?;
    let (rest, crc) = be_u16(rest)?;
    Ok((rest, (data, crc)))
}

/// Parses and verifies a complete data packet.
pub fn decode_data_packet(input: &[u8], length: usize) -> Result<Vec<u8>, ScsError> {
    let (_, (data, received)) = parse_data_packet(input, length)
        .map_err(|e| ScsError::FrameParseError(format!("{e:?}")))?;
    let calculated = crc16(data);
    if received != calculated {
        return Err(ScsError::InvalidChecksum {
            expected: received,
            calculated,
        });
    }
    Ok(data.to_vec())
}

/// Total bytes on the wire for a data packet carrying `length` data bytes.
pub fn data_packet_len(length: usize) -> usize {
    1 + length + SCS_CRC_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_upload_request() {
        let bytes = pack_request(&ScsRequest::upload(0x0551, 4));
        assert_eq!(&bytes[..6], &[0x02, b'U', 0x05, 0x51, 0x00, 0x04]);
        assert_eq!(bytes.len(), 8);
        let crc = crc16(&bytes[1..6]);
        assert_eq!(&bytes[6..], &crc.to_be_bytes());
    }

    #[test]
    fn test_pack_unaddressed_request() {
        let bytes = pack_request(&ScsRequest::identify());
        assert_eq!(bytes.len(), 4);
        assert_eq!(&bytes[..2], &[0x02, b'I']);
    }

    #[test]
    fn test_parse_download_request() {
        let request = ScsRequest::download(0x2100, &[0x01, 0x02, 0x03]);
        let bytes = pack_request(&request);
        let (rest, parsed) = parse_request(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_parse_request_bad_crc() {
        let mut bytes = pack_request(&ScsRequest::upload(0x0100, 2)).to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(parse_request(&bytes).is_err());
    }

    #[test]
    fn test_data_packet() {
        let packet = pack_data_packet(&[0x12, 0x34]);
        assert_eq!(packet.len(), data_packet_len(2));
        assert_eq!(decode_data_packet(&packet, 2).unwrap(), vec![0x12, 0x34]);
    }

    #[test]
    fn test_data_packet_checksum_mismatch() {
        let mut packet = pack_data_packet(&[0x12, 0x34]).to_vec();
        packet[1] = 0x13;
        assert!(matches!(
            decode_data_packet(&packet, 2),
            Err(ScsError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_crc_check_value() {
        // CRC-16/XMODEM check value
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }
}
