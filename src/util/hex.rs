//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers used for wire traces in the logs and for building test packets
//! from readable strings.
//!
//! ```rust
//! use scs_rs::util::hex::{decode_hex, format_hex_compact};
//!
//! let packet = decode_hex("02 55 05 51 00 04").unwrap();
//! assert_eq!(format_hex_compact(&packet), "02 55 05 51 00 04");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to uppercase hex string
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode hex string to bytes. Whitespace is ignored.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Formats data as "02 55 05 51" with spaces between bytes.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_whitespace() {
        assert_eq!(decode_hex("02 55 05 51").unwrap(), vec![0x02, 0x55, 0x05, 0x51]);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_hex_compact(&[0x02, 0x06, 0x15]), "02 06 15");
        assert_eq!(encode_hex_upper(&[0xab, 0x0f]), "AB0F");
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("123"), Err(HexError::OddLength(3)));
        assert!(decode_hex("GG").is_err());
    }
}
