//! # SCS Numeric Encoding and Decoding
//!
//! This module provides the conversions between raw basepage bytes and the
//! numeric formats SCS meters store: fixed-point BCD, self-describing floating
//! BCD, integer BCD, big-endian signed integers and byte-reversed IEEE singles.
//!
//! None of these functions validate their input. A nibble above 9 is decoded
//! as-is and a buffer of the wrong length is a programming error on the caller
//! side, matching the tolerance of the meters themselves.

/// Decodes one packed BCD byte (0x42 -> 42).
pub fn bcd_to_byte(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Encodes a value 0..=99 as one packed BCD byte (42 -> 0x42).
pub fn byte_to_bcd(value: u8) -> u8 {
    ((value / 10 % 10) << 4) | (value % 10)
}

/// Decodes a big-endian BCD buffer into an integer.
pub fn bcd_to_int(bytes: &[u8]) -> u32 {
    bcd_to_u64(bytes) as u32
}

/// Encodes an integer as `length` bytes of big-endian BCD. Digits that do not
/// fit are dropped from the most significant end.
pub fn int_to_bcd(value: u32, length: usize) -> Vec<u8> {
    u64_to_bcd(u64::from(value), length)
}

fn bcd_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| {
        acc.wrapping_mul(100)
            .wrapping_add(u64::from(b >> 4) * 10 + u64::from(b & 0x0F))
    })
}

fn u64_to_bcd(mut value: u64, length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    for slot in out.iter_mut().rev() {
        let pair = (value % 100) as u8;
        value /= 100;
        *slot = byte_to_bcd(pair);
    }
    out
}

/// Returns the decimal digits of a BCD buffer, most significant first.
fn bcd_digits(bytes: &[u8]) -> String {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        digits.push(nibble_char(b >> 4));
        digits.push(nibble_char(b & 0x0F));
    }
    digits
}

fn nibble_char(nibble: u8) -> char {
    // Out-of-range nibbles are not validated; render them as hex so they stay visible.
    char::from_digit(u32::from(nibble), 16)
        .unwrap_or('0')
        .to_ascii_uppercase()
}

/// Decodes fixed-point BCD. The last `decimal_bytes` bytes hold the fraction,
/// so a 7-byte energy register with 4 decimal bytes reads as `xxxxxx.xxxxxxxx`.
pub fn fixed_bcd_to_float(bytes: &[u8], decimal_bytes: usize) -> f64 {
    let raw = bcd_to_u64(bytes) as f64;
    raw / 10f64.powi((decimal_bytes * 2) as i32)
}

/// Same as [`fixed_bcd_to_float`] but keeps every stored digit as text.
pub fn fixed_bcd_to_string(bytes: &[u8], decimal_bytes: usize) -> String {
    let digits = bcd_digits(bytes);
    let split = digits.len().saturating_sub(decimal_bytes * 2);
    let (int_part, frac_part) = digits.split_at(split);
    let int_part = trim_integer(int_part);
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Encodes a non-negative value as fixed-point BCD of `length` bytes.
pub fn float_to_fixed_bcd(value: f64, length: usize, decimal_bytes: usize) -> Vec<u8> {
    let scaled = (value.abs() * 10f64.powi((decimal_bytes * 2) as i32)).round();
    u64_to_bcd(scaled as u64, length)
}

/// Decodes floating BCD. The high nibble of the first byte gives the number of
/// digits to the right of the decimal point; the remaining `2 * length - 1`
/// nibbles are the digits themselves.
pub fn floating_bcd_to_string(bytes: &[u8], length: usize) -> String {
    let bytes = &bytes[..length];
    let point = usize::from(bytes[0] >> 4);
    let digits = bcd_digits(bytes);
    let digits = &digits[1..];
    let point = point.min(digits.len());
    let (int_part, frac_part) = digits.split_at(digits.len() - point);
    let int_part = trim_integer(int_part);
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Numeric form of [`floating_bcd_to_string`].
pub fn floating_bcd_to_float(bytes: &[u8], length: usize) -> f64 {
    floating_bcd_to_string(bytes, length)
        .parse::<f64>()
        .unwrap_or_default()
}

/// Encodes a decimal string as floating BCD, keeping as many fraction digits
/// as the field has room for. Integer digits that do not fit are dropped from
/// the most significant end. `None` unless the text is digits with at most
/// one decimal point.
pub fn string_to_floating_bcd(value: &str, length: usize) -> Option<Vec<u8>> {
    let capacity = length * 2 - 1;
    let value = value.trim().trim_start_matches(['-', '+']);
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let int_part = int_part.trim_start_matches('0');
    let int_part = &int_part[int_part.len().saturating_sub(capacity)..];
    let decimals = frac_part
        .len()
        .min(capacity - int_part.len())
        .min(9);

    let mut digits = String::with_capacity(capacity + 1);
    digits.push(char::from(b'0' + decimals as u8));
    for _ in 0..capacity - int_part.len() - decimals {
        digits.push('0');
    }
    digits.push_str(int_part);
    digits.push_str(&frac_part[..decimals]);

    Some(
        digits
            .as_bytes()
            .chunks(2)
            .map(|pair| ((pair[0] - b'0') << 4) | (pair[1] - b'0'))
            .collect(),
    )
}

/// Encodes a value as floating BCD using its shortest decimal representation.
/// Non-finite values encode as zero.
pub fn float_to_floating_bcd(value: f64, length: usize) -> Vec<u8> {
    string_to_floating_bcd(&format!("{}", value.abs()), length).unwrap_or_else(|| vec![0; length])
}

/// Reassembles a 1 to 4 byte big-endian two's complement integer.
pub fn bytes_to_signed_int(bytes: &[u8]) -> i32 {
    let seed: i32 = match bytes.first() {
        Some(b) if b & 0x80 != 0 => -1,
        _ => 0,
    };
    bytes
        .iter()
        .take(4)
        .fold(seed, |acc, &b| (acc << 8) | i32::from(b))
}

/// Reverses a 4-byte group between meter order and host IEEE order.
pub fn reorder_float_bytes(bytes: [u8; 4]) -> [u8; 4] {
    let mut out = bytes;
    out.reverse();
    out
}

/// Reads an IEEE-754 single as stored by the meter.
pub fn reorder_and_read_float(bytes: &[u8]) -> f32 {
    let group = [bytes[0], bytes[1], bytes[2], bytes[3]];
    f32::from_le_bytes(reorder_float_bytes(group))
}

/// Inverse of [`reorder_and_read_float`].
pub fn float_to_reordered_bytes(value: f32) -> [u8; 4] {
    reorder_float_bytes(value.to_le_bytes())
}

fn trim_integer(int_part: &str) -> &str {
    let trimmed = int_part.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}
