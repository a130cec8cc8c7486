//! Display formats and the formatting pass that reproduces what the meter's
//! own digit-limited display shows.

use bitflags::bitflags;
use serde::Serialize;

use crate::constants::DISPLAY_FORMAT_BLOCK_LENGTH;
use crate::display::item::RegisterClass;
use crate::payload::bcd::bcd_to_byte;

bitflags! {
    /// Flag byte of a display format record
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DisplayFormatFlags: u8 {
        /// Drop decimals before integer digits when the value is too wide
        const FLOATING_DECIMAL = 0b1000_0000;
        /// Pad the integer part with zeros to the full width
        const LEADING_ZEROS    = 0b0100_0000;
        /// Show units rather than kilo-units
        const UNITS            = 0b0010_0000;
    }
}

const DECIMALS_MASK: u8 = 0x07;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayUnits {
    Units,
    Kilo,
}

/// Formatting rule for one group of register classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFormat {
    /// Total digits on the display
    pub width: u8,
    pub decimals: u8,
    pub flags: DisplayFormatFlags,
}

impl DisplayFormat {
    pub fn new(width: u8, decimals: u8, flags: DisplayFormatFlags) -> Self {
        DisplayFormat {
            width,
            decimals,
            flags,
        }
    }

    /// Decodes a 2-byte record: BCD digit count, then flags and decimals.
    pub fn decode(record: [u8; 2]) -> Self {
        DisplayFormat {
            width: bcd_to_byte(record[0]),
            decimals: record[1] & DECIMALS_MASK,
            flags: DisplayFormatFlags::from_bits_truncate(record[1]),
        }
    }

    pub fn floating_decimal(&self) -> bool {
        self.flags.contains(DisplayFormatFlags::FLOATING_DECIMAL)
    }

    pub fn leading_zeros(&self) -> bool {
        self.flags.contains(DisplayFormatFlags::LEADING_ZEROS)
    }

    pub fn units(&self) -> DisplayUnits {
        if self.flags.contains(DisplayFormatFlags::UNITS) {
            DisplayUnits::Units
        } else {
            DisplayUnits::Kilo
        }
    }
}

impl Default for DisplayFormat {
    fn default() -> Self {
        DisplayFormat::new(6, 2, DisplayFormatFlags::empty())
    }
}

/// The three formats a meter stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayFormats {
    pub energy: DisplayFormat,
    pub demand: DisplayFormat,
    pub cumulative: DisplayFormat,
}

impl DisplayFormats {
    pub fn decode(block: &[u8; DISPLAY_FORMAT_BLOCK_LENGTH]) -> Self {
        DisplayFormats {
            energy: DisplayFormat::decode([block[0], block[1]]),
            demand: DisplayFormat::decode([block[2], block[3]]),
            cumulative: DisplayFormat::decode([block[4], block[5]]),
        }
    }

    /// Format that applies to `class`, if the class is formatted at all.
    pub fn for_class(&self, class: RegisterClass) -> Option<&DisplayFormat> {
        match class {
            RegisterClass::Energy | RegisterClass::ExtendedBcd => Some(&self.energy),
            RegisterClass::Demand | RegisterClass::MaxDemand | RegisterClass::Instantaneous => {
                Some(&self.demand)
            }
            RegisterClass::Cumulative
            | RegisterClass::TotalContinuousCumulative
            | RegisterClass::TouContinuousCumulative => Some(&self.cumulative),
            _ => None,
        }
    }
}

/// Formats a raw decimal string the way the meter would display it.
///
/// Each step works on the previous step's output:
/// 1. units display scales kilo-values by 1000
/// 2. the fraction is cut or padded to `decimals`
/// 3. leading integer zeros are dropped, leaving at least "0"
/// 4. a value wider than the display loses fraction digits first when the
///    decimal floats, then digits from the left
/// 5. with leading zeros on, the integer part is padded to the width
pub fn format_display_value(raw: &str, format: &DisplayFormat) -> String {
    let raw = raw.trim();
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let mut int_digits: String = int_part.chars().filter(char::is_ascii_digit).collect();
    let mut frac_digits: String = frac_part.chars().filter(char::is_ascii_digit).collect();

    if format.units() == DisplayUnits::Units {
        while frac_digits.len() < 3 {
            frac_digits.push('0');
        }
        let moved: String = frac_digits.drain(..3).collect();
        int_digits.push_str(&moved);
    }

    let decimals = usize::from(format.decimals);
    frac_digits.truncate(decimals);
    while frac_digits.len() < decimals {
        frac_digits.push('0');
    }

    int_digits = strip_leading_zeros(&int_digits);

    let width = usize::from(format.width);
    if width > 0 && int_digits.len() + frac_digits.len() > width {
        if format.floating_decimal() {
            let excess = int_digits.len() + frac_digits.len() - width;
            let drop = excess.min(frac_digits.len());
            frac_digits.truncate(frac_digits.len() - drop);
        }
        if int_digits.len() + frac_digits.len() > width {
            if frac_digits.len() >= width {
                frac_digits = frac_digits[frac_digits.len() - width..].to_string();
                int_digits = "0".to_string();
            } else {
                let keep = width - frac_digits.len();
                int_digits = strip_leading_zeros(&int_digits[int_digits.len() - keep..]);
            }
        }
    }

    if format.leading_zeros() {
        let int_width = width.saturating_sub(frac_digits.len());
        while int_digits.len() < int_width {
            int_digits.insert(0, '0');
        }
    }

    let mut out = String::with_capacity(int_digits.len() + frac_digits.len() + 2);
    if negative {
        out.push('-');
    }
    out.push_str(&int_digits);
    if !frac_digits.is_empty() {
        out.push('.');
        out.push_str(&frac_digits);
    }
    out
}

fn strip_leading_zeros(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(width: u8, decimals: u8, flags: DisplayFormatFlags) -> DisplayFormat {
        DisplayFormat::new(width, decimals, flags)
    }

    #[test]
    fn test_left_truncation_keeps_decimal() {
        let f = format(4, 1, DisplayFormatFlags::LEADING_ZEROS);
        assert_eq!(format_display_value("1234.5", &f), "234.5");
        assert_eq!(format_display_value("12345.6", &f), "345.6");
    }

    #[test]
    fn test_leading_zero_padding() {
        let f = format(6, 2, DisplayFormatFlags::LEADING_ZEROS);
        assert_eq!(format_display_value("12.3", &f), "0012.30");
        let f = format(6, 2, DisplayFormatFlags::empty());
        assert_eq!(format_display_value("0012.3", &f), "12.30");
        assert_eq!(format_display_value("0.004", &f), "0.00");
    }

    #[test]
    fn test_floating_decimal_drops_fraction_first() {
        let f = format(6, 3, DisplayFormatFlags::FLOATING_DECIMAL);
        assert_eq!(format_display_value("1234.5678", &f), "1234.56");
        assert_eq!(format_display_value("123456.7", &f), "123456");
        assert_eq!(format_display_value("12345678.9", &f), "345678");
    }

    #[test]
    fn test_units_scaling() {
        let f = format(8, 1, DisplayFormatFlags::UNITS);
        assert_eq!(format_display_value("1.23456", &f), "1234.5");
        assert_eq!(format_display_value("7", &f), "7000.0");
    }

    #[test]
    fn test_negative_value() {
        let f = format(6, 1, DisplayFormatFlags::empty());
        assert_eq!(format_display_value("-12.34", &f), "-12.3");
    }

    #[test]
    fn test_format_block_decode() {
        let block = [0x06, 0x42, 0x05, 0xA3, 0x08, 0x20];
        let formats = DisplayFormats::decode(&block);
        assert_eq!(formats.energy.width, 6);
        assert_eq!(formats.energy.decimals, 2);
        assert!(formats.energy.leading_zeros());
        assert!(!formats.energy.floating_decimal());
        assert!(formats.demand.floating_decimal());
        assert_eq!(formats.demand.decimals, 3);
        assert_eq!(formats.cumulative.units(), DisplayUnits::Units);
        assert_eq!(formats.cumulative.decimals, 0);

        assert_eq!(formats.for_class(RegisterClass::ExtendedBcd), Some(&formats.energy));
        assert_eq!(formats.for_class(RegisterClass::Instantaneous), Some(&formats.demand));
        assert_eq!(
            formats.for_class(RegisterClass::TouContinuousCumulative),
            Some(&formats.cumulative)
        );
        assert_eq!(formats.for_class(RegisterClass::Date), None);
    }
}
