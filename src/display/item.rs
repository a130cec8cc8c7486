//! Display item records.
//!
//! ```text
//! byte 0  bits 6..4 register type, bits 3..0 register class (0xFF ends a list)
//! byte 1  display id, BCD
//! byte 2  bit 7 alternate mode, bits 6..4 TOU rate, bits 3..0 address bank (BCD)
//! byte 3  address offset
//! ```

use std::fmt;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::constants::{
    DISPLAY_ALT_MODE_MASK, DISPLAY_BANK_MASK, DISPLAY_CLASS_MASK, DISPLAY_END_OF_TABLE,
    DISPLAY_RATE_MASK, DISPLAY_RECORD_LENGTH, DISPLAY_TYPE_MASK,
};
use crate::payload::bcd::bcd_to_byte;

/// What kind of value a display item shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegisterClass {
    Energy,
    Demand,
    MaxDemand,
    Instantaneous,
    Cumulative,
    TotalContinuousCumulative,
    FloatingBcd,
    IntegerBcd,
    Date,
    Time,
    Ascii,
    FixedBcd,
    Binary,
    TouContinuousCumulative,
    ExtendedBcd,
    Unknown,
}

impl RegisterClass {
    pub fn from_code(code: u8) -> Self {
        match code & DISPLAY_CLASS_MASK {
            0 => RegisterClass::Energy,
            1 => RegisterClass::Demand,
            2 => RegisterClass::MaxDemand,
            3 => RegisterClass::Instantaneous,
            4 => RegisterClass::Cumulative,
            5 => RegisterClass::TotalContinuousCumulative,
            6 => RegisterClass::FloatingBcd,
            7 => RegisterClass::IntegerBcd,
            8 => RegisterClass::Date,
            9 => RegisterClass::Time,
            10 => RegisterClass::Ascii,
            11 => RegisterClass::FixedBcd,
            12 => RegisterClass::Binary,
            13 => RegisterClass::TouContinuousCumulative,
            14 => RegisterClass::ExtendedBcd,
            _ => RegisterClass::Unknown,
        }
    }

    /// Continuous cumulative demand, computed rather than stored.
    pub fn is_ccum(self) -> bool {
        matches!(
            self,
            RegisterClass::TotalContinuousCumulative | RegisterClass::TouContinuousCumulative
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RegisterClass::Energy => "Energy",
            RegisterClass::Demand => "Demand",
            RegisterClass::MaxDemand => "Max Demand",
            RegisterClass::Instantaneous => "Instantaneous",
            RegisterClass::Cumulative => "Cumulative Demand",
            RegisterClass::TotalContinuousCumulative => "Continuous Cumulative Demand",
            RegisterClass::FloatingBcd => "Value",
            RegisterClass::IntegerBcd => "Count",
            RegisterClass::Date => "Date",
            RegisterClass::Time => "Time",
            RegisterClass::Ascii => "Text",
            RegisterClass::FixedBcd => "Value",
            RegisterClass::Binary => "Status",
            RegisterClass::TouContinuousCumulative => "TOU Continuous Cumulative Demand",
            RegisterClass::ExtendedBcd => "Extended Energy",
            RegisterClass::Unknown => "Unknown",
        }
    }
}

/// TOU rate of a display item. Stored as 0 = E (total), 1..4 = A..D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TouRate {
    E,
    A,
    B,
    C,
    D,
}

impl TouRate {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => TouRate::A,
            2 => TouRate::B,
            3 => TouRate::C,
            4 => TouRate::D,
            _ => TouRate::E,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TouRate::E => 0,
            TouRate::A => 1,
            TouRate::B => 2,
            TouRate::C => 3,
            TouRate::D => 4,
        }
    }
}

impl fmt::Display for TouRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TouRate::E => "Total",
            TouRate::A => "Rate A",
            TouRate::B => "Rate B",
            TouRate::C => "Rate C",
            TouRate::D => "Rate D",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DisplayMode {
    Normal,
    Alternate,
    Test,
}

/// One decoded display table entry. The value is never stored here; it is
/// read from the meter every time it is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayItem {
    raw: [u8; DISPLAY_RECORD_LENGTH],
    pub class: RegisterClass,
    pub register_type: u8,
    /// `None` when the id digit pair is zero
    pub display_id: Option<u8>,
    pub mode: DisplayMode,
    pub tou_rate: TouRate,
    pub upper_address: u8,
    pub lower_address: u8,
    #[serde(skip)]
    description: OnceCell<String>,
}

impl DisplayItem {
    /// Decodes a record. Returns `None` for the end-of-table sentinel.
    pub fn from_record(record: [u8; DISPLAY_RECORD_LENGTH], test_mode: bool) -> Option<Self> {
        if record[0] == DISPLAY_END_OF_TABLE {
            return None;
        }

        let mode = if test_mode {
            DisplayMode::Test
        } else if record[2] & DISPLAY_ALT_MODE_MASK != 0 {
            DisplayMode::Alternate
        } else {
            DisplayMode::Normal
        };
        let display_id = bcd_to_byte(record[1]);

        Some(DisplayItem {
            raw: record,
            class: RegisterClass::from_code(record[0]),
            register_type: (record[0] & DISPLAY_TYPE_MASK) >> 4,
            display_id: (display_id != 0).then_some(display_id),
            mode,
            tou_rate: TouRate::from_bits((record[2] & DISPLAY_RATE_MASK) >> 4),
            upper_address: bcd_to_byte(record[2] & DISPLAY_BANK_MASK),
            lower_address: record[3],
            description: OnceCell::new(),
        })
    }

    pub fn raw(&self) -> [u8; DISPLAY_RECORD_LENGTH] {
        self.raw
    }

    /// Bank and offset combined.
    pub fn default_address(&self) -> u16 {
        u16::from(self.upper_address) * 0x100 + u16::from(self.lower_address)
    }

    /// Description, computed by `describe` on first use.
    pub fn description_with(&self, describe: impl FnOnce(&DisplayItem) -> String) -> &str {
        self.description.get_or_init(|| describe(self))
    }

    /// Class label with the rate appended when it is not the total.
    pub fn generic_description(&self) -> String {
        match self.tou_rate {
            TouRate::E => self.class.label().to_string(),
            rate => format!("{} {rate}", self.class.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields() {
        // Type 2 energy, id 17, alternate, rate B, bank 5, offset 0x51
        let item = DisplayItem::from_record([0x20, 0x17, 0xA5, 0x51], false).unwrap();
        assert_eq!(item.class, RegisterClass::Energy);
        assert_eq!(item.register_type, 2);
        assert_eq!(item.display_id, Some(17));
        assert_eq!(item.mode, DisplayMode::Alternate);
        assert_eq!(item.tou_rate, TouRate::B);
        assert_eq!(item.upper_address, 5);
        assert_eq!(item.lower_address, 0x51);
        assert_eq!(item.default_address(), 0x0551);
    }

    #[test]
    fn test_sentinel_and_test_mode() {
        assert!(DisplayItem::from_record([0xFF, 0, 0, 0], false).is_none());
        let item = DisplayItem::from_record([0x0E, 0x00, 0x80, 0x00], true).unwrap();
        assert_eq!(item.class, RegisterClass::ExtendedBcd);
        assert_eq!(item.mode, DisplayMode::Test);
        assert_eq!(item.display_id, None);
    }

    #[test]
    fn test_class_codes() {
        assert_eq!(RegisterClass::from_code(0x05), RegisterClass::TotalContinuousCumulative);
        assert_eq!(RegisterClass::from_code(0x0D), RegisterClass::TouContinuousCumulative);
        assert_eq!(RegisterClass::from_code(0x0F), RegisterClass::Unknown);
        assert!(RegisterClass::TouContinuousCumulative.is_ccum());
    }

    #[test]
    fn test_description_computed_once() {
        let item = DisplayItem::from_record([0x02, 0x01, 0x30, 0x10], false).unwrap();
        let mut calls = 0;
        assert_eq!(
            item.description_with(|i| {
                calls += 1;
                i.generic_description()
            }),
            "Max Demand Rate C"
        );
        assert_eq!(item.description_with(|_| unreachable!()), "Max Demand Rate C");
        assert_eq!(calls, 1);
    }
}
