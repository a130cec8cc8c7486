//! Reading and writing the value behind a display item.
//!
//! Values are fetched on every call; nothing read here is cached.

use serde::Serialize;

use crate::display::format::{format_display_value, DisplayFormats};
use crate::display::item::{DisplayItem, RegisterClass};
use crate::error::ScsError;
use crate::payload::bcd::{
    bcd_to_byte, bcd_to_int, fixed_bcd_to_string, float_to_fixed_bcd, float_to_floating_bcd,
    floating_bcd_to_string, reorder_and_read_float,
};
use crate::scs::protocol::ScsProtocol;
use crate::scs::transport::ScsTransport;
use crate::vendors::DisplayTranslator;

const ENERGY_LENGTH: usize = 7;
const ENERGY_DECIMAL_BYTES: usize = 4;
const LAST_SEASON_LENGTH: usize = 3;
const DEMAND_LENGTH: usize = 4;
const ASCII_LENGTH: usize = 8;

/// A display item read from the meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayValue {
    pub description: String,
    /// Value as stored, before display formatting
    pub raw: String,
    /// Value as the meter's display shows it
    pub value: String,
}

/// Storage of energy, max demand and cumulative registers by register type.
fn register_length(item: &DisplayItem) -> Result<(usize, bool), ScsError> {
    let fixed = item.class == RegisterClass::Energy;
    match item.register_type {
        0 | 2 | 3 if fixed => Ok((ENERGY_LENGTH, true)),
        0 | 2 | 3 => Ok((DEMAND_LENGTH, false)),
        7 => Ok((LAST_SEASON_LENGTH, false)),
        other => Err(ScsError::unsupported(format!(
            "{:?} register type {other}",
            item.class
        ))),
    }
}

/// Formats a `YY MM DD` BCD date by register type.
pub fn format_date(bytes: &[u8], register_type: u8) -> Result<String, ScsError> {
    let (yy, mm, dd) = (bcd_to_byte(bytes[0]), bcd_to_byte(bytes[1]), bcd_to_byte(bytes[2]));
    let text = match register_type {
        0 => format!("{mm:02}-{dd:02}-{yy:02}"),
        1 => format!("{dd:02}-{mm:02}-{yy:02}"),
        2 => format!("{yy:02}-{mm:02}-{dd:02}"),
        3 => format!("{mm:02}-{dd:02}"),
        4 => format!("{dd:02}-{mm:02}"),
        other => return Err(ScsError::unsupported(format!("date register type {other}"))),
    };
    Ok(text)
}

/// Formats an `HH MM SS` BCD time by register type.
pub fn format_time(bytes: &[u8], register_type: u8) -> Result<String, ScsError> {
    let (hh, mm, ss) = (bcd_to_byte(bytes[0]), bcd_to_byte(bytes[1]), bcd_to_byte(bytes[2]));
    match register_type {
        0 => Ok(format!("{hh:02}:{mm:02}:{ss:02}")),
        1 => Ok(format!("{hh:02}:{mm:02}")),
        other => Err(ScsError::unsupported(format!("time register type {other}"))),
    }
}

/// Formats a status byte, whole or one nibble.
pub fn format_binary(byte: u8, register_type: u8) -> Result<String, ScsError> {
    match register_type {
        0 => Ok(byte.to_string()),
        1 => Ok((byte >> 4).to_string()),
        2 => Ok((byte & 0x0F).to_string()),
        other => Err(ScsError::unsupported(format!("binary register type {other}"))),
    }
}

/// Adds two decimal strings exactly, keeping the longer fraction.
fn add_decimal_strings(a: &str, b: &str) -> String {
    let decimals = |s: &str| s.split_once('.').map_or(0, |(_, f)| f.len());
    let precision = decimals(a).max(decimals(b));
    let sum = scaled_decimal(a, precision).saturating_add(scaled_decimal(b, precision));

    let sign = if sum < 0 { "-" } else { "" };
    let magnitude = sum.unsigned_abs();
    if precision == 0 {
        return format!("{sign}{magnitude}");
    }
    let scale = 10u128.pow(precision as u32);
    format!(
        "{sign}{}.{:0precision$}",
        magnitude / scale,
        magnitude % scale
    )
}

/// `text` in units of 10^-`precision`. Anything but a digit counts as 0.
fn scaled_decimal(text: &str, precision: usize) -> i128 {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
    let padding = precision.saturating_sub(frac_part.chars().count());

    let value = int_part
        .chars()
        .chain(frac_part.chars())
        .chain(std::iter::repeat('0').take(padding))
        .fold(0i128, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(i128::from(c.to_digit(10).unwrap_or(0)))
        });
    if negative {
        -value
    } else {
        value
    }
}

impl DisplayItem {
    /// Reads the item's current value and formats it for display.
    pub async fn read_current_value<T, D>(
        &self,
        protocol: &mut ScsProtocol<T>,
        translator: &D,
        formats: &DisplayFormats,
    ) -> Result<DisplayValue, ScsError>
    where
        T: ScsTransport,
        D: DisplayTranslator + ?Sized,
    {
        let description = self
            .description_with(|item| translator.describe(item))
            .to_string();
        let raw = self.read_raw(protocol, translator, &description).await?;
        let value = match formats.for_class(self.class) {
            Some(format) => format_display_value(&raw, format),
            None => raw.clone(),
        };
        Ok(DisplayValue {
            description,
            raw,
            value,
        })
    }

    async fn read_raw<T, D>(
        &self,
        protocol: &mut ScsProtocol<T>,
        translator: &D,
        field: &str,
    ) -> Result<String, ScsError>
    where
        T: ScsTransport,
        D: DisplayTranslator + ?Sized,
    {
        let address = translator.basepage_address(self);
        match self.class {
            RegisterClass::Energy | RegisterClass::MaxDemand | RegisterClass::Cumulative => {
                let (length, fixed) = register_length(self)?;
                let bytes = protocol.read(address, length, field).await?;
                if fixed {
                    Ok(fixed_bcd_to_string(&bytes, ENERGY_DECIMAL_BYTES))
                } else {
                    Ok(floating_bcd_to_string(&bytes, length))
                }
            }
            RegisterClass::Demand => {
                let format = translator.demand_format(self);
                let bytes = protocol.read(address, format.length(), field).await?;
                Ok(format.decode_string(&bytes))
            }
            RegisterClass::TotalContinuousCumulative | RegisterClass::TouContinuousCumulative => {
                let sources = translator.ccum_addresses(self)?;
                let cumulative = protocol.read(sources.cumulative, DEMAND_LENGTH, field).await?;
                let max_demand = protocol.read(sources.max_demand, DEMAND_LENGTH, field).await?;
                Ok(add_decimal_strings(
                    &floating_bcd_to_string(&cumulative, DEMAND_LENGTH),
                    &floating_bcd_to_string(&max_demand, DEMAND_LENGTH),
                ))
            }
            RegisterClass::Instantaneous => {
                let bytes = protocol.read(address, 4, field).await?;
                Ok(reorder_and_read_float(&bytes).to_string())
            }
            RegisterClass::FloatingBcd => {
                let bytes = protocol.read(address, 4, field).await?;
                Ok(floating_bcd_to_string(&bytes, 4))
            }
            RegisterClass::IntegerBcd => {
                let bytes = protocol.read(address, 3, field).await?;
                Ok(bcd_to_int(&bytes).to_string())
            }
            RegisterClass::FixedBcd => {
                let bytes = protocol.read(address, 3, field).await?;
                Ok(fixed_bcd_to_string(&bytes, 1))
            }
            RegisterClass::ExtendedBcd => {
                let bytes = protocol.read(address, ENERGY_LENGTH, field).await?;
                Ok(fixed_bcd_to_string(&bytes, ENERGY_DECIMAL_BYTES))
            }
            RegisterClass::Ascii => {
                let bytes = protocol.read(address, ASCII_LENGTH, field).await?;
                Ok(String::from_utf8_lossy(&bytes)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string())
            }
            RegisterClass::Date => {
                let bytes = protocol.read(address, 3, field).await?;
                format_date(&bytes, self.register_type)
            }
            RegisterClass::Time => {
                let bytes = protocol.read(address, 3, field).await?;
                format_time(&bytes, self.register_type)
            }
            RegisterClass::Binary => {
                let byte = protocol.read_byte(address, field).await?;
                format_binary(byte, self.register_type)
            }
            RegisterClass::Unknown => Err(ScsError::unsupported(format!(
                "display record {:02X?}",
                self.raw()
            ))),
        }
    }

    /// Stores a new value. Only energy, max demand and cumulative registers
    /// are writable.
    pub async fn write_new_value<T, D>(
        &self,
        protocol: &mut ScsProtocol<T>,
        translator: &D,
        value: f64,
    ) -> Result<(), ScsError>
    where
        T: ScsTransport,
        D: DisplayTranslator + ?Sized,
    {
        if !matches!(
            self.class,
            RegisterClass::Energy | RegisterClass::MaxDemand | RegisterClass::Cumulative
        ) {
            return Err(ScsError::unsupported(format!("writing {:?} values", self.class)));
        }
        if value < 0.0 || !value.is_finite() {
            return Err(ScsError::InvalidArgument(format!("register value {value}")));
        }

        let (length, fixed) = register_length(self)?;
        let bytes = if fixed {
            float_to_fixed_bcd(value, length, ENERGY_DECIMAL_BYTES)
        } else {
            float_to_floating_bcd(value, length)
        };
        let address = translator.basepage_address(self);
        let field = self
            .description_with(|item| translator.describe(item))
            .to_string();
        protocol.write(address, &bytes, &field).await
    }
}
