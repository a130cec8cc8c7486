//! Meter Model Extension System
//!
//! Each SCS meter family stores the same logical items at different basepage
//! addresses and labels its display items differently. Those differences are
//! expressed as two traits implemented once per model:
//!
//! - [`MeterAddressMap`]: where things live, how big transfers may be, which
//!   features exist at all
//! - [`DisplayTranslator`]: how display items map to addresses, descriptions
//!   and demand storage
//!
//! [`ScsMeter`] is the pair of them, and is what the device engine holds.

pub mod centron;
pub mod fulcrum;
pub mod mt200;
pub mod vectron;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::display::item::DisplayItem;
use crate::error::ScsError;
use crate::payload::bcd::{
    fixed_bcd_to_float, fixed_bcd_to_string, float_to_fixed_bcd, float_to_floating_bcd,
    floating_bcd_to_float, floating_bcd_to_string, float_to_reordered_bytes,
    reorder_and_read_float,
};
use crate::constants::{CLOCK_LENGTH, DISPLAY_FORMAT_BLOCK_LENGTH};
use crate::tou::info::TouInfoLayout;
use crate::tou::schedule::TouArea;

pub use centron::Centron;
pub use fulcrum::Fulcrum;
pub use mt200::Mt200;
pub use vectron::Vectron;

/// Supported meter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeterModel {
    Mt200,
    Centron,
    Fulcrum,
    Vectron,
}

/// Identify codes reported by each family.
pub static IDENTIFY_CODES: Lazy<HashMap<&'static str, MeterModel>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("MT2", MeterModel::Mt200);
    map.insert("CEN", MeterModel::Centron);
    map.insert("FUL", MeterModel::Fulcrum);
    map.insert("VEC", MeterModel::Vectron);
    map
});

impl MeterModel {
    pub fn from_identify(code: &str) -> Option<Self> {
        IDENTIFY_CODES.get(code.trim()).copied()
    }

    pub fn identify_code(self) -> &'static str {
        match self {
            MeterModel::Mt200 => "MT2",
            MeterModel::Centron => "CEN",
            MeterModel::Fulcrum => "FUL",
            MeterModel::Vectron => "VEC",
        }
    }

    /// Address map and translator for this family.
    pub fn meter(self) -> Box<dyn ScsMeter> {
        match self {
            MeterModel::Mt200 => Box::new(Mt200),
            MeterModel::Centron => Box::new(Centron::default()),
            MeterModel::Fulcrum => Box::new(Fulcrum),
            MeterModel::Vectron => Box::new(Vectron),
        }
    }
}

impl fmt::Display for MeterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeterModel::Mt200 => "MT200",
            MeterModel::Centron => "CENTRON",
            MeterModel::Fulcrum => "FULCRUM",
            MeterModel::Vectron => "VECTRON",
        };
        f.write_str(name)
    }
}

impl FromStr for MeterModel {
    type Err = ScsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mt200" | "mt2" => Ok(MeterModel::Mt200),
            "centron" | "cen" => Ok(MeterModel::Centron),
            "fulcrum" | "ful" => Ok(MeterModel::Fulcrum),
            "vectron" | "vec" => Ok(MeterModel::Vectron),
            other => Err(ScsError::InvalidArgument(format!("unknown meter model '{other}'"))),
        }
    }
}

/// Quantities readable as energy plus max demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quantity {
    WattsDelivered,
    WattsReceived,
    VarsDelivered,
    VarsReceived,
    VoltAmps,
}

impl Quantity {
    pub const ALL: [Quantity; 5] = [
        Quantity::WattsDelivered,
        Quantity::WattsReceived,
        Quantity::VarsDelivered,
        Quantity::VarsReceived,
        Quantity::VoltAmps,
    ];
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::WattsDelivered => "Watts Delivered",
            Quantity::WattsReceived => "Watts Received",
            Quantity::VarsDelivered => "Vars Delivered",
            Quantity::VarsReceived => "Vars Received",
            Quantity::VoltAmps => "VA",
        };
        f.write_str(name)
    }
}

/// How a numeric register is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFormat {
    FixedBcd { length: usize, decimal_bytes: usize },
    FloatingBcd { length: usize },
    /// Byte-reversed IEEE single
    Float,
}

impl RegisterFormat {
    pub fn length(&self) -> usize {
        match *self {
            RegisterFormat::FixedBcd { length, .. } => length,
            RegisterFormat::FloatingBcd { length } => length,
            RegisterFormat::Float => 4,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> f64 {
        match *self {
            RegisterFormat::FixedBcd { decimal_bytes, .. } => fixed_bcd_to_float(bytes, decimal_bytes),
            RegisterFormat::FloatingBcd { length } => floating_bcd_to_float(bytes, length),
            RegisterFormat::Float => f64::from(reorder_and_read_float(bytes)),
        }
    }

    /// Decimal text of the stored value, keeping the stored digits.
    pub fn decode_string(&self, bytes: &[u8]) -> String {
        match *self {
            RegisterFormat::FixedBcd { decimal_bytes, .. } => fixed_bcd_to_string(bytes, decimal_bytes),
            RegisterFormat::FloatingBcd { length } => floating_bcd_to_string(bytes, length),
            RegisterFormat::Float => reorder_and_read_float(bytes).to_string(),
        }
    }

    pub fn encode(&self, value: f64) -> Vec<u8> {
        match *self {
            RegisterFormat::FixedBcd {
                length,
                decimal_bytes,
            } => float_to_fixed_bcd(value, length, decimal_bytes),
            RegisterFormat::FloatingBcd { length } => float_to_floating_bcd(value, length),
            RegisterFormat::Float => float_to_reordered_bytes(value as f32).to_vec(),
        }
    }
}

/// A register's address and storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLocation {
    pub address: u16,
    pub format: RegisterFormat,
}

impl RegisterLocation {
    pub const fn new(address: u16, format: RegisterFormat) -> Self {
        RegisterLocation { address, format }
    }
}

/// Where a quantity's registers are. Either may be missing on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantityLayout {
    pub energy: Option<RegisterLocation>,
    pub max_demand: Option<RegisterLocation>,
}

/// The two registers a continuous cumulative demand is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcumAddresses {
    pub cumulative: u16,
    pub max_demand: u16,
}

/// A named span of basepage owned by one logical item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub start: u16,
    pub length: usize,
}

impl MemoryRegion {
    pub const fn new(name: &'static str, start: u16, length: usize) -> Self {
        MemoryRegion { name, start, length }
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        usize::from(self.start) + self.length
    }

    /// True if the two spans share a byte. The same register listed twice
    /// does not count.
    pub fn overlaps(&self, other: &MemoryRegion) -> bool {
        if self.start == other.start && self.length == other.length {
            return false;
        }
        usize::from(self.start) < other.end() && usize::from(other.start) < self.end()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0x{:04X}..0x{:04X}", self.name, self.start, self.end())
    }
}

/// Every fixed region a meter family defines, in address-map order.
pub fn memory_regions(meter: &dyn ScsMeter) -> Vec<MemoryRegion> {
    let mut regions = vec![
        MemoryRegion::new("serial number", meter.serial_number_address(), meter.serial_number_length()),
        MemoryRegion::new("firmware revision", meter.firmware_revision_address(), 2),
        MemoryRegion::new("clock", meter.clock_address(), CLOCK_LENGTH),
        MemoryRegion::new("clock run flag", meter.clock_run_flag_address(), 1),
        MemoryRegion::new("TOU run flag", meter.tou_run_flag_address(), 1),
        MemoryRegion::new("stop metering", meter.stop_metering_address(), 1),
        MemoryRegion::new("reconfigure flag", meter.reconfigure_flag_address(), 1),
        MemoryRegion::new("load profile run flag", meter.load_profile_run_flag_address(), 1),
        MemoryRegion::new("load profile interval", meter.load_profile_interval_address(), 1),
        MemoryRegion::new("display formats", meter.display_format_address(), DISPLAY_FORMAT_BLOCK_LENGTH),
    ];
    if let (Ok(address), Ok(length)) = (meter.display_table_address(), meter.display_table_length()) {
        regions.push(MemoryRegion::new("display table", address, length));
    }
    if let Ok(address) = meter.transformer_ratio_address() {
        regions.push(MemoryRegion::new("transformer ratio", address, 2));
    }

    let area = meter.tou_area();
    regions.push(MemoryRegion::new("TOU info", area.info_address, area.layout.encoded_len()));
    regions.push(MemoryRegion::new("TOU seasons", area.season_address(), area.season_area_size));
    regions.push(MemoryRegion::new("TOU calendar", area.calendar_address(), area.calendar_size));

    for quantity in Quantity::ALL {
        let Some(layout) = meter.quantity_layout(quantity) else {
            continue;
        };
        for (name, register) in [("energy", layout.energy), ("max demand", layout.max_demand)] {
            if let Some(register) = register {
                regions.push(MemoryRegion::new(name, register.address, register.format.length()));
            }
        }
    }
    if let Some(table) = meter.ccum_table() {
        for sources in table {
            regions.push(MemoryRegion::new("ccum cumulative", sources.cumulative, 4));
            regions.push(MemoryRegion::new("ccum max demand", sources.max_demand, 4));
        }
    }
    regions
}

/// Pairs of regions that share bytes.
pub fn overlapping_regions(regions: &[MemoryRegion]) -> Vec<(MemoryRegion, MemoryRegion)> {
    let mut overlaps = Vec::new();
    for (index, a) in regions.iter().enumerate() {
        for b in &regions[index + 1..] {
            if a.overlaps(b) {
                overlaps.push((*a, *b));
            }
        }
    }
    overlaps
}

/// Basepage addresses and limits of one meter family.
pub trait MeterAddressMap: Send + Sync {
    fn model(&self) -> MeterModel;

    fn is_fulcrum(&self) -> bool {
        false
    }

    fn serial_number_address(&self) -> u16;

    fn serial_number_length(&self) -> usize {
        9
    }

    fn firmware_revision_address(&self) -> u16;
    fn clock_address(&self) -> u16;
    fn clock_run_flag_address(&self) -> u16;
    fn tou_run_flag_address(&self) -> u16;
    fn stop_metering_address(&self) -> u16;
    fn reconfigure_flag_address(&self) -> u16;
    fn load_profile_run_flag_address(&self) -> u16;

    /// Byte holding the load profile interval in minutes.
    fn load_profile_interval_address(&self) -> u16;

    fn display_table_address(&self) -> Result<u16, ScsError>;
    fn display_table_length(&self) -> Result<usize, ScsError>;
    fn display_format_address(&self) -> u16;

    fn tou_info_address(&self) -> u16;
    fn tou_base_address(&self) -> u16;
    fn tou_calendar_size(&self) -> usize;
    fn tou_season_area_size(&self) -> usize;

    fn tou_info_layout(&self) -> TouInfoLayout {
        if self.is_fulcrum() {
            TouInfoLayout::Fulcrum
        } else {
            TouInfoLayout::Standard
        }
    }

    /// Where the TOU info, seasons and calendar sit.
    fn tou_area(&self) -> TouArea {
        TouArea {
            info_address: self.tou_info_address(),
            base_address: self.tou_base_address(),
            calendar_size: self.tou_calendar_size(),
            season_area_size: self.tou_season_area_size(),
            layout: self.tou_info_layout(),
        }
    }

    fn transformer_ratio_address(&self) -> Result<u16, ScsError>;

    fn max_upload(&self) -> usize;
    fn max_download(&self) -> usize;

    fn quantity_layout(&self, quantity: Quantity) -> Option<QuantityLayout>;
}

/// Display item interpretation for one meter family.
pub trait DisplayTranslator: Send + Sync {
    fn basepage_address(&self, item: &DisplayItem) -> u16 {
        item.default_address()
    }

    fn describe(&self, item: &DisplayItem) -> String {
        item.generic_description()
    }

    /// Storage of a demand item. Type 1 is present demand.
    fn demand_format(&self, _item: &DisplayItem) -> RegisterFormat {
        RegisterFormat::FloatingBcd { length: 4 }
    }

    /// Per-rate ccum sources, indexed Total, A, B, C, D.
    fn ccum_table(&self) -> Option<&'static [CcumAddresses; 5]> {
        None
    }

    fn ccum_addresses(&self, item: &DisplayItem) -> Result<CcumAddresses, ScsError> {
        self.ccum_table()
            .map(|table| table[item.tou_rate.index()])
            .ok_or_else(|| ScsError::unsupported("continuous cumulative demand"))
    }
}

/// Everything the device engine needs to know about a meter family.
pub trait ScsMeter: MeterAddressMap + DisplayTranslator {}

impl<T: MeterAddressMap + DisplayTranslator> ScsMeter for T {}
