//! VECTRON address map and display translation.
//!
//! VECTRON display records for continuous cumulative demand point straight at
//! the cumulative register; the matching max demand register sits
//! [`VECTRON_CCUM_MAX_DEMAND_DELTA`] bytes above it. Present demand is kept as
//! a byte-reversed float.

use crate::display::item::{DisplayItem, RegisterClass, TouRate};
use crate::error::ScsError;
use crate::vendors::{
    CcumAddresses, DisplayTranslator, MeterAddressMap, MeterModel, Quantity, QuantityLayout,
    RegisterFormat, RegisterLocation,
};

pub const VECTRON_SERIAL_NUMBER: u16 = 0x1000;
pub const VECTRON_FIRMWARE_REVISION: u16 = 0x1010;
pub const VECTRON_CLOCK: u16 = 0x1100;
pub const VECTRON_CLOCK_RUN_FLAG: u16 = 0x1110;
pub const VECTRON_TOU_RUN_FLAG: u16 = 0x1111;
pub const VECTRON_STOP_METERING: u16 = 0x1112;
pub const VECTRON_RECONFIGURE_FLAG: u16 = 0x1113;
pub const VECTRON_LOAD_PROFILE_RUN_FLAG: u16 = 0x1114;
pub const VECTRON_LOAD_PROFILE_INTERVAL: u16 = 0x1115;
pub const VECTRON_TRANSFORMER_RATIO: u16 = 0x1060;
pub const VECTRON_DISPLAY_FORMAT: u16 = 0x1280;
pub const VECTRON_DISPLAY_TABLE: u16 = 0x1300;
pub const VECTRON_DISPLAY_TABLE_LENGTH: usize = 0x100;
pub const VECTRON_TOU_INFO: u16 = 0x1800;
pub const VECTRON_TOU_BASE: u16 = 0x1820;

/// Offset from a cumulative register to its max demand register.
pub const VECTRON_CCUM_MAX_DEMAND_DELTA: u16 = 0x0040;

const KWH: RegisterFormat = RegisterFormat::FixedBcd {
    length: 7,
    decimal_bytes: 4,
};
const KW: RegisterFormat = RegisterFormat::FloatingBcd { length: 4 };

#[derive(Debug, Clone, Copy, Default)]
pub struct Vectron;

impl MeterAddressMap for Vectron {
    fn model(&self) -> MeterModel {
        MeterModel::Vectron
    }

    fn serial_number_address(&self) -> u16 {
        VECTRON_SERIAL_NUMBER
    }

    fn firmware_revision_address(&self) -> u16 {
        VECTRON_FIRMWARE_REVISION
    }

    fn clock_address(&self) -> u16 {
        VECTRON_CLOCK
    }

    fn clock_run_flag_address(&self) -> u16 {
        VECTRON_CLOCK_RUN_FLAG
    }

    fn tou_run_flag_address(&self) -> u16 {
        VECTRON_TOU_RUN_FLAG
    }

    fn stop_metering_address(&self) -> u16 {
        VECTRON_STOP_METERING
    }

    fn reconfigure_flag_address(&self) -> u16 {
        VECTRON_RECONFIGURE_FLAG
    }

    fn load_profile_run_flag_address(&self) -> u16 {
        VECTRON_LOAD_PROFILE_RUN_FLAG
    }

    fn load_profile_interval_address(&self) -> u16 {
        VECTRON_LOAD_PROFILE_INTERVAL
    }

    fn display_table_address(&self) -> Result<u16, ScsError> {
        Ok(VECTRON_DISPLAY_TABLE)
    }

    fn display_table_length(&self) -> Result<usize, ScsError> {
        Ok(VECTRON_DISPLAY_TABLE_LENGTH)
    }

    fn display_format_address(&self) -> u16 {
        VECTRON_DISPLAY_FORMAT
    }

    fn tou_info_address(&self) -> u16 {
        VECTRON_TOU_INFO
    }

    fn tou_base_address(&self) -> u16 {
        VECTRON_TOU_BASE
    }

    fn tou_calendar_size(&self) -> usize {
        0x100
    }

    fn tou_season_area_size(&self) -> usize {
        0x200
    }

    fn transformer_ratio_address(&self) -> Result<u16, ScsError> {
        Ok(VECTRON_TRANSFORMER_RATIO)
    }

    fn max_upload(&self) -> usize {
        128
    }

    fn max_download(&self) -> usize {
        64
    }

    fn quantity_layout(&self, quantity: Quantity) -> Option<QuantityLayout> {
        let (energy, max_demand) = match quantity {
            Quantity::WattsDelivered => (0x1400, 0x1480),
            Quantity::WattsReceived => (0x1407, 0x1484),
            Quantity::VarsDelivered => (0x140E, 0x1488),
            Quantity::VarsReceived => (0x1415, 0x148C),
            Quantity::VoltAmps => (0x141C, 0x1490),
        };
        Some(QuantityLayout {
            energy: Some(RegisterLocation::new(energy, KWH)),
            max_demand: Some(RegisterLocation::new(max_demand, KW)),
        })
    }
}

impl DisplayTranslator for Vectron {
    fn describe(&self, item: &DisplayItem) -> String {
        match (item.class, item.tou_rate) {
            (RegisterClass::Energy, TouRate::E) => "Total kWh".to_string(),
            (RegisterClass::Energy, TouRate::A) => "Rate A kWh".to_string(),
            (RegisterClass::Energy, TouRate::B) => "Rate B kWh".to_string(),
            (RegisterClass::Energy, TouRate::C) => "Rate C kWh".to_string(),
            (RegisterClass::Energy, TouRate::D) => "Rate D kWh".to_string(),
            (RegisterClass::MaxDemand, TouRate::E) => "Max kW".to_string(),
            (RegisterClass::MaxDemand, TouRate::A) => "Rate A Max kW".to_string(),
            (RegisterClass::MaxDemand, TouRate::B) => "Rate B Max kW".to_string(),
            (RegisterClass::MaxDemand, TouRate::C) => "Rate C Max kW".to_string(),
            (RegisterClass::MaxDemand, TouRate::D) => "Rate D Max kW".to_string(),
            (RegisterClass::Cumulative, TouRate::E) => "Cum kW".to_string(),
            (RegisterClass::Cumulative, TouRate::A) => "Rate A Cum kW".to_string(),
            (RegisterClass::Cumulative, TouRate::B) => "Rate B Cum kW".to_string(),
            (RegisterClass::Cumulative, TouRate::C) => "Rate C Cum kW".to_string(),
            (RegisterClass::Cumulative, TouRate::D) => "Rate D Cum kW".to_string(),
            (RegisterClass::TouContinuousCumulative, TouRate::A) => "Rate A CCum kW".to_string(),
            (RegisterClass::TouContinuousCumulative, TouRate::B) => "Rate B CCum kW".to_string(),
            (RegisterClass::TouContinuousCumulative, TouRate::C) => "Rate C CCum kW".to_string(),
            (RegisterClass::TouContinuousCumulative, TouRate::D) => "Rate D CCum kW".to_string(),
            (RegisterClass::TotalContinuousCumulative, _)
            | (RegisterClass::TouContinuousCumulative, TouRate::E) => "CCum kW".to_string(),
            (RegisterClass::Demand, _) if item.register_type == 1 => "Present kW".to_string(),
            (RegisterClass::Demand, _) => "Previous kW".to_string(),
            _ => item.generic_description(),
        }
    }

    fn demand_format(&self, item: &DisplayItem) -> RegisterFormat {
        if item.register_type == 1 {
            RegisterFormat::Float
        } else {
            RegisterFormat::FloatingBcd { length: 4 }
        }
    }

    fn ccum_addresses(&self, item: &DisplayItem) -> Result<CcumAddresses, ScsError> {
        let cumulative = self.basepage_address(item);
        Ok(CcumAddresses {
            cumulative,
            max_demand: cumulative.wrapping_add(VECTRON_CCUM_MAX_DEMAND_DELTA),
        })
    }
}
