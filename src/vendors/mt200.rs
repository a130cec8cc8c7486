//! MT200 address map. CENTRON meters share most of it.

use crate::error::ScsError;
use crate::vendors::{
    CcumAddresses, DisplayTranslator, MeterAddressMap, MeterModel, Quantity, QuantityLayout,
    RegisterFormat, RegisterLocation,
};

pub const MT200_SERIAL_NUMBER: u16 = 0x0010;
pub const MT200_FIRMWARE_REVISION: u16 = 0x0002;
pub const MT200_CLOCK: u16 = 0x0100;
pub const MT200_CLOCK_RUN_FLAG: u16 = 0x0110;
pub const MT200_TOU_RUN_FLAG: u16 = 0x0111;
pub const MT200_STOP_METERING: u16 = 0x0112;
pub const MT200_RECONFIGURE_FLAG: u16 = 0x0113;
pub const MT200_LOAD_PROFILE_RUN_FLAG: u16 = 0x0114;
pub const MT200_LOAD_PROFILE_INTERVAL: u16 = 0x0115;
pub const MT200_TRANSFORMER_RATIO: u16 = 0x0060;
pub const MT200_DISPLAY_FORMAT: u16 = 0x0280;
pub const MT200_DISPLAY_TABLE: u16 = 0x0300;
pub const MT200_DISPLAY_TABLE_LENGTH: usize = 0x100;
pub const MT200_TOU_INFO: u16 = 0x0400;
pub const MT200_TOU_BASE: u16 = 0x0420;
pub const MT200_TOU_SEASON_AREA: usize = 0x100;
pub const MT200_TOU_CALENDAR: usize = 0x80;
/// Energy and demand registers, above the TOU calendar.
pub const MT200_WATTS_DELIVERED_ENERGY: u16 = 0x0600;
pub const MT200_VARS_DELIVERED_ENERGY: u16 = 0x0604;
pub const MT200_WATTS_DELIVERED_MAX_DEMAND: u16 = 0x0610;
pub const MT200_VARS_DELIVERED_MAX_DEMAND: u16 = 0x0614;

const ENERGY: RegisterFormat = RegisterFormat::FloatingBcd { length: 4 };
const DEMAND: RegisterFormat = RegisterFormat::FloatingBcd { length: 4 };

/// Cumulative and max demand registers per rate, Total first.
pub static MT200_CCUM_TABLE: [CcumAddresses; 5] = [
    CcumAddresses { cumulative: 0x0620, max_demand: MT200_WATTS_DELIVERED_MAX_DEMAND },
    CcumAddresses { cumulative: 0x0624, max_demand: 0x0640 },
    CcumAddresses { cumulative: 0x0628, max_demand: 0x0644 },
    CcumAddresses { cumulative: 0x062C, max_demand: 0x0648 },
    CcumAddresses { cumulative: 0x0630, max_demand: 0x064C },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Mt200;

impl MeterAddressMap for Mt200 {
    fn model(&self) -> MeterModel {
        MeterModel::Mt200
    }

    fn serial_number_address(&self) -> u16 {
        MT200_SERIAL_NUMBER
    }

    fn firmware_revision_address(&self) -> u16 {
        MT200_FIRMWARE_REVISION
    }

    fn clock_address(&self) -> u16 {
        MT200_CLOCK
    }

    fn clock_run_flag_address(&self) -> u16 {
        MT200_CLOCK_RUN_FLAG
    }

    fn tou_run_flag_address(&self) -> u16 {
        MT200_TOU_RUN_FLAG
    }

    fn stop_metering_address(&self) -> u16 {
        MT200_STOP_METERING
    }

    fn reconfigure_flag_address(&self) -> u16 {
        MT200_RECONFIGURE_FLAG
    }

    fn load_profile_run_flag_address(&self) -> u16 {
        MT200_LOAD_PROFILE_RUN_FLAG
    }

    fn load_profile_interval_address(&self) -> u16 {
        MT200_LOAD_PROFILE_INTERVAL
    }

    fn display_table_address(&self) -> Result<u16, ScsError> {
        Ok(MT200_DISPLAY_TABLE)
    }

    fn display_table_length(&self) -> Result<usize, ScsError> {
        Ok(MT200_DISPLAY_TABLE_LENGTH)
    }

    fn display_format_address(&self) -> u16 {
        MT200_DISPLAY_FORMAT
    }

    fn tou_info_address(&self) -> u16 {
        MT200_TOU_INFO
    }

    fn tou_base_address(&self) -> u16 {
        MT200_TOU_BASE
    }

    fn tou_calendar_size(&self) -> usize {
        MT200_TOU_CALENDAR
    }

    fn tou_season_area_size(&self) -> usize {
        MT200_TOU_SEASON_AREA
    }

    fn transformer_ratio_address(&self) -> Result<u16, ScsError> {
        Ok(MT200_TRANSFORMER_RATIO)
    }

    fn max_upload(&self) -> usize {
        64
    }

    fn max_download(&self) -> usize {
        32
    }

    fn quantity_layout(&self, quantity: Quantity) -> Option<QuantityLayout> {
        match quantity {
            Quantity::WattsDelivered => Some(QuantityLayout {
                energy: Some(RegisterLocation::new(MT200_WATTS_DELIVERED_ENERGY, ENERGY)),
                max_demand: Some(RegisterLocation::new(MT200_WATTS_DELIVERED_MAX_DEMAND, DEMAND)),
            }),
            Quantity::VarsDelivered => Some(QuantityLayout {
                energy: Some(RegisterLocation::new(MT200_VARS_DELIVERED_ENERGY, ENERGY)),
                max_demand: Some(RegisterLocation::new(MT200_VARS_DELIVERED_MAX_DEMAND, DEMAND)),
            }),
            _ => None,
        }
    }
}

impl DisplayTranslator for Mt200 {
    fn ccum_table(&self) -> Option<&'static [CcumAddresses; 5]> {
        Some(&MT200_CCUM_TABLE)
    }
}
