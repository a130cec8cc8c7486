//! FULCRUM address map.
//!
//! FULCRUM meters have no programmable display lists and no transformer
//! ratio register. Their TOU info block uses absolute addresses with the
//! calendar ahead of the seasons, and their switchpoints number outputs in
//! the reverse bit order.

use crate::error::ScsError;
use crate::vendors::{
    DisplayTranslator, MeterAddressMap, MeterModel, Quantity, QuantityLayout, RegisterFormat,
    RegisterLocation,
};

pub const FULCRUM_SERIAL_NUMBER: u16 = 0x0020;
pub const FULCRUM_FIRMWARE_REVISION: u16 = 0x0004;
pub const FULCRUM_CLOCK: u16 = 0x0200;
pub const FULCRUM_CLOCK_RUN_FLAG: u16 = 0x0210;
pub const FULCRUM_TOU_RUN_FLAG: u16 = 0x0211;
pub const FULCRUM_STOP_METERING: u16 = 0x0212;
pub const FULCRUM_RECONFIGURE_FLAG: u16 = 0x0213;
pub const FULCRUM_LOAD_PROFILE_RUN_FLAG: u16 = 0x0214;
pub const FULCRUM_LOAD_PROFILE_INTERVAL: u16 = 0x0215;
pub const FULCRUM_DISPLAY_FORMAT: u16 = 0x0240;
pub const FULCRUM_TOU_INFO: u16 = 0x0800;
pub const FULCRUM_TOU_BASE: u16 = 0x0820;

const KWH: RegisterFormat = RegisterFormat::FixedBcd {
    length: 7,
    decimal_bytes: 4,
};
const KW: RegisterFormat = RegisterFormat::FloatingBcd { length: 4 };

#[derive(Debug, Clone, Copy, Default)]
pub struct Fulcrum;

impl MeterAddressMap for Fulcrum {
    fn model(&self) -> MeterModel {
        MeterModel::Fulcrum
    }

    fn is_fulcrum(&self) -> bool {
        true
    }

    fn serial_number_address(&self) -> u16 {
        FULCRUM_SERIAL_NUMBER
    }

    fn serial_number_length(&self) -> usize {
        8
    }

    fn firmware_revision_address(&self) -> u16 {
        FULCRUM_FIRMWARE_REVISION
    }

    fn clock_address(&self) -> u16 {
        FULCRUM_CLOCK
    }

    fn clock_run_flag_address(&self) -> u16 {
        FULCRUM_CLOCK_RUN_FLAG
    }

    fn tou_run_flag_address(&self) -> u16 {
        FULCRUM_TOU_RUN_FLAG
    }

    fn stop_metering_address(&self) -> u16 {
        FULCRUM_STOP_METERING
    }

    fn reconfigure_flag_address(&self) -> u16 {
        FULCRUM_RECONFIGURE_FLAG
    }

    fn load_profile_run_flag_address(&self) -> u16 {
        FULCRUM_LOAD_PROFILE_RUN_FLAG
    }

    fn load_profile_interval_address(&self) -> u16 {
        FULCRUM_LOAD_PROFILE_INTERVAL
    }

    fn display_table_address(&self) -> Result<u16, ScsError> {
        Err(ScsError::unsupported("display lists on FULCRUM"))
    }

    fn display_table_length(&self) -> Result<usize, ScsError> {
        Err(ScsError::unsupported("display lists on FULCRUM"))
    }

    fn display_format_address(&self) -> u16 {
        FULCRUM_DISPLAY_FORMAT
    }

    fn tou_info_address(&self) -> u16 {
        FULCRUM_TOU_INFO
    }

    fn tou_base_address(&self) -> u16 {
        FULCRUM_TOU_BASE
    }

    fn tou_calendar_size(&self) -> usize {
        0xC0
    }

    fn tou_season_area_size(&self) -> usize {
        0x140
    }

    fn transformer_ratio_address(&self) -> Result<u16, ScsError> {
        Err(ScsError::unsupported("transformer ratio on FULCRUM"))
    }

    fn max_upload(&self) -> usize {
        32
    }

    fn max_download(&self) -> usize {
        16
    }

    fn quantity_layout(&self, quantity: Quantity) -> Option<QuantityLayout> {
        match quantity {
            Quantity::WattsDelivered => Some(QuantityLayout {
                energy: Some(RegisterLocation::new(0x0600, KWH)),
                max_demand: Some(RegisterLocation::new(0x0610, KW)),
            }),
            Quantity::WattsReceived => Some(QuantityLayout {
                energy: Some(RegisterLocation::new(0x0607, KWH)),
                max_demand: Some(RegisterLocation::new(0x0614, KW)),
            }),
            _ => None,
        }
    }
}

impl DisplayTranslator for Fulcrum {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendors::tests::assert_regions_disjoint;

    #[test]
    fn test_regions_are_disjoint() {
        assert_regions_disjoint(MeterModel::Fulcrum);
    }
}
