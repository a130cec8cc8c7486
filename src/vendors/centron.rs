//! CENTRON address map: the MT200 layout with its own register block and a
//! larger transfer size.

use crate::display::item::{DisplayItem, RegisterClass};
use crate::error::ScsError;
use crate::vendors::mt200::Mt200;
use crate::vendors::{
    CcumAddresses, DisplayTranslator, MeterAddressMap, MeterModel, Quantity, QuantityLayout,
    RegisterFormat, RegisterLocation,
};

pub const CENTRON_TOU_INFO: u16 = 0x0A00;
pub const CENTRON_TOU_BASE: u16 = 0x0A20;
pub const CENTRON_TOU_CALENDAR: usize = 0x100;

const KWH: RegisterFormat = RegisterFormat::FixedBcd {
    length: 4,
    decimal_bytes: 1,
};
const KW: RegisterFormat = RegisterFormat::FloatingBcd { length: 4 };

#[derive(Debug, Clone, Copy, Default)]
pub struct Centron {
    base: Mt200,
}

impl MeterAddressMap for Centron {
    fn model(&self) -> MeterModel {
        MeterModel::Centron
    }

    fn serial_number_address(&self) -> u16 {
        self.base.serial_number_address()
    }

    fn firmware_revision_address(&self) -> u16 {
        self.base.firmware_revision_address()
    }

    fn clock_address(&self) -> u16 {
        self.base.clock_address()
    }

    fn clock_run_flag_address(&self) -> u16 {
        self.base.clock_run_flag_address()
    }

    fn tou_run_flag_address(&self) -> u16 {
        self.base.tou_run_flag_address()
    }

    fn stop_metering_address(&self) -> u16 {
        self.base.stop_metering_address()
    }

    fn reconfigure_flag_address(&self) -> u16 {
        self.base.reconfigure_flag_address()
    }

    fn load_profile_run_flag_address(&self) -> u16 {
        self.base.load_profile_run_flag_address()
    }

    fn load_profile_interval_address(&self) -> u16 {
        self.base.load_profile_interval_address()
    }

    fn display_table_address(&self) -> Result<u16, ScsError> {
        self.base.display_table_address()
    }

    fn display_table_length(&self) -> Result<usize, ScsError> {
        self.base.display_table_length()
    }

    fn display_format_address(&self) -> u16 {
        self.base.display_format_address()
    }

    // The larger calendar would run into the register block, so CENTRON
    // keeps its TOU data higher up.
    fn tou_info_address(&self) -> u16 {
        CENTRON_TOU_INFO
    }

    fn tou_base_address(&self) -> u16 {
        CENTRON_TOU_BASE
    }

    fn tou_calendar_size(&self) -> usize {
        CENTRON_TOU_CALENDAR
    }

    fn tou_season_area_size(&self) -> usize {
        self.base.tou_season_area_size()
    }

    fn transformer_ratio_address(&self) -> Result<u16, ScsError> {
        self.base.transformer_ratio_address()
    }

    fn max_upload(&self) -> usize {
        128
    }

    fn max_download(&self) -> usize {
        64
    }

    fn quantity_layout(&self, quantity: Quantity) -> Option<QuantityLayout> {
        match quantity {
            Quantity::WattsDelivered => Some(QuantityLayout {
                energy: Some(RegisterLocation::new(0x0541, KWH)),
                max_demand: Some(RegisterLocation::new(0x0561, KW)),
            }),
            // No max demand register for received energy
            Quantity::WattsReceived => Some(QuantityLayout {
                energy: Some(RegisterLocation::new(0x0551, KWH)),
                max_demand: None,
            }),
            _ => None,
        }
    }
}

impl DisplayTranslator for Centron {
    fn describe(&self, item: &DisplayItem) -> String {
        match (item.class, item.register_type) {
            (RegisterClass::Energy | RegisterClass::MaxDemand, 7) => {
                format!("Last Season {}", item.generic_description())
            }
            _ => item.generic_description(),
        }
    }

    fn ccum_table(&self) -> Option<&'static [CcumAddresses; 5]> {
        self.base.ccum_table()
    }
}
