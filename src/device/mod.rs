//! # SCS Device Engine
//!
//! [`ScsDevice`] combines a transaction layer with the address map and
//! display translator of one meter family. Every read goes to the meter
//! except the handful of values kept in the [`SessionCache`].

pub mod cache;
pub mod reconfigure;

use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::debug;
use serde::Serialize;

use crate::constants::{CLOCK_LENGTH, DISPLAY_FORMAT_BLOCK_LENGTH, FLAG_CLEAR, TOU_BASE_YEAR};
use crate::display::format::DisplayFormats;
use crate::display::item::DisplayItem;
use crate::display::list::DisplayLists;
use crate::display::reader::DisplayValue;
use crate::error::ScsError;
use crate::payload::bcd::{bcd_to_byte, bcd_to_int, byte_to_bcd};
use crate::scs::protocol::ScsProtocol;
use crate::scs::transport::{Reconnect, ScsTransport};
use crate::tou::info::TouInfo;
use crate::tou::schedule::{TouArea, TouSchedule};
use crate::tou::switchpoint::SeasonSize;
use crate::util::logging::PerfTimer;
use crate::vendors::{MeterModel, Quantity, ScsMeter};

pub use cache::SessionCache;
pub use reconfigure::{ReconfigureResult, ReconfigureState};

/// Session settings that are not properties of the meter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause after clearing a run flag before the meter accepts the write
    pub settle_delay: Duration,
    pub max_upload_override: Option<usize>,
    pub max_download_override: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            settle_delay: Duration::from_secs(2),
            max_upload_override: None,
            max_download_override: None,
        }
    }
}

/// Energy and max demand of one quantity. A register the model does not have
/// is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QuantityReading {
    pub total_energy: Option<f64>,
    pub total_max_demand: Option<f64>,
}

/// Decodes the 6-byte BCD clock (YY MM DD HH MM SS).
pub fn decode_clock(bytes: &[u8]) -> Result<NaiveDateTime, ScsError> {
    if bytes.len() < CLOCK_LENGTH {
        return Err(ScsError::FrameParseError(format!(
            "clock needs {CLOCK_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    let field = |i: usize| u32::from(bcd_to_byte(bytes[i]));
    NaiveDate::from_ymd_opt(TOU_BASE_YEAR + field(0) as i32, field(1), field(2))
        .and_then(|date| date.and_hms_opt(field(3), field(4), field(5)))
        .ok_or_else(|| ScsError::DataIntegrity(format!("invalid meter clock {bytes:02X?}")))
}

/// Encodes a time in the meter clock layout.
pub fn encode_clock(time: &NaiveDateTime) -> Result<[u8; CLOCK_LENGTH], ScsError> {
    let year = time.year() - TOU_BASE_YEAR;
    if !(0..100).contains(&year) {
        return Err(ScsError::InvalidArgument(format!(
            "year {} is outside the meter clock range",
            time.year()
        )));
    }
    Ok([
        byte_to_bcd(year as u8),
        byte_to_bcd(time.month() as u8),
        byte_to_bcd(time.day() as u8),
        byte_to_bcd(time.hour() as u8),
        byte_to_bcd(time.minute() as u8),
        byte_to_bcd(time.second() as u8),
    ])
}

/// A logged-on session with one meter.
pub struct ScsDevice<T: ScsTransport> {
    protocol: ScsProtocol<T>,
    meter: Box<dyn ScsMeter>,
    cache: SessionCache,
    config: SessionConfig,
    state: ReconfigureState,
}

impl<T: ScsTransport> ScsDevice<T> {
    pub fn new(transport: T, model: MeterModel) -> Self {
        Self::with_meter(transport, model.meter(), SessionConfig::default())
    }

    pub fn with_meter(transport: T, meter: Box<dyn ScsMeter>, config: SessionConfig) -> Self {
        ScsDevice {
            protocol: ScsProtocol::new(transport),
            meter,
            cache: SessionCache::new(),
            config,
            state: ReconfigureState::Idle,
        }
    }

    pub fn meter(&self) -> &dyn ScsMeter {
        self.meter.as_ref()
    }

    pub fn model(&self) -> MeterModel {
        self.meter.model()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn protocol_mut(&mut self) -> &mut ScsProtocol<T> {
        &mut self.protocol
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Drops every cached value. [`ScsDevice::reconnect`] does this itself.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    pub fn reconfigure_state(&self) -> ReconfigureState {
        self.state
    }

    pub fn into_transport(self) -> T {
        self.protocol.into_inner()
    }

    fn max_upload(&self) -> usize {
        self.config
            .max_upload_override
            .unwrap_or_else(|| self.meter.max_upload())
    }

    fn max_download(&self) -> usize {
        self.config
            .max_download_override
            .unwrap_or_else(|| self.meter.max_download())
    }

    pub async fn serial_number(&mut self) -> Result<String, ScsError> {
        let bytes = self
            .protocol
            .read(
                self.meter.serial_number_address(),
                self.meter.serial_number_length(),
                "serial number",
            )
            .await?;
        Ok(String::from_utf8_lossy(&bytes)
            .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string())
    }

    /// Firmware revision as "major.minor".
    pub async fn firmware_revision(&mut self) -> Result<String, ScsError> {
        let bytes = self
            .protocol
            .read(self.meter.firmware_revision_address(), 2, "firmware revision")
            .await?;
        Ok(format!("{}.{:02}", bcd_to_byte(bytes[0]), bcd_to_byte(bytes[1])))
    }

    pub async fn read_clock(&mut self) -> Result<NaiveDateTime, ScsError> {
        let bytes = self
            .protocol
            .read(self.meter.clock_address(), CLOCK_LENGTH, "clock")
            .await?;
        decode_clock(&bytes)
    }

    pub async fn is_clock_running(&mut self) -> Result<bool, ScsError> {
        if let Some(running) = self.cache.clock_running {
            return Ok(running);
        }
        let flag = self
            .protocol
            .read_byte(self.meter.clock_run_flag_address(), "clock run flag")
            .await?;
        let running = flag != FLAG_CLEAR;
        self.cache.clock_running = Some(running);
        Ok(running)
    }

    pub async fn is_tou_running(&mut self) -> Result<bool, ScsError> {
        if let Some(running) = self.cache.tou_running {
            return Ok(running);
        }
        let flag = self
            .protocol
            .read_byte(self.meter.tou_run_flag_address(), "TOU run flag")
            .await?;
        let running = flag != FLAG_CLEAR;
        self.cache.tou_running = Some(running);
        Ok(running)
    }

    pub async fn tou_expiration_date(&mut self) -> Result<Option<NaiveDate>, ScsError> {
        if let Some(expiration) = self.cache.tou_expiration {
            return Ok(expiration);
        }
        let expiration = self.read_tou_info().await?.expiration;
        self.cache.tou_expiration = Some(expiration);
        Ok(expiration)
    }

    pub async fn transformer_ratio(&mut self) -> Result<u32, ScsError> {
        let address = self.meter.transformer_ratio_address()?;
        let bytes = self.protocol.read(address, 2, "transformer ratio").await?;
        Ok(bcd_to_int(&bytes))
    }

    pub async fn is_load_profile_running(&mut self) -> Result<bool, ScsError> {
        let flag = self
            .protocol
            .read_byte(self.meter.load_profile_run_flag_address(), "load profile run flag")
            .await?;
        Ok(flag != FLAG_CLEAR)
    }

    /// Load profile interval in minutes.
    pub async fn load_profile_interval(&mut self) -> Result<u8, ScsError> {
        self.protocol
            .read_byte(self.meter.load_profile_interval_address(), "load profile interval")
            .await
    }

    pub async fn read_quantity(&mut self, quantity: Quantity) -> Result<QuantityReading, ScsError> {
        let layout = self
            .meter
            .quantity_layout(quantity)
            .ok_or_else(|| ScsError::unsupported(format!("{quantity} on {}", self.meter.model())))?;

        let mut reading = QuantityReading::default();
        if let Some(location) = layout.energy {
            let bytes = self
                .protocol
                .read(location.address, location.format.length(), "energy")
                .await?;
            reading.total_energy = Some(location.format.decode(&bytes));
        }
        if let Some(location) = layout.max_demand {
            let bytes = self
                .protocol
                .read(location.address, location.format.length(), "max demand")
                .await?;
            reading.total_max_demand = Some(location.format.decode(&bytes));
        }
        debug!("{quantity}: {reading:?}");
        Ok(reading)
    }

    pub async fn display_formats(&mut self) -> Result<DisplayFormats, ScsError> {
        if let Some(formats) = self.cache.display_formats {
            return Ok(formats);
        }
        let bytes = self
            .protocol
            .read(
                self.meter.display_format_address(),
                DISPLAY_FORMAT_BLOCK_LENGTH,
                "display formats",
            )
            .await?;
        let mut block = [0u8; DISPLAY_FORMAT_BLOCK_LENGTH];
        block.copy_from_slice(&bytes);
        let formats = DisplayFormats::decode(&block);
        self.cache.display_formats = Some(formats);
        Ok(formats)
    }

    pub async fn read_display_lists(&mut self) -> Result<DisplayLists, ScsError> {
        let address = self.meter.display_table_address()?;
        let length = self.meter.display_table_length()?;
        let max_upload = self.max_upload();
        let timer = PerfTimer::start("display table read");
        let table = self
            .protocol
            .read_block(address, length, max_upload, "display table")
            .await?;
        timer.finish();
        DisplayLists::parse_complete(&table)
    }

    /// Reads the live value of a display item. Never cached.
    pub async fn read_display_item(&mut self, item: &DisplayItem) -> Result<DisplayValue, ScsError> {
        let formats = self.display_formats().await?;
        item.read_current_value(&mut self.protocol, self.meter.as_ref(), &formats)
            .await
    }

    pub async fn write_display_item(&mut self, item: &DisplayItem, value: f64) -> Result<(), ScsError> {
        item.write_new_value(&mut self.protocol, self.meter.as_ref(), value)
            .await
    }

    /// Where this meter keeps its TOU data.
    pub fn tou_area(&self) -> TouArea {
        self.meter.tou_area()
    }

    pub async fn read_tou_info(&mut self) -> Result<TouInfo, ScsError> {
        let layout = self.meter.tou_info_layout();
        let bytes = self
            .protocol
            .read(self.meter.tou_info_address(), layout.encoded_len(), "TOU info")
            .await?;
        TouInfo::decode(&bytes, layout, self.meter.tou_base_address())
    }

    pub async fn read_tou_schedule(&mut self) -> Result<TouSchedule, ScsError> {
        let info = self.read_tou_info().await?;
        let area = self.tou_area();
        let max_upload = self.max_upload();
        let is_fulcrum = self.meter.is_fulcrum();

        let calendar = self
            .protocol
            .read_block(info.yearly_address, area.calendar_size, max_upload, "TOU calendar")
            .await?;

        let season_end = usize::from(area.season_address()) + area.season_area_size;
        let mut seasons = Vec::with_capacity(info.season_count());
        for index in 0..info.season_count() {
            let (Some(address), Some(size)) =
                (info.season_addresses[index], info.season_size(index))
            else {
                break;
            };
            // Unknown size: read to the end of the area, decoding stops at the marker
            let length = match size {
                SeasonSize::Known(length) => length,
                SeasonSize::Unknown => season_end.saturating_sub(usize::from(address)),
            };
            let bytes = self
                .protocol
                .read_block(address, length, max_upload, "TOU season")
                .await?;
            seasons.push(bytes);
        }

        let schedule = TouSchedule::from_parts(info, &calendar, seasons, is_fulcrum)?;
        debug!(
            "TOU schedule: {} calendar events, {} seasons",
            schedule.calendar.len(),
            schedule.seasons.len()
        );
        Ok(schedule)
    }
}

impl<T: ScsTransport + Reconnect> ScsDevice<T> {
    /// Re-establishes the link and forgets everything cached for the old
    /// session. The cache is cleared even if the link cannot be reopened.
    pub async fn reconnect(&mut self) -> Result<(), ScsError> {
        let result = self.protocol.transport_mut().reconnect().await;
        self.cache.invalidate();
        debug!("Reconnected to {}, session cache cleared", self.meter.model());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scs::mock::MockTransport;
    use crate::vendors::mt200::{
        MT200_CLOCK, MT200_CLOCK_RUN_FLAG, MT200_DISPLAY_FORMAT, MT200_DISPLAY_TABLE,
    };

    #[test]
    fn test_clock_codec() {
        let bytes = [0x24, 0x03, 0x15, 0x10, 0x07, 0x30];
        let time = decode_clock(&bytes).unwrap();
        assert_eq!(
            time,
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(10, 7, 30)
                .unwrap()
        );
        assert_eq!(encode_clock(&time).unwrap(), bytes);

        let err = decode_clock(&[0x24, 0x13, 0x01, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ScsError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_cached_flags_read_once() {
        let mock = MockTransport::new();
        mock.load(MT200_CLOCK_RUN_FLAG, &[0x01]);
        let mut device = ScsDevice::new(mock.clone(), MeterModel::Mt200);

        assert!(device.is_clock_running().await.unwrap());
        assert!(device.is_clock_running().await.unwrap());
        assert_eq!(mock.calls().len(), 1);

        device.invalidate_cache();
        assert!(device.is_clock_running().await.unwrap());
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_display_formats_cached() {
        let mock = MockTransport::new();
        mock.load(MT200_DISPLAY_FORMAT, &[0x06, 0x02, 0x05, 0x83, 0x06, 0x42]);
        let mut device = ScsDevice::new(mock.clone(), MeterModel::Mt200);

        let formats = device.display_formats().await.unwrap();
        assert_eq!(formats.energy.width, 6);
        assert_eq!(formats.energy.decimals, 2);
        assert!(formats.demand.floating_decimal());
        assert!(formats.cumulative.leading_zeros());
        device.display_formats().await.unwrap();
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_read_clock() {
        let mock = MockTransport::new();
        mock.load(MT200_CLOCK, &[0x24, 0x12, 0x31, 0x23, 0x59, 0x58]);
        let mut device = ScsDevice::new(mock, MeterModel::Mt200);
        let time = device.read_clock().await.unwrap();
        assert_eq!(time.to_string(), "2024-12-31 23:59:58");
    }

    #[tokio::test]
    async fn test_fulcrum_unsupported_features() {
        let mut device = ScsDevice::new(MockTransport::new(), MeterModel::Fulcrum);
        let err = device.transformer_ratio().await.unwrap_err();
        assert!(matches!(err, ScsError::Unsupported(_)));
        let err = device.read_display_lists().await.unwrap_err();
        assert!(matches!(err, ScsError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_display_table_without_end_marker() {
        // Blank basepage decodes as energy records all the way down
        let mock = MockTransport::new();
        mock.load(MT200_DISPLAY_TABLE, &[0x00, 0x01, 0x05, 0x41]);
        let mut device = ScsDevice::new(mock, MeterModel::Mt200);
        let err = device.read_display_lists().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataIntegrityViolation);
    }

    #[tokio::test]
    async fn test_reconnect_clears_session_cache() {
        let mock = MockTransport::new();
        mock.load(MT200_CLOCK_RUN_FLAG, &[0x01]);
        let mut device = ScsDevice::new(mock.clone(), MeterModel::Mt200);

        assert!(device.is_clock_running().await.unwrap());
        assert!(device.is_clock_running().await.unwrap());
        assert_eq!(mock.calls().len(), 1);
        assert!(!device.cache().is_empty());

        mock.load(MT200_CLOCK_RUN_FLAG, &[FLAG_CLEAR]);
        device.reconnect().await.unwrap();
        assert_eq!(mock.reconnects(), 1);
        assert!(device.cache().is_empty());

        assert!(!device.is_clock_running().await.unwrap());
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_quantity_is_unsupported() {
        let mut device = ScsDevice::new(MockTransport::new(), MeterModel::Mt200);
        let err = device.read_quantity(Quantity::VoltAmps).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedByModel);
    }
}
