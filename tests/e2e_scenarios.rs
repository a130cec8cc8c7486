//! End-to-end scenarios against an in-memory meter.
//!
//! These tests drive the device engine through `MockTransport`, so every
//! transaction the engine issues is visible and can be asserted on.

use std::time::Duration;

use chrono::NaiveDate;
use scs_rs::constants::{FLAG_CLEAR, FLAG_SET};
use scs_rs::device::{ReconfigureResult, ReconfigureState, ScsDevice, SessionConfig};
use scs_rs::scs::{ProtocolResponse, ScsCommand};
use scs_rs::tou::{Season, Switchpoint, TouEvent, TouInfo, TouInfoLayout, TouSchedule};
use scs_rs::vendors::mt200::{
    MT200_CLOCK, MT200_CLOCK_RUN_FLAG, MT200_DISPLAY_FORMAT, MT200_DISPLAY_TABLE,
    MT200_LOAD_PROFILE_INTERVAL, MT200_LOAD_PROFILE_RUN_FLAG, MT200_RECONFIGURE_FLAG,
    MT200_STOP_METERING, MT200_TOU_INFO, MT200_TOU_RUN_FLAG,
};
use scs_rs::vendors::{MeterModel, Quantity};
use scs_rs::{MockTransport, ScsError};

fn quick_config() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        ..SessionConfig::default()
    }
}

fn mt200(mock: &MockTransport) -> ScsDevice<MockTransport> {
    ScsDevice::with_meter(mock.clone(), MeterModel::Mt200.meter(), quick_config())
}

/// MT200 with a running clock at 2024-06-01 10:07:00.
fn running_meter(load_profile_interval: Option<u8>) -> MockTransport {
    let mock = MockTransport::new();
    mock.load(MT200_CLOCK_RUN_FLAG, &[FLAG_SET]);
    mock.load(MT200_CLOCK, &[0x24, 0x06, 0x01, 0x10, 0x07, 0x00]);
    if let Some(interval) = load_profile_interval {
        mock.load(MT200_LOAD_PROFILE_RUN_FLAG, &[FLAG_SET]);
        mock.load(MT200_LOAD_PROFILE_INTERVAL, &[interval]);
    }
    mock
}

fn sample_schedule() -> TouSchedule {
    let mut schedule = TouSchedule::new(TouInfo::new(TouInfoLayout::Standard, 0));
    for event in [
        TouEvent::start_year(2025).unwrap(),
        TouEvent::season_select(0, 1, 1).unwrap(),
        TouEvent::season_select(1, 6, 1).unwrap(),
        TouEvent::season_select(0, 10, 1).unwrap(),
        TouEvent::start_year(2026).unwrap(),
        TouEvent::season_select(0, 1, 1).unwrap(),
    ] {
        schedule.calendar.push(event);
    }
    let winter: Season = [
        Switchpoint::rate(0, 0, 0, 1).unwrap(),
        Switchpoint::rate(0, 7, 30, 0).unwrap(),
        Switchpoint::rate(0, 21, 0, 1).unwrap(),
        Switchpoint::rate(3, 0, 0, 1).unwrap(),
    ]
    .into_iter()
    .collect();
    let summer: Season = [
        Switchpoint::rate(0, 0, 0, 2).unwrap(),
        Switchpoint::rate(0, 12, 0, 0).unwrap(),
    ]
    .into_iter()
    .collect();
    schedule.seasons.push(winter).unwrap();
    schedule.seasons.push(summer).unwrap();
    schedule
}

#[tokio::test]
async fn e2e_centron_watts_received_has_no_max_demand() {
    let mock = MockTransport::new();
    mock.load(0x0551, &[0x00, 0x01, 0x23, 0x45]);
    let mut device = ScsDevice::new(mock.clone(), MeterModel::Centron);

    let reading = device.read_quantity(Quantity::WattsReceived).await.unwrap();
    let energy = reading.total_energy.unwrap();
    assert!((energy - 123.45).abs() < 1e-9);
    assert_eq!(reading.total_max_demand, None);

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].address, 0x0551);
    assert_eq!(calls[0].length, 4);
}

#[tokio::test]
async fn e2e_display_table_partitions_lists() {
    let mock = MockTransport::new();
    let table = [
        [0x00, 0x01, 0x07, 0x00], // energy, normal
        [0x02, 0x02, 0x86, 0x10], // max demand, alternate
        [0x04, 0x03, 0x06, 0x20], // cumulative, normal
        [0xFF, 0xFF, 0xFF, 0xFF],
        [0x0E, 0x01, 0x07, 0x10], // extended energy, test
        [0xFF, 0x00, 0x00, 0x00],
    ]
    .concat();
    mock.load(MT200_DISPLAY_TABLE, &table);
    mock.load(MT200_DISPLAY_FORMAT, &[0x06, 0x02, 0x05, 0x03, 0x05, 0x02]);
    mock.load(0x0700, &[0x00, 0x42, 0x17, 0x50, 0x00, 0x00, 0x00]);
    let mut device = ScsDevice::new(mock.clone(), MeterModel::Mt200);

    let lists = device.read_display_lists().await.unwrap();
    assert_eq!(lists.normal.len(), 2);
    assert_eq!(lists.alternate.len(), 1);
    assert_eq!(lists.test.len(), 1);
    // 0x100 bytes in 64-byte uploads
    assert_eq!(mock.calls().len(), 4);

    let value = device.read_display_item(&lists.normal[0]).await.unwrap();
    assert_eq!(value.raw, "4217.50000000");
    assert_eq!(value.value, "4217.50");

    // Values are never cached
    mock.load(0x0700, &[0x00, 0x42, 0x18, 0x00, 0x00, 0x00, 0x00]);
    let value = device.read_display_item(&lists.normal[0]).await.unwrap();
    assert_eq!(value.value, "4218.00");
}

#[tokio::test]
async fn e2e_adjust_clock_across_interval_is_rejected_without_writes() {
    let mock = running_meter(Some(15));
    let mut device = mt200(&mock);

    let result = device
        .adjust_clock(chrono::Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(result, ReconfigureResult::CrossesInterval);
    assert!(mock.downloads().is_empty());
    assert_eq!(device.reconfigure_state(), ReconfigureState::Idle);
}

#[tokio::test]
async fn e2e_adjust_clock_within_interval() {
    let mock = running_meter(Some(15));
    let mut device = mt200(&mock);

    let result = device
        .adjust_clock(chrono::Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(result, ReconfigureResult::Success);

    let downloads: Vec<(u16, Vec<u8>)> = mock
        .downloads()
        .into_iter()
        .map(|call| (call.address, call.data))
        .collect();
    assert_eq!(
        downloads,
        vec![
            (MT200_STOP_METERING, vec![FLAG_SET]),
            (MT200_CLOCK_RUN_FLAG, vec![FLAG_CLEAR]),
            (MT200_CLOCK, vec![0x24, 0x06, 0x01, 0x10, 0x12, 0x00]),
            (MT200_RECONFIGURE_FLAG, vec![FLAG_SET]),
            (MT200_STOP_METERING, vec![FLAG_CLEAR]),
        ]
    );
}

#[tokio::test]
async fn e2e_set_clock_without_load_profile() {
    let mock = running_meter(None);
    let mut device = mt200(&mock);
    let target = NaiveDate::from_ymd_opt(2024, 6, 2)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();

    let result = device.set_clock(target).await.unwrap();
    assert_eq!(result, ReconfigureResult::Success);
    assert_eq!(mock.peek(MT200_CLOCK, 6), vec![0x24, 0x06, 0x02, 0x08, 0x00, 0x00]);
}

#[tokio::test]
async fn e2e_stopped_clock_is_not_adjusted() {
    let mock = running_meter(None);
    mock.load(MT200_CLOCK_RUN_FLAG, &[FLAG_CLEAR]);
    let mut device = mt200(&mock);

    let result = device.adjust_clock(chrono::Duration::seconds(30)).await.unwrap();
    assert_eq!(result, ReconfigureResult::ClockNotRunning);
    assert!(mock.downloads().is_empty());
}

#[tokio::test]
async fn e2e_can_on_stop_metering_is_insufficient_security() {
    let mock = MockTransport::new();
    mock.respond_once(ScsCommand::Download, MT200_STOP_METERING, ProtocolResponse::Can);
    let mut device = mt200(&mock);

    let mut schedule = sample_schedule();
    let result = device.write_tou_schedule(&mut schedule).await.unwrap();
    assert_eq!(result, ReconfigureResult::InsufficientSecurity);

    let downloads = mock.downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].address, MT200_STOP_METERING);
    assert_eq!(downloads[0].response, ProtocolResponse::Can);
}

#[tokio::test]
async fn e2e_tou_schedule_write_then_read_back() {
    let mock = MockTransport::new();
    let mut device = mt200(&mock);

    let mut schedule = sample_schedule();
    let result = device.write_tou_schedule(&mut schedule).await.unwrap();
    assert_eq!(result, ReconfigureResult::Success);
    assert_eq!(mock.downloads_to(MT200_TOU_RUN_FLAG)[0].data, vec![FLAG_CLEAR]);
    assert_eq!(mock.downloads_to(MT200_RECONFIGURE_FLAG).len(), 1);
    assert_eq!(mock.downloads().last().unwrap().address, MT200_STOP_METERING);

    let read = device.read_tou_schedule().await.unwrap();
    assert_eq!(read.calendar.events(), schedule.calendar.events());
    assert_eq!(read.seasons.len(), 2);
    assert_eq!(
        read.seasons.seasons()[0].switchpoints(),
        schedule.seasons.seasons()[0].switchpoints()
    );
    assert_eq!(read.info.expiration, NaiveDate::from_ymd_opt(2027, 1, 1));
    assert_eq!(
        device.tou_expiration_date().await.unwrap(),
        NaiveDate::from_ymd_opt(2027, 1, 1)
    );
}

#[tokio::test]
async fn e2e_tou_write_leaves_quantity_registers_alone() {
    for model in [MeterModel::Mt200, MeterModel::Centron] {
        let mock = MockTransport::new();
        let meter = model.meter();
        for quantity in Quantity::ALL {
            let Some(layout) = meter.quantity_layout(quantity) else {
                continue;
            };
            for register in [layout.energy, layout.max_demand].into_iter().flatten() {
                let mut bytes = vec![0x00; register.format.length()];
                bytes[1] = 0x12;
                bytes[2] = 0x34;
                mock.load(register.address, &bytes);
            }
        }
        let mut device = ScsDevice::with_meter(mock.clone(), meter, quick_config());

        let mut before = Vec::new();
        for quantity in Quantity::ALL {
            before.push(device.read_quantity(quantity).await.ok());
        }

        let mut schedule = sample_schedule();
        let result = device.write_tou_schedule(&mut schedule).await.unwrap();
        assert_eq!(result, ReconfigureResult::Success);

        let mut after = Vec::new();
        for quantity in Quantity::ALL {
            after.push(device.read_quantity(quantity).await.ok());
        }
        assert_eq!(before, after, "{model} registers changed by a TOU write");
        assert!(before.iter().flatten().count() >= 2);
    }
}

#[tokio::test]
async fn e2e_oversized_calendar_is_rejected_before_io() {
    let mock = MockTransport::new();
    let mut device = mt200(&mock);

    let mut schedule = TouSchedule::new(TouInfo::new(TouInfoLayout::Standard, 0));
    schedule.calendar.push(TouEvent::start_year(2025).unwrap());
    for month in 1..=12 {
        for day in [1, 8, 15, 22] {
            for season in 0..2 {
                schedule
                    .calendar
                    .push(TouEvent::season_select(season, month, day).unwrap());
            }
        }
    }

    let original = schedule.clone();

    let result = device.write_tou_schedule(&mut schedule).await.unwrap();
    assert_eq!(result, ReconfigureResult::CalendarTooLarge);
    assert!(mock.calls().is_empty());
    assert_eq!(schedule, original);
}

#[tokio::test]
async fn e2e_failed_write_runs_cleanup_and_returns_original_error() {
    let mock = running_meter(None);
    mock.respond_once(ScsCommand::Download, MT200_CLOCK, ProtocolResponse::Nak);
    let mut device = mt200(&mock);

    let err = device
        .adjust_clock(chrono::Duration::seconds(30))
        .await
        .unwrap_err();
    match err {
        ScsError::Protocol {
            address, response, ..
        } => {
            assert_eq!(address, MT200_CLOCK);
            assert_eq!(response, ProtocolResponse::Nak);
        }
        other => panic!("unexpected error {other:?}"),
    }

    assert_eq!(mock.downloads_to(MT200_RECONFIGURE_FLAG)[0].data, vec![FLAG_SET]);
    let stops = mock.downloads_to(MT200_STOP_METERING);
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[1].data, vec![FLAG_CLEAR]);
    assert_eq!(device.reconfigure_state(), ReconfigureState::Idle);
}

#[tokio::test]
async fn e2e_cleanup_continues_when_reconfigure_flag_fails() {
    let mock = running_meter(None);
    mock.respond_always(ScsCommand::Download, MT200_RECONFIGURE_FLAG, ProtocolResponse::Nak);
    let mut device = mt200(&mock);

    let err = device
        .adjust_clock(chrono::Duration::seconds(30))
        .await
        .unwrap_err();
    assert_eq!(err.response(), Some(ProtocolResponse::Nak));

    // Once in the sequence, once in cleanup
    assert_eq!(mock.downloads_to(MT200_RECONFIGURE_FLAG).len(), 2);
    let stops = mock.downloads_to(MT200_STOP_METERING);
    assert_eq!(stops.last().unwrap().data, vec![FLAG_CLEAR]);
}

#[tokio::test]
async fn e2e_tou_info_read_for_expiration_is_cached() {
    let mock = MockTransport::new();
    let mut info = TouInfo::new(TouInfoLayout::Standard, 0x0420);
    info.expiration = NaiveDate::from_ymd_opt(2030, 1, 1);
    mock.load(MT200_TOU_INFO, &info.encode());
    let mut device = mt200(&mock);

    assert_eq!(
        device.tou_expiration_date().await.unwrap(),
        NaiveDate::from_ymd_opt(2030, 1, 1)
    );
    device.tou_expiration_date().await.unwrap();
    assert_eq!(mock.calls().len(), 1);
}
