//! Clock and TOU reconfiguration.
//!
//! ```text
//! Idle -> ClockCheck -> [BoundaryCheck] -> StopMetering -> Disable -> Write
//!      -> SetReconfigureFlag -> ResumeMetering -> Idle
//! ```
//!
//! A CAN on stop metering ends the sequence with
//! [`ReconfigureResult::InsufficientSecurity`] before anything is written.
//! Once metering is stopped, any failure runs the cleanup: set the
//! reconfigure flag, then resume metering, each attempted regardless of the
//! other. The original error is returned afterwards.

use std::fmt;

use chrono::{Duration, NaiveDateTime, Timelike};
use log::{debug, info, warn};
use serde::Serialize;

use crate::constants::{FLAG_CLEAR, FLAG_SET};
use crate::device::ScsDevice;
use crate::error::ScsError;
use crate::scs::transport::{ProtocolResponse, ScsCommand, ScsTransport};
use crate::tou::schedule::{TouFitError, TouImage, TouSchedule};
use crate::util::logging::PerfTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconfigureState {
    Idle,
    ClockCheck,
    BoundaryCheck,
    StopMetering,
    Disable,
    Write,
    SetReconfigureFlag,
    ResumeMetering,
}

/// Expected outcomes of a reconfiguration. Transport and protocol trouble is
/// reported as an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconfigureResult {
    Success,
    /// The meter cancelled stop metering
    InsufficientSecurity,
    /// The new time leaves the current load profile interval
    CrossesInterval,
    ClockNotRunning,
    CalendarTooLarge,
    SeasonsTooLarge,
}

impl fmt::Display for ReconfigureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReconfigureResult::Success => "success",
            ReconfigureResult::InsufficientSecurity => "insufficient security",
            ReconfigureResult::CrossesInterval => "new time crosses a load profile interval",
            ReconfigureResult::ClockNotRunning => "clock is not running",
            ReconfigureResult::CalendarTooLarge => "calendar does not fit",
            ReconfigureResult::SeasonsTooLarge => "seasons do not fit",
        };
        f.write_str(text)
    }
}

impl From<TouFitError> for ReconfigureResult {
    fn from(err: TouFitError) -> Self {
        match err {
            TouFitError::CalendarTooLarge => ReconfigureResult::CalendarTooLarge,
            TouFitError::SeasonsTooLarge => ReconfigureResult::SeasonsTooLarge,
        }
    }
}

enum ClockTarget {
    Offset(Duration),
    Absolute(NaiveDateTime),
}

enum Change {
    Clock(ClockTarget),
    Tou(TouImage),
}

/// True when `new_time` stays inside the load profile interval holding `now`.
pub fn within_interval(now: NaiveDateTime, new_time: NaiveDateTime, interval_minutes: u32) -> bool {
    if interval_minutes == 0 {
        return true;
    }
    let minutes = now.hour() * 60 + now.minute();
    let start_minutes = minutes / interval_minutes * interval_minutes;
    let start = now.date().and_time(chrono::NaiveTime::MIN)
        + Duration::minutes(i64::from(start_minutes));
    let end = start + Duration::minutes(i64::from(interval_minutes));
    new_time >= start && new_time < end
}

impl<T: ScsTransport> ScsDevice<T> {
    fn enter(&mut self, state: ReconfigureState) {
        debug!("Reconfigure: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Moves the meter clock by `offset`.
    pub async fn adjust_clock(&mut self, offset: Duration) -> Result<ReconfigureResult, ScsError> {
        self.reconfigure_clock(ClockTarget::Offset(offset)).await
    }

    pub async fn set_clock(&mut self, time: NaiveDateTime) -> Result<ReconfigureResult, ScsError> {
        self.reconfigure_clock(ClockTarget::Absolute(time)).await
    }

    /// Normalises `schedule`, fits it to this meter and writes it. A schedule
    /// that does not fit is left as the caller passed it.
    pub async fn write_tou_schedule(
        &mut self,
        schedule: &mut TouSchedule,
    ) -> Result<ReconfigureResult, ScsError> {
        let area = self.tou_area();
        let image = match schedule.prepare(&area, self.meter.is_fulcrum()) {
            Ok(image) => image,
            Err(err) => {
                let result = ReconfigureResult::from(err);
                info!("TOU schedule rejected: {result}");
                return Ok(result);
            }
        };
        let result = self.run(Change::Tou(image)).await?;
        self.cache.invalidate_tou();
        Ok(result)
    }

    async fn reconfigure_clock(&mut self, target: ClockTarget) -> Result<ReconfigureResult, ScsError> {
        self.enter(ReconfigureState::ClockCheck);
        let checked = self.check_clock(&target).await;
        match checked {
            Ok(Some(result)) => {
                info!("Clock change rejected: {result}");
                self.enter(ReconfigureState::Idle);
                return Ok(result);
            }
            Err(e) => {
                self.enter(ReconfigureState::Idle);
                return Err(e);
            }
            Ok(None) => {}
        }
        let result = self.run(Change::Clock(target)).await?;
        self.cache.clock_running = None;
        Ok(result)
    }

    /// Pre-flight checks. Nothing is written here.
    async fn check_clock(&mut self, target: &ClockTarget) -> Result<Option<ReconfigureResult>, ScsError> {
        self.cache.clock_running = None;
        if !self.is_clock_running().await? {
            return Ok(Some(ReconfigureResult::ClockNotRunning));
        }
        let now = self.read_clock().await?;
        let new_time = match target {
            ClockTarget::Offset(offset) => now + *offset,
            ClockTarget::Absolute(time) => *time,
        };

        if self.is_load_profile_running().await? {
            self.enter(ReconfigureState::BoundaryCheck);
            let interval = u32::from(self.load_profile_interval().await?);
            if interval == 0 {
                warn!("Load profile is running with a zero interval; skipping boundary check");
            } else if !within_interval(now, new_time, interval) {
                return Ok(Some(ReconfigureResult::CrossesInterval));
            }
        }
        Ok(None)
    }

    async fn run(&mut self, change: Change) -> Result<ReconfigureResult, ScsError> {
        self.enter(ReconfigureState::StopMetering);
        let address = self.meter.stop_metering_address();
        let response = match self.protocol.download(address, &[FLAG_SET]).await {
            Ok(response) => response,
            Err(e) => {
                self.enter(ReconfigureState::Idle);
                return Err(e);
            }
        };
        match response {
            ProtocolResponse::Ack => {}
            ProtocolResponse::Can => {
                info!("Stop metering cancelled by the meter: insufficient security");
                self.enter(ReconfigureState::Idle);
                return Ok(ReconfigureResult::InsufficientSecurity);
            }
            other => {
                self.enter(ReconfigureState::Idle);
                return Err(ScsError::protocol(
                    ScsCommand::Download,
                    other,
                    address,
                    "stop metering",
                ));
            }
        }

        let timer = PerfTimer::start("reconfiguration");
        let outcome = self.run_stopped(&change).await;
        timer.finish();
        if let Err(e) = outcome {
            warn!("Reconfiguration failed in {:?}: {e}", self.state);
            self.cleanup().await;
            self.enter(ReconfigureState::Idle);
            return Err(e);
        }
        self.enter(ReconfigureState::Idle);
        Ok(ReconfigureResult::Success)
    }

    async fn run_stopped(&mut self, change: &Change) -> Result<(), ScsError> {
        self.enter(ReconfigureState::Disable);
        let (flag_address, field) = match change {
            Change::Clock(_) => (self.meter.clock_run_flag_address(), "clock run flag"),
            Change::Tou(_) => (self.meter.tou_run_flag_address(), "TOU run flag"),
        };
        self.protocol.write(flag_address, &[FLAG_CLEAR], field).await?;
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        self.enter(ReconfigureState::Write);
        match change {
            Change::Clock(target) => {
                let time = match target {
                    ClockTarget::Offset(offset) => self.read_clock().await? + *offset,
                    ClockTarget::Absolute(time) => *time,
                };
                let bytes = super::encode_clock(&time)?;
                self.protocol
                    .write(self.meter.clock_address(), &bytes, "clock")
                    .await?;
                debug!("Clock set to {time}");
            }
            Change::Tou(image) => self.write_tou_image(image).await?,
        }

        self.enter(ReconfigureState::SetReconfigureFlag);
        self.protocol
            .write(self.meter.reconfigure_flag_address(), &[FLAG_SET], "reconfigure flag")
            .await?;

        self.enter(ReconfigureState::ResumeMetering);
        self.protocol
            .write(self.meter.stop_metering_address(), &[FLAG_CLEAR], "stop metering")
            .await?;
        Ok(())
    }

    async fn write_tou_image(&mut self, image: &TouImage) -> Result<(), ScsError> {
        let chunk = self.max_download();
        for (address, bytes) in &image.seasons {
            self.protocol
                .write_block(*address, bytes, chunk, "TOU season")
                .await?;
        }
        let (address, bytes) = &image.calendar;
        self.protocol
            .write_block(*address, bytes, chunk, "TOU calendar")
            .await?;
        let (address, bytes) = &image.info_block;
        self.protocol
            .write_block(*address, bytes, chunk, "TOU info")
            .await?;
        debug!(
            "TOU schedule written: {} seasons, expires {:?}",
            image.seasons.len(),
            image.info.expiration
        );
        Ok(())
    }

    /// Best-effort return to metering after a failed write.
    async fn cleanup(&mut self) {
        let reconfigure = self.meter.reconfigure_flag_address();
        if let Err(e) = self
            .protocol
            .write(reconfigure, &[FLAG_SET], "reconfigure flag")
            .await
        {
            warn!("Cleanup could not set the reconfigure flag: {e}");
        }
        let stop = self.meter.stop_metering_address();
        if let Err(e) = self.protocol.write(stop, &[FLAG_CLEAR], "stop metering").await {
            warn!("Cleanup could not resume metering: {e}");
        }
    }
}
