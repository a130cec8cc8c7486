//! A complete TOU schedule and the memory image written for it.

use serde::Serialize;

use crate::error::ScsError;
use crate::tou::event::TouEventCollection;
use crate::tou::info::{TouInfo, TouInfoLayout};
use crate::tou::switchpoint::{Season, SeasonCollection, SeasonSize};

/// Info block, yearly calendar and seasons as stored in one meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TouSchedule {
    pub info: TouInfo,
    pub calendar: TouEventCollection,
    pub seasons: SeasonCollection,
}

/// Where the TOU areas sit in a given meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouArea {
    pub info_address: u16,
    pub base_address: u16,
    pub calendar_size: usize,
    pub season_area_size: usize,
    pub layout: TouInfoLayout,
}

impl TouArea {
    /// Start of the yearly calendar.
    pub fn calendar_address(&self) -> u16 {
        match self.layout {
            TouInfoLayout::Standard => self.base_address.wrapping_add(self.season_area_size as u16),
            TouInfoLayout::Fulcrum => self.base_address,
        }
    }

    /// Start of the season area.
    pub fn season_address(&self) -> u16 {
        match self.layout {
            TouInfoLayout::Standard => self.base_address,
            TouInfoLayout::Fulcrum => self.base_address.wrapping_add(self.calendar_size as u16),
        }
    }
}

/// Reasons a schedule cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouFitError {
    CalendarTooLarge,
    SeasonsTooLarge,
}

/// Bytes to download, address first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouImage {
    pub info: TouInfo,
    pub seasons: Vec<(u16, Vec<u8>)>,
    pub calendar: (u16, Vec<u8>),
    pub info_block: (u16, Vec<u8>),
}

impl TouSchedule {
    pub fn new(info: TouInfo) -> Self {
        TouSchedule {
            info,
            calendar: TouEventCollection::new(),
            seasons: SeasonCollection::new(),
        }
    }

    /// Rebuilds a schedule from the calendar bytes and one buffer per season.
    pub fn from_parts(
        info: TouInfo,
        calendar_bytes: &[u8],
        season_bytes: Vec<Vec<u8>>,
        is_fulcrum: bool,
    ) -> Result<Self, ScsError> {
        let calendar = TouEventCollection::decode(calendar_bytes);
        let mut seasons = SeasonCollection::new();
        for bytes in season_bytes {
            seasons.push(Season::decode(&bytes, is_fulcrum))?;
        }
        Ok(TouSchedule {
            info,
            calendar,
            seasons,
        })
    }

    /// Normalises the schedule and lays it out for `area`:
    /// January 1st season added, calendar sorted, redundant output-off
    /// switchpoints removed, calendar cut back to whole years that fit.
    ///
    /// The normalised schedule replaces `self` only when it fits; on error
    /// `self` is unchanged.
    pub fn prepare(&mut self, area: &TouArea, is_fulcrum: bool) -> Result<TouImage, TouFitError> {
        let mut work = self.clone();
        if let Err(e) = work.calendar.add_first_start_date() {
            log::warn!("Could not add a January 1st season: {e}");
        }
        work.calendar.sort();
        for season in work.seasons.seasons_mut() {
            season.sort();
            let removed = season.remove_extra_outputs();
            if removed > 0 {
                log::debug!("Removed {removed} redundant output switchpoints");
            }
        }

        if !work.calendar.truncate_to_fit(area.calendar_size) {
            return Err(TouFitError::CalendarTooLarge);
        }
        if work.seasons.encoded_len() > area.season_area_size {
            return Err(TouFitError::SeasonsTooLarge);
        }

        let calendar_address = area.calendar_address();
        let season_start = area.season_address();

        let mut info = work.info.clone();
        info.layout = area.layout;
        info.base_address = area.base_address;
        info.yearly_address = calendar_address;
        info.expiration = work.calendar.expiration_date();
        info.season_addresses = Default::default();

        let mut seasons = Vec::with_capacity(work.seasons.len());
        for ((index, season), offset) in work
            .seasons
            .seasons()
            .iter()
            .enumerate()
            .zip(work.seasons.packed_offsets())
        {
            let address = season_start.wrapping_add(offset as u16);
            info.season_addresses[index] = Some(address);
            seasons.push((address, season.encode(is_fulcrum)));
        }

        work.info = info.clone();
        let calendar = (calendar_address, work.calendar.encode());
        *self = work;
        Ok(TouImage {
            seasons,
            calendar,
            info_block: (area.info_address, info.encode()),
            info,
        })
    }

    /// Stored size of each season, per the info block.
    pub fn season_sizes(&self) -> Vec<SeasonSize> {
        (0..self.info.season_count())
            .filter_map(|index| self.info.season_size(index))
            .collect()
    }
}
