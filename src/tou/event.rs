//! # TOU Calendar Events
//!
//! A TOU calendar is a list of 16-bit event words. Each word is classified by
//! testing masks in a fixed order; the masks overlap (every StartYear word also
//! matches the SeasonSelect mask), so the first match wins:
//!
//! | Type          | Mask     | Pattern  | Payload                                  |
//! |---------------|----------|----------|------------------------------------------|
//! | StartYear     | `0xF800` | `0x1000` | low byte = year - 2000                   |
//! | SeasonSelect  | `0xE000` | `0x0000` | season in bits 11..9, month, day         |
//! | DSTChange     | `0xF000` | `0x2000` | bit 9 = out of DST, month, day           |
//! | HolidaySelect | `0xF000` | `0x3000` | bit 9 = holiday type 2, month, day       |
//! | CalendarEnd   | `0xF800` | `0xF800` |                                          |
//!
//! Date events carry the month in bits 8..5 and the day in bits 4..0.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::constants::{
    TOU_BASE_YEAR, TOU_CALENDAR_END_MASK, TOU_CALENDAR_END_PATTERN, TOU_DST_CHANGE_MASK,
    TOU_DST_CHANGE_PATTERN, TOU_EVENT_DAY_MASK, TOU_EVENT_INDEX_MASK, TOU_EVENT_INDEX_SHIFT,
    TOU_EVENT_LENGTH, TOU_EVENT_MONTH_MASK, TOU_EVENT_MONTH_SHIFT, TOU_EVENT_YEAR_MASK,
    TOU_HOLIDAY_SELECT_MASK, TOU_HOLIDAY_SELECT_PATTERN, TOU_SEASON_SELECT_MASK,
    TOU_SEASON_SELECT_PATTERN, TOU_START_YEAR_MASK, TOU_START_YEAR_PATTERN,
};
use crate::error::ScsError;

/// Word written after the last event.
pub const CALENDAR_END_WORD: u16 = 0xFFFF;

const DST_OUT_OF_BIT: u16 = 0x0200;
const HOLIDAY_TYPE_TWO_BIT: u16 = 0x0200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    StartYear,
    SeasonSelect,
    DstChange,
    HolidaySelect,
    CalendarEnd,
    Unknown,
}

impl EventType {
    /// Classifies a raw word. Order matters.
    pub fn classify(word: u16) -> Self {
        if word & TOU_START_YEAR_MASK == TOU_START_YEAR_PATTERN {
            EventType::StartYear
        } else if word & TOU_SEASON_SELECT_MASK == TOU_SEASON_SELECT_PATTERN {
            EventType::SeasonSelect
        } else if word & TOU_DST_CHANGE_MASK == TOU_DST_CHANGE_PATTERN {
            EventType::DstChange
        } else if word & TOU_HOLIDAY_SELECT_MASK == TOU_HOLIDAY_SELECT_PATTERN {
            EventType::HolidaySelect
        } else if word & TOU_CALENDAR_END_MASK == TOU_CALENDAR_END_PATTERN {
            EventType::CalendarEnd
        } else {
            EventType::Unknown
        }
    }

    /// Events that carry a month and day.
    pub fn is_date_event(self) -> bool {
        matches!(
            self,
            EventType::SeasonSelect | EventType::DstChange | EventType::HolidaySelect
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DstDirection {
    IntoDst,
    OutOfDst,
}

/// One packed calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TouEvent {
    word: u16,
}

impl TouEvent {
    pub fn from_word(word: u16) -> Self {
        TouEvent { word }
    }

    pub fn start_year(year: i32) -> Result<Self, ScsError> {
        let offset = year - TOU_BASE_YEAR;
        if !(0..=0xFF).contains(&offset) {
            return Err(ScsError::InvalidArgument(format!(
                "TOU year {year} outside {TOU_BASE_YEAR}..={}",
                TOU_BASE_YEAR + 0xFF
            )));
        }
        Ok(TouEvent {
            word: TOU_START_YEAR_PATTERN | offset as u16,
        })
    }

    pub fn season_select(season: u8, month: u32, day: u32) -> Result<Self, ScsError> {
        if season > 7 {
            return Err(ScsError::InvalidArgument(format!("season index {season}")));
        }
        let date = pack_date(month, day)?;
        Ok(TouEvent {
            word: TOU_SEASON_SELECT_PATTERN | (u16::from(season) << TOU_EVENT_INDEX_SHIFT) | date,
        })
    }

    pub fn dst_change(direction: DstDirection, month: u32, day: u32) -> Result<Self, ScsError> {
        let bit = match direction {
            DstDirection::IntoDst => 0,
            DstDirection::OutOfDst => DST_OUT_OF_BIT,
        };
        Ok(TouEvent {
            word: TOU_DST_CHANGE_PATTERN | bit | pack_date(month, day)?,
        })
    }

    /// `holiday_type` is 1 or 2.
    pub fn holiday_select(holiday_type: u8, month: u32, day: u32) -> Result<Self, ScsError> {
        let bit = match holiday_type {
            1 => 0,
            2 => HOLIDAY_TYPE_TWO_BIT,
            other => {
                return Err(ScsError::InvalidArgument(format!("holiday type {other}")));
            }
        };
        Ok(TouEvent {
            word: TOU_HOLIDAY_SELECT_PATTERN | bit | pack_date(month, day)?,
        })
    }

    pub fn calendar_end() -> Self {
        TouEvent {
            word: CALENDAR_END_WORD,
        }
    }

    pub fn word(&self) -> u16 {
        self.word
    }

    pub fn event_type(&self) -> EventType {
        EventType::classify(self.word)
    }

    pub fn is_date_event(&self) -> bool {
        self.event_type().is_date_event()
    }

    /// Calendar year of a StartYear event.
    pub fn year(&self) -> Option<i32> {
        match self.event_type() {
            EventType::StartYear => Some(TOU_BASE_YEAR + i32::from(self.word & TOU_EVENT_YEAR_MASK)),
            _ => None,
        }
    }

    /// Season index of a SeasonSelect event.
    pub fn season(&self) -> Option<u8> {
        match self.event_type() {
            EventType::SeasonSelect => Some(self.index_bits()),
            _ => None,
        }
    }

    pub fn dst_direction(&self) -> Option<DstDirection> {
        match self.event_type() {
            EventType::DstChange if self.word & DST_OUT_OF_BIT != 0 => Some(DstDirection::OutOfDst),
            EventType::DstChange => Some(DstDirection::IntoDst),
            _ => None,
        }
    }

    pub fn holiday_type(&self) -> Option<u8> {
        match self.event_type() {
            EventType::HolidaySelect if self.word & HOLIDAY_TYPE_TWO_BIT != 0 => Some(2),
            EventType::HolidaySelect => Some(1),
            _ => None,
        }
    }

    pub fn month(&self) -> Option<u32> {
        self.is_date_event()
            .then(|| u32::from((self.word & TOU_EVENT_MONTH_MASK) >> TOU_EVENT_MONTH_SHIFT))
    }

    pub fn day(&self) -> Option<u32> {
        self.is_date_event()
            .then(|| u32::from(self.word & TOU_EVENT_DAY_MASK))
    }

    /// Same event moved to another date. Non-date events are returned as-is.
    pub fn with_date(&self, month: u32, day: u32) -> Result<Self, ScsError> {
        if !self.is_date_event() {
            return Ok(*self);
        }
        let cleared = self.word & !(TOU_EVENT_MONTH_MASK | TOU_EVENT_DAY_MASK);
        Ok(TouEvent {
            word: cleared | pack_date(month, day)?,
        })
    }

    /// Date ordering. `None` when either side is not a date event, which is
    /// what keeps StartYear and CalendarEnd words in place during a sort.
    /// On the same date a SeasonSelect comes first.
    pub fn compare_date(&self, other: &TouEvent) -> Option<Ordering> {
        let (m1, d1) = (self.month()?, self.day()?);
        let (m2, d2) = (other.month()?, other.day()?);
        let by_date = (m1, d1).cmp(&(m2, d2));
        if by_date != Ordering::Equal {
            return Some(by_date);
        }
        let rank = |e: &TouEvent| u8::from(e.event_type() != EventType::SeasonSelect);
        Some(rank(self).cmp(&rank(other)))
    }

    pub fn precedes(&self, other: &TouEvent) -> bool {
        self.compare_date(other) == Some(Ordering::Less)
    }

    fn index_bits(&self) -> u8 {
        ((self.word & TOU_EVENT_INDEX_MASK) >> TOU_EVENT_INDEX_SHIFT) as u8
    }
}

fn pack_date(month: u32, day: u32) -> Result<u16, ScsError> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(ScsError::InvalidArgument(format!(
            "TOU date {month:02}-{day:02}"
        )));
    }
    Ok(((month as u16) << TOU_EVENT_MONTH_SHIFT) | day as u16)
}

/// Ordered calendar, without its CalendarEnd terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TouEventCollection {
    events: Vec<TouEvent>,
    #[serde(skip)]
    sorted: bool,
}

impl TouEventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes big-endian words up to the first CalendarEnd.
    pub fn decode(bytes: &[u8]) -> Self {
        let events = bytes
            .chunks_exact(TOU_EVENT_LENGTH)
            .map(|pair| TouEvent::from_word(u16::from_be_bytes([pair[0], pair[1]])))
            .take_while(|event| event.event_type() != EventType::CalendarEnd)
            .collect();
        TouEventCollection {
            events,
            sorted: false,
        }
    }

    /// Encodes every event followed by a CalendarEnd word.
    pub fn encode(&self) -> Vec<u8> {
        self.events
            .iter()
            .chain(std::iter::once(&TouEvent::calendar_end()))
            .flat_map(|event| event.word().to_be_bytes())
            .collect()
    }

    /// Bytes taken by [`encode`](Self::encode).
    pub fn encoded_len(&self) -> usize {
        (self.events.len() + 1) * TOU_EVENT_LENGTH
    }

    pub fn push(&mut self, event: TouEvent) {
        if event.event_type() == EventType::CalendarEnd {
            return;
        }
        self.events.push(event);
        self.sorted = false;
    }

    pub fn insert(&mut self, index: usize, event: TouEvent) {
        self.events.insert(index, event);
        self.sorted = false;
    }

    pub fn events(&self) -> &[TouEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TouEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Insertion sort over date events. A date event never moves past a
    /// non-date event, so each year's events stay behind their StartYear.
    pub fn sort(&mut self) {
        for i in 1..self.events.len() {
            let mut j = i;
            while j > 0 && self.events[j].precedes(&self.events[j - 1]) {
                self.events.swap(j, j - 1);
                j -= 1;
            }
        }
        self.sorted = true;
    }

    /// Years present, in calendar order.
    pub fn years(&self) -> Vec<i32> {
        self.events.iter().filter_map(TouEvent::year).collect()
    }

    /// Index range of the events belonging to `year`, StartYear excluded.
    fn year_range(&self, year: i32) -> Option<std::ops::Range<usize>> {
        let start = self.events.iter().position(|e| e.year() == Some(year))? + 1;
        let end = self.events[start..]
            .iter()
            .position(|e| e.event_type() == EventType::StartYear)
            .map_or(self.events.len(), |offset| start + offset);
        Some(start..end)
    }

    /// Drops whole years from the end until the encoded calendar fits in
    /// `budget` bytes. Returns false, leaving the calendar untouched, if not
    /// even the first year fits.
    pub fn truncate_to_fit(&mut self, budget: usize) -> bool {
        if self.encoded_len() <= budget {
            return true;
        }
        let Some(first_year) = self
            .events
            .iter()
            .position(|e| e.event_type() == EventType::StartYear)
        else {
            return false;
        };

        let max_events = budget.saturating_sub(TOU_EVENT_LENGTH) / TOU_EVENT_LENGTH;
        let mut cut = max_events.min(self.events.len() - 1);
        while cut > first_year {
            if self.events[cut].event_type() == EventType::StartYear {
                log::debug!(
                    "Truncating TOU calendar from {} to {cut} events to fit {budget} bytes",
                    self.events.len()
                );
                self.events.truncate(cut);
                return true;
            }
            cut -= 1;
        }
        false
    }

    /// First day of the year after the last StartYear.
    pub fn expiration_date(&self) -> Option<NaiveDate> {
        let last = self.events.iter().rev().find_map(TouEvent::year)?;
        NaiveDate::from_ymd_opt(last + 1, 1, 1)
    }

    /// Makes sure the first year selects a season on January 1st, cloning the
    /// season in force at the end of that year when it does not. Returns true
    /// if an event was added.
    pub fn add_first_start_date(&mut self) -> Result<bool, ScsError> {
        if !self.sorted {
            self.sort();
        }
        let Some(first_year) = self.years().first().copied() else {
            return Ok(false);
        };
        let Some(range) = self.year_range(first_year) else {
            return Ok(false);
        };

        let year_events = &self.events[range.clone()];
        let has_new_year = year_events.iter().any(|e| {
            e.event_type() == EventType::SeasonSelect && e.month() == Some(1) && e.day() == Some(1)
        });
        if has_new_year {
            return Ok(false);
        }

        let Some(last_season) = year_events
            .iter()
            .rev()
            .find(|e| e.event_type() == EventType::SeasonSelect)
            .copied()
        else {
            return Ok(false);
        };

        let clone = last_season.with_date(1, 1)?;
        self.events.insert(range.start, clone);
        self.sorted = true;
        Ok(true)
    }

    /// Replaces the DST dates of one year.
    pub fn replace_dst_dates(
        &mut self,
        year: i32,
        into: (u32, u32),
        out_of: (u32, u32),
    ) -> Result<(), ScsError> {
        let range = self.year_range(year).ok_or_else(|| {
            ScsError::DataIntegrity(format!("year {year} is not in the TOU calendar"))
        })?;

        let into = TouEvent::dst_change(DstDirection::IntoDst, into.0, into.1)?;
        let out_of = TouEvent::dst_change(DstDirection::OutOfDst, out_of.0, out_of.1)?;

        let mut year_events: Vec<TouEvent> = self.events[range.clone()]
            .iter()
            .filter(|e| e.event_type() != EventType::DstChange)
            .copied()
            .collect();
        year_events.push(into);
        year_events.push(out_of);

        self.events.splice(range, year_events);
        self.sort();
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TouEventCollection {
    type Item = &'a TouEvent;
    type IntoIter = std::slice::Iter<'a, TouEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<TouEvent> for TouEventCollection {
    fn from_iter<I: IntoIterator<Item = TouEvent>>(iter: I) -> Self {
        let mut collection = TouEventCollection::new();
        for event in iter {
            collection.push(event);
        }
        collection
    }
}
