//! TOU switchpoints, seasons and the season collection.
//!
//! Switchpoint word:
//!
//! ```text
//! bit 15      0 = rate, 1 = output
//! bits 14..13 day type (3 = holiday)
//! bits 12..8  hour, 24 marks the end of the season
//! bits 7..4   rate index, or output selector
//! bits 3..0   minute / 5
//! ```
//!
//! Output selectors are a bit per output. Most meters put output `n` in bit
//! `n - 1`; FULCRUM meters put it in bit `4 - n`. The two cannot be told
//! apart from the word alone, so every encode/decode takes `is_fulcrum`.

use std::cmp::Ordering;

use serde::Serialize;

use crate::constants::{
    DAY_TYPES, MAX_OUTPUTS, MAX_SEASONS, SWITCHPOINT_DAY_TYPE_MASK, SWITCHPOINT_DAY_TYPE_SHIFT,
    SWITCHPOINT_END_OF_SEASON_HOUR, SWITCHPOINT_HOUR_MASK, SWITCHPOINT_HOUR_SHIFT,
    SWITCHPOINT_LENGTH, SWITCHPOINT_MINUTE_MASK, SWITCHPOINT_MINUTE_STEP,
    SWITCHPOINT_SELECTOR_MASK, SWITCHPOINT_SELECTOR_SHIFT, SWITCHPOINT_TYPE_MASK,
};
use crate::error::ScsError;

const RATE_LABELS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwitchpointKind {
    /// Rate index, 0 = A .. 3 = D, 4 = E
    Rate(u8),
    /// Active outputs, bit `n - 1` = output `n`. Zero means all off.
    Output(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Switchpoint {
    pub day_type: u8,
    pub hour: u8,
    pub minute: u8,
    pub kind: SwitchpointKind,
}

impl Switchpoint {
    pub fn rate(day_type: u8, hour: u8, minute: u8, rate: u8) -> Result<Self, ScsError> {
        if usize::from(rate) >= RATE_LABELS.len() {
            return Err(ScsError::InvalidArgument(format!("rate index {rate}")));
        }
        Self::checked(day_type, hour, minute, SwitchpointKind::Rate(rate))
    }

    /// `output` 1..=4 turns that output on, 0 turns all outputs off.
    pub fn output(day_type: u8, hour: u8, minute: u8, output: u8) -> Result<Self, ScsError> {
        let mask = match output {
            0 => 0,
            n if n <= MAX_OUTPUTS => 1 << (n - 1),
            n => return Err(ScsError::InvalidArgument(format!("output {n}"))),
        };
        Self::checked(day_type, hour, minute, SwitchpointKind::Output(mask))
    }

    pub fn end_of_season() -> Self {
        Switchpoint {
            day_type: 0,
            hour: SWITCHPOINT_END_OF_SEASON_HOUR,
            minute: 0,
            kind: SwitchpointKind::Rate(0),
        }
    }

    fn checked(day_type: u8, hour: u8, minute: u8, kind: SwitchpointKind) -> Result<Self, ScsError> {
        if day_type >= DAY_TYPES
            || hour >= SWITCHPOINT_END_OF_SEASON_HOUR
            || minute >= 60
            || minute % SWITCHPOINT_MINUTE_STEP != 0
        {
            return Err(ScsError::InvalidArgument(format!(
                "switchpoint day type {day_type} at {hour:02}:{minute:02}"
            )));
        }
        Ok(Switchpoint {
            day_type,
            hour,
            minute,
            kind,
        })
    }

    pub fn decode(word: u16, is_fulcrum: bool) -> Self {
        let selector = ((word & SWITCHPOINT_SELECTOR_MASK) >> SWITCHPOINT_SELECTOR_SHIFT) as u8;
        let kind = if word & SWITCHPOINT_TYPE_MASK != 0 {
            let mask = if is_fulcrum {
                reverse_nibble(selector)
            } else {
                selector
            };
            SwitchpointKind::Output(mask)
        } else {
            SwitchpointKind::Rate(selector)
        };
        Switchpoint {
            day_type: ((word & SWITCHPOINT_DAY_TYPE_MASK) >> SWITCHPOINT_DAY_TYPE_SHIFT) as u8,
            hour: ((word & SWITCHPOINT_HOUR_MASK) >> SWITCHPOINT_HOUR_SHIFT) as u8,
            minute: (word & SWITCHPOINT_MINUTE_MASK) as u8 * SWITCHPOINT_MINUTE_STEP,
            kind,
        }
    }

    pub fn encode(&self, is_fulcrum: bool) -> u16 {
        let (type_bit, selector) = match self.kind {
            SwitchpointKind::Rate(rate) => (0, rate),
            SwitchpointKind::Output(mask) if is_fulcrum => (SWITCHPOINT_TYPE_MASK, reverse_nibble(mask)),
            SwitchpointKind::Output(mask) => (SWITCHPOINT_TYPE_MASK, mask),
        };
        type_bit
            | (u16::from(self.day_type) << SWITCHPOINT_DAY_TYPE_SHIFT) & SWITCHPOINT_DAY_TYPE_MASK
            | (u16::from(self.hour) << SWITCHPOINT_HOUR_SHIFT) & SWITCHPOINT_HOUR_MASK
            | (u16::from(selector) << SWITCHPOINT_SELECTOR_SHIFT) & SWITCHPOINT_SELECTOR_MASK
            | u16::from(self.minute / SWITCHPOINT_MINUTE_STEP) & SWITCHPOINT_MINUTE_MASK
    }

    pub fn is_end_of_season(&self) -> bool {
        self.hour >= SWITCHPOINT_END_OF_SEASON_HOUR
    }

    pub fn is_all_outputs_off(&self) -> bool {
        self.kind == SwitchpointKind::Output(0)
    }

    pub fn is_output_on(&self) -> bool {
        matches!(self.kind, SwitchpointKind::Output(mask) if mask != 0)
    }

    pub fn rate_label(&self) -> Option<char> {
        match self.kind {
            SwitchpointKind::Rate(rate) => RATE_LABELS.get(usize::from(rate)).copied(),
            SwitchpointKind::Output(_) => None,
        }
    }

    /// Ordering by time of day only.
    pub fn cmp_time(&self, other: &Switchpoint) -> Ordering {
        (self.hour, self.minute).cmp(&(other.hour, other.minute))
    }

    fn same_slot(&self, other: &Switchpoint) -> bool {
        self.day_type == other.day_type && self.hour == other.hour && self.minute == other.minute
    }
}

fn reverse_nibble(value: u8) -> u8 {
    (0..4).fold(0, |acc, bit| acc | (((value >> bit) & 1) << (3 - bit)))
}

/// Size of a stored season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeasonSize {
    Known(usize),
    /// The layout gives no way to know where the season ends.
    Unknown,
}

/// Switchpoints for every day type of one season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Season {
    switchpoints: Vec<Switchpoint>,
}

impl Season {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes up to the end-of-season marker (or the end of `bytes`).
    pub fn decode(bytes: &[u8], is_fulcrum: bool) -> Self {
        let switchpoints = bytes
            .chunks_exact(SWITCHPOINT_LENGTH)
            .map(|pair| Switchpoint::decode(u16::from_be_bytes([pair[0], pair[1]]), is_fulcrum))
            .take_while(|sp| !sp.is_end_of_season())
            .collect();
        Season { switchpoints }
    }

    pub fn encode(&self, is_fulcrum: bool) -> Vec<u8> {
        self.switchpoints
            .iter()
            .chain(std::iter::once(&Switchpoint::end_of_season()))
            .flat_map(|sp| sp.encode(is_fulcrum).to_be_bytes())
            .collect()
    }

    pub fn encoded_len(&self) -> usize {
        (self.switchpoints.len() + 1) * SWITCHPOINT_LENGTH
    }

    pub fn push(&mut self, switchpoint: Switchpoint) {
        self.switchpoints.push(switchpoint);
    }

    pub fn switchpoints(&self) -> &[Switchpoint] {
        &self.switchpoints
    }

    pub fn len(&self) -> usize {
        self.switchpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switchpoints.is_empty()
    }

    /// Switchpoints for one day type, in stored order.
    pub fn day(&self, day_type: u8) -> impl Iterator<Item = &Switchpoint> {
        self.switchpoints.iter().filter(move |sp| sp.day_type == day_type)
    }

    /// Stable sort by day type, then time of day.
    pub fn sort(&mut self) {
        self.switchpoints
            .sort_by(|a, b| a.day_type.cmp(&b.day_type).then_with(|| a.cmp_time(b)));
    }

    /// Removes all-outputs-off switchpoints that land on the same slot as an
    /// output-on switchpoint. Midnight entries are kept. Returns how many
    /// were removed.
    pub fn remove_extra_outputs(&mut self) -> usize {
        let before = self.switchpoints.len();
        let snapshot = self.switchpoints.clone();
        self.switchpoints.retain(|sp| {
            if !sp.is_all_outputs_off() || (sp.hour == 0 && sp.minute == 0) {
                return true;
            }
            !snapshot
                .iter()
                .any(|other| other.is_output_on() && other.same_slot(sp))
        });
        before - self.switchpoints.len()
    }
}

impl FromIterator<Switchpoint> for Season {
    fn from_iter<I: IntoIterator<Item = Switchpoint>>(iter: I) -> Self {
        Season {
            switchpoints: iter.into_iter().collect(),
        }
    }
}

/// Up to eight seasons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeasonCollection {
    seasons: Vec<Season>,
}

impl SeasonCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, season: Season) -> Result<(), ScsError> {
        if self.seasons.len() >= MAX_SEASONS {
            return Err(ScsError::InvalidArgument(format!(
                "a TOU schedule holds at most {MAX_SEASONS} seasons"
            )));
        }
        self.seasons.push(season);
        Ok(())
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn seasons_mut(&mut self) -> &mut [Season] {
        &mut self.seasons
    }

    pub fn get(&self, index: usize) -> Option<&Season> {
        self.seasons.get(index)
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    /// Bytes needed to store every season back to back.
    pub fn encoded_len(&self) -> usize {
        self.seasons.iter().map(Season::encoded_len).sum()
    }

    /// Offsets of each season when packed back to back from zero.
    pub fn packed_offsets(&self) -> Vec<usize> {
        self.seasons
            .iter()
            .scan(0usize, |offset, season| {
                let start = *offset;
                *offset += season.encoded_len();
                Some(start)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_switchpoint_word() {
        let sp = Switchpoint::rate(1, 7, 30, 2).unwrap();
        let word = sp.encode(false);
        assert_eq!(word, 0x2000 | 0x0700 | 0x0020 | 0x0006);
        assert_eq!(Switchpoint::decode(word, false), sp);
        assert_eq!(sp.rate_label(), Some('C'));
    }

    #[test]
    fn test_output_bit_assignment() {
        let sp = Switchpoint::output(0, 12, 0, 1).unwrap();
        assert_eq!(sp.encode(false) & 0x00F0, 0x0010);
        assert_eq!(sp.encode(true) & 0x00F0, 0x0080);
        assert_eq!(Switchpoint::decode(sp.encode(true), true), sp);
        assert_eq!(Switchpoint::decode(sp.encode(false), false), sp);

        // Same word, read with the other assignment, names the other output
        let as_fulcrum = Switchpoint::decode(sp.encode(false), true);
        assert_eq!(as_fulcrum.kind, SwitchpointKind::Output(0x08));
    }

    #[test]
    fn test_invalid_switchpoints() {
        assert!(Switchpoint::rate(4, 0, 0, 0).is_err());
        assert!(Switchpoint::rate(0, 24, 0, 0).is_err());
        assert!(Switchpoint::rate(0, 1, 7, 0).is_err());
        assert!(Switchpoint::rate(0, 1, 0, 5).is_err());
        assert!(Switchpoint::output(0, 1, 0, 5).is_err());
    }

    #[test]
    fn test_season_stops_at_end_marker() {
        let season: Season = [
            Switchpoint::rate(0, 0, 0, 0).unwrap(),
            Switchpoint::rate(0, 8, 0, 1).unwrap(),
        ]
        .into_iter()
        .collect();
        let mut bytes = season.encode(false);
        assert_eq!(bytes.len(), season.encoded_len());
        bytes.extend_from_slice(&[0x00, 0x11]);
        assert_eq!(Season::decode(&bytes, false), season);
    }

    #[test]
    fn test_remove_extra_outputs() {
        let mut season: Season = [
            Switchpoint::output(0, 0, 0, 0).unwrap(),
            Switchpoint::output(0, 0, 0, 2).unwrap(),
            Switchpoint::output(0, 6, 0, 0).unwrap(),
            Switchpoint::output(0, 6, 0, 1).unwrap(),
            Switchpoint::output(1, 6, 0, 0).unwrap(),
            Switchpoint::output(0, 18, 0, 0).unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(season.remove_extra_outputs(), 1);
        assert_eq!(season.len(), 5);
        // Midnight off is kept, and the day-type 1 entry had no partner
        assert!(season.switchpoints()[0].is_all_outputs_off());
        assert!(season
            .switchpoints()
            .iter()
            .any(|sp| sp.day_type == 1 && sp.is_all_outputs_off()));
        assert!(!season
            .switchpoints()
            .iter()
            .any(|sp| sp.day_type == 0 && sp.hour == 6 && sp.is_all_outputs_off()));
    }

    #[test]
    fn test_season_sort() {
        let mut season: Season = [
            Switchpoint::rate(1, 6, 0, 0).unwrap(),
            Switchpoint::rate(0, 18, 0, 1).unwrap(),
            Switchpoint::rate(0, 6, 30, 2).unwrap(),
        ]
        .into_iter()
        .collect();
        season.sort();
        let order: Vec<(u8, u8)> = season.switchpoints().iter().map(|sp| (sp.day_type, sp.hour)).collect();
        assert_eq!(order, vec![(0, 6), (0, 18), (1, 6)]);
    }

    #[test]
    fn test_season_collection_limit() {
        let mut seasons = SeasonCollection::new();
        for _ in 0..MAX_SEASONS {
            seasons.push(Season::new()).unwrap();
        }
        assert!(seasons.push(Season::new()).is_err());
        assert_eq!(seasons.encoded_len(), MAX_SEASONS * 2);
        assert_eq!(seasons.packed_offsets()[3], 6);
    }
}
