//! TOU info block: where the calendar and seasons live, and what the typical
//! week looks like.
//!
//! Two physical layouts exist. The standard one stores offsets from a base
//! address with the seasons ahead of the yearly calendar. FULCRUM meters store
//! absolute addresses with the calendar ahead of the seasons, which leaves the
//! size of the last season unknowable.

use chrono::{Datelike, NaiveDate};
use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{be_u16, be_u8},
    sequence::tuple,
    IResult,
};
use serde::Serialize;

use crate::constants::{MAX_SEASONS, TOU_BASE_YEAR, TOU_UNUSED_SEASON};
use crate::error::ScsError;
use crate::payload::bcd::{bcd_to_byte, bcd_to_int, byte_to_bcd, int_to_bcd};
use crate::tou::switchpoint::SeasonSize;

pub const STANDARD_INFO_LENGTH: usize = 29;
pub const FULCRUM_INFO_LENGTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TouInfoLayout {
    Standard,
    Fulcrum,
}

impl TouInfoLayout {
    pub fn encoded_len(self) -> usize {
        match self {
            TouInfoLayout::Standard => STANDARD_INFO_LENGTH,
            TouInfoLayout::Fulcrum => FULCRUM_INFO_LENGTH,
        }
    }
}

/// Decoded TOU info block. Addresses are absolute regardless of layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TouInfo {
    pub layout: TouInfoLayout,
    pub base_address: u16,
    pub yearly_address: u16,
    /// Daily schedule, unused on most meters
    pub daily_address: Option<u16>,
    pub expiration: Option<NaiveDate>,
    pub schedule_id: u16,
    /// Day type for each weekday, Sunday first
    pub typical_week: [u8; 7],
    pub season_addresses: [Option<u16>; MAX_SEASONS],
}

impl TouInfo {
    pub fn new(layout: TouInfoLayout, base_address: u16) -> Self {
        TouInfo {
            layout,
            base_address,
            yearly_address: base_address,
            daily_address: None,
            expiration: None,
            schedule_id: 0,
            typical_week: [0; 7],
            season_addresses: [None; MAX_SEASONS],
        }
    }

    pub fn decode(bytes: &[u8], layout: TouInfoLayout, base_address: u16) -> Result<Self, ScsError> {
        let parsed = match layout {
            TouInfoLayout::Standard => parse_standard(bytes),
            TouInfoLayout::Fulcrum => parse_fulcrum(bytes, base_address),
        };
        parsed.map(|(_, info)| info).map_err(|_| {
            ScsError::FrameParseError(format!(
                "TOU info needs {} bytes, got {}",
                layout.encoded_len(),
                bytes.len()
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let (yy, mm, dd) = match self.expiration {
            Some(date) => (
                byte_to_bcd((date.year() - TOU_BASE_YEAR).rem_euclid(100) as u8),
                byte_to_bcd(date.month() as u8),
                byte_to_bcd(date.day() as u8),
            ),
            None => (0, 0, 0),
        };
        let schedule_id = int_to_bcd(u32::from(self.schedule_id), 2);

        match self.layout {
            TouInfoLayout::Standard => {
                let base = self.base_address;
                let mut out = Vec::with_capacity(STANDARD_INFO_LENGTH);
                out.extend(base.to_be_bytes());
                out.extend(self.yearly_address.wrapping_sub(base).to_be_bytes());
                out.extend(
                    self.daily_address
                        .map_or(0, |a| a.wrapping_sub(base))
                        .to_be_bytes(),
                );
                out.extend([yy, mm, dd]);
                out.extend(schedule_id);
                let week = self
                    .typical_week
                    .iter()
                    .enumerate()
                    .fold(0u16, |acc, (day, &t)| acc | (u16::from(t & 0x03) << (day * 2)));
                out.extend(week.to_be_bytes());
                for slot in &self.season_addresses {
                    let offset = slot.map_or(TOU_UNUSED_SEASON, |a| a.wrapping_sub(base));
                    out.extend(offset.to_be_bytes());
                }
                out
            }
            TouInfoLayout::Fulcrum => {
                let mut out = Vec::with_capacity(FULCRUM_INFO_LENGTH);
                for slot in &self.season_addresses {
                    out.extend(slot.unwrap_or(TOU_UNUSED_SEASON).to_be_bytes());
                }
                out.extend(self.yearly_address.to_be_bytes());
                out.extend(self.typical_week);
                out.extend(schedule_id);
                out.extend([mm, dd, yy]);
                out
            }
        }
    }

    /// Number of seasons in use (slots are filled from the front).
    pub fn season_count(&self) -> usize {
        self.season_addresses.iter().take_while(|s| s.is_some()).count()
    }

    /// Stored size of season `index`, or `None` if the slot is unused.
    pub fn season_size(&self, index: usize) -> Option<SeasonSize> {
        let start = (*self.season_addresses.get(index)?)?;
        let next = self.season_addresses[index + 1..]
            .iter()
            .flatten()
            .copied()
            .find(|&a| a > start);

        match (next, self.layout) {
            (Some(next), _) => Some(SeasonSize::Known(usize::from(next - start))),
            (None, TouInfoLayout::Standard) => Some(SeasonSize::Known(usize::from(
                self.yearly_address.saturating_sub(start),
            ))),
            (None, TouInfoLayout::Fulcrum) => Some(SeasonSize::Unknown),
        }
    }
}

fn season_slots(raw: Vec<u16>, to_address: impl Fn(u16) -> u16) -> [Option<u16>; MAX_SEASONS] {
    let mut slots = [None; MAX_SEASONS];
    for (slot, value) in slots.iter_mut().zip(raw) {
        if value != TOU_UNUSED_SEASON {
            *slot = Some(to_address(value));
        }
    }
    slots
}

/// Standard layout: base, yearly and daily offsets, YYMMDD expiration,
/// BCD schedule id, packed week, then season offsets.
fn parse_standard(input: &[u8]) -> IResult<&[u8], TouInfo> {
    let (rest, base) = be_u16(input)?;
    let (rest, yearly) = be_u16(rest)?;
    let (rest, daily) = be_u16(rest)?;
    let (rest, (yy, mm, dd)) = tuple((be_u8, be_u8, be_u8))(rest)?;
    let (rest, schedule_id) = take(2usize)(rest)?;
    let (rest, week) = be_u16(rest)?;
    let (rest, offsets) = count(be_u16, MAX_SEASONS)(rest)?;

    let mut typical_week = [0u8; 7];
    for (day, slot) in typical_week.iter_mut().enumerate() {
        *slot = ((week >> (day * 2)) & 0x03) as u8;
    }

    Ok((
        rest,
        TouInfo {
            layout: TouInfoLayout::Standard,
            base_address: base,
            yearly_address: base.wrapping_add(yearly),
            daily_address: (daily != 0).then(|| base.wrapping_add(daily)),
            expiration: decode_date(bcd_to_byte(yy), bcd_to_byte(mm), bcd_to_byte(dd)),
            schedule_id: bcd_to_int(schedule_id) as u16,
            typical_week,
            season_addresses: season_slots(offsets, |offset| base.wrapping_add(offset)),
        },
    ))
}

/// FULCRUM layout: absolute season addresses, yearly address, one byte per
/// weekday, BCD schedule id, MMDDYY expiration.
fn parse_fulcrum(input: &[u8], base_address: u16) -> IResult<&[u8], TouInfo> {
    let (rest, addresses) = count(be_u16, MAX_SEASONS)(input)?;
    let (rest, yearly) = be_u16(rest)?;
    let (rest, week) = take(7usize)(rest)?;
    let (rest, schedule_id) = take(2usize)(rest)?;
    let (rest, (mm, dd, yy)) = tuple((be_u8, be_u8, be_u8))(rest)?;

    let mut typical_week = [0u8; 7];
    typical_week.copy_from_slice(week);

    Ok((
        rest,
        TouInfo {
            layout: TouInfoLayout::Fulcrum,
            base_address,
            yearly_address: yearly,
            daily_address: None,
            expiration: decode_date(bcd_to_byte(yy), bcd_to_byte(mm), bcd_to_byte(dd)),
            schedule_id: bcd_to_int(schedule_id) as u16,
            typical_week,
            season_addresses: season_slots(addresses, |address| address),
        },
    ))
}

fn decode_date(yy: u8, mm: u8, dd: u8) -> Option<NaiveDate> {
    if mm == 0 || dd == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(TOU_BASE_YEAR + i32::from(yy), u32::from(mm), u32::from(dd))
}
