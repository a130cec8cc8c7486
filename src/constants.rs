//! SCS Protocol Constants
//!
//! This module defines the byte values, command codes and record masks used by
//! the SCS upload/download protocol and the data structures stored in basepage.

// ----------------------------------------------------------------------------
// Link control bytes
// ----------------------------------------------------------------------------

/// Start of a request or data packet
pub const SCS_STX: u8 = 0x02;

/// Positive acknowledgement
pub const SCS_ACK: u8 = 0x06;

/// Request rejected (bad address, length or command)
pub const SCS_NAK: u8 = 0x15;

/// Request cancelled, usually for insufficient security
pub const SCS_CAN: u8 = 0x18;

// Command codes
pub const SCS_CMD_IDENTIFY: u8 = b'I';
pub const SCS_CMD_SECURITY: u8 = b'S';
pub const SCS_CMD_UPLOAD: u8 = b'U';
pub const SCS_CMD_DOWNLOAD: u8 = b'D';
pub const SCS_CMD_EXIT: u8 = b'X';

/// Length of the device-type code returned by Identify
pub const SCS_IDENTIFY_LENGTH: usize = 3;

/// Length of a security code
pub const SCS_SECURITY_CODE_LENGTH: usize = 4;

/// Size of the CRC trailer on every packet
pub const SCS_CRC_LENGTH: usize = 2;

// ----------------------------------------------------------------------------
// Display table records
// ----------------------------------------------------------------------------

/// Size of one display item record
pub const DISPLAY_RECORD_LENGTH: usize = 4;

/// First byte of the record that terminates a display list
pub const DISPLAY_END_OF_TABLE: u8 = 0xFF;

pub const DISPLAY_TYPE_MASK: u8 = 0x70;
pub const DISPLAY_CLASS_MASK: u8 = 0x0F;
pub const DISPLAY_ALT_MODE_MASK: u8 = 0x80;
pub const DISPLAY_RATE_MASK: u8 = 0x70;
pub const DISPLAY_BANK_MASK: u8 = 0x0F;

/// Size of the display format block (energy, demand, cumulative)
pub const DISPLAY_FORMAT_BLOCK_LENGTH: usize = 6;

// ----------------------------------------------------------------------------
// TOU calendar event words
// ----------------------------------------------------------------------------

pub const TOU_EVENT_LENGTH: usize = 2;

pub const TOU_START_YEAR_MASK: u16 = 0xF800;
pub const TOU_START_YEAR_PATTERN: u16 = 0x1000;

pub const TOU_SEASON_SELECT_MASK: u16 = 0xE000;
pub const TOU_SEASON_SELECT_PATTERN: u16 = 0x0000;

pub const TOU_DST_CHANGE_MASK: u16 = 0xF000;
pub const TOU_DST_CHANGE_PATTERN: u16 = 0x2000;

pub const TOU_HOLIDAY_SELECT_MASK: u16 = 0xF000;
pub const TOU_HOLIDAY_SELECT_PATTERN: u16 = 0x3000;

pub const TOU_CALENDAR_END_MASK: u16 = 0xF800;
pub const TOU_CALENDAR_END_PATTERN: u16 = 0xF800;

pub const TOU_EVENT_YEAR_MASK: u16 = 0x00FF;
pub const TOU_EVENT_INDEX_MASK: u16 = 0x0E00;
pub const TOU_EVENT_INDEX_SHIFT: u16 = 9;
pub const TOU_EVENT_MONTH_MASK: u16 = 0x01E0;
pub const TOU_EVENT_MONTH_SHIFT: u16 = 5;
pub const TOU_EVENT_DAY_MASK: u16 = 0x001F;

/// StartYear stores the year as an offset from this base
pub const TOU_BASE_YEAR: i32 = 2000;

// ----------------------------------------------------------------------------
// TOU switchpoints
// ----------------------------------------------------------------------------

pub const SWITCHPOINT_LENGTH: usize = 2;
pub const SWITCHPOINT_TYPE_MASK: u16 = 0x8000;
pub const SWITCHPOINT_DAY_TYPE_MASK: u16 = 0x6000;
pub const SWITCHPOINT_DAY_TYPE_SHIFT: u16 = 13;
pub const SWITCHPOINT_HOUR_MASK: u16 = 0x1F00;
pub const SWITCHPOINT_HOUR_SHIFT: u16 = 8;
pub const SWITCHPOINT_SELECTOR_MASK: u16 = 0x00F0;
pub const SWITCHPOINT_SELECTOR_SHIFT: u16 = 4;
pub const SWITCHPOINT_MINUTE_MASK: u16 = 0x000F;

/// Hour value marking the end of a season's switchpoint list
pub const SWITCHPOINT_END_OF_SEASON_HOUR: u8 = 24;

/// Switchpoint minutes are stored in these increments
pub const SWITCHPOINT_MINUTE_STEP: u8 = 5;

pub const MAX_SEASONS: usize = 8;
pub const MAX_OUTPUTS: u8 = 4;
pub const DAY_TYPES: u8 = 4;

/// Season slot marker for "no season stored here"
pub const TOU_UNUSED_SEASON: u16 = 0xFFFF;

// ----------------------------------------------------------------------------
// Flag bytes written during reconfiguration
// ----------------------------------------------------------------------------

pub const FLAG_SET: u8 = 0x01;
pub const FLAG_CLEAR: u8 = 0x00;

/// Length of the BCD clock block (YY MM DD HH MM SS)
pub const CLOCK_LENGTH: usize = 6;
