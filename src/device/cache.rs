//! Per-session cache of values that cannot change without reprogramming the
//! meter or running a reconfiguration through this session.

use chrono::NaiveDate;

use crate::display::format::DisplayFormats;

/// Values read once per session. Cleared on reconnect and after any
/// reconfiguration that could change them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCache {
    pub clock_running: Option<bool>,
    pub tou_running: Option<bool>,
    /// `Some(None)` when the meter has no expiration date programmed
    pub tou_expiration: Option<Option<NaiveDate>>,
    pub display_formats: Option<DisplayFormats>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        *self = SessionCache::default();
    }

    /// Forgets the TOU state after the calendar was rewritten.
    pub fn invalidate_tou(&mut self) {
        self.tou_running = None;
        self.tou_expiration = None;
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionCache::default()
    }
}
