//! # Time-of-Use Calendar Model
//!
//! Calendar event words, season switchpoints, the TOU info block and the
//! schedule that ties them together.

pub mod event;
pub mod info;
pub mod schedule;
pub mod switchpoint;

pub use event::{DstDirection, EventType, TouEvent, TouEventCollection};
pub use info::{TouInfo, TouInfoLayout};
pub use schedule::{TouArea, TouFitError, TouImage, TouSchedule};
pub use switchpoint::{Season, SeasonCollection, SeasonSize, Switchpoint, SwitchpointKind};
