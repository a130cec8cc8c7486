//! Display items: the records of a meter's programmed display lists, the
//! format block that controls how values appear, and reading the live value
//! behind an item.

pub mod format;
pub mod item;
pub mod list;
pub mod reader;

pub use format::{format_display_value, DisplayFormat, DisplayFormatFlags, DisplayFormats, DisplayUnits};
pub use item::{DisplayItem, DisplayMode, RegisterClass, TouRate};
pub use list::DisplayLists;
pub use reader::DisplayValue;
