//! Display table parsing.
//!
//! The table holds the normal and alternate items mixed together (told apart
//! by the alternate-mode bit), terminated by a sentinel record. The test-mode
//! list starts at the next record and has its own sentinel.

use serde::Serialize;

use crate::constants::DISPLAY_RECORD_LENGTH;
use crate::display::item::{DisplayItem, DisplayMode};
use crate::error::ScsError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayLists {
    pub normal: Vec<DisplayItem>,
    pub alternate: Vec<DisplayItem>,
    pub test: Vec<DisplayItem>,
}

impl DisplayLists {
    /// Parses whatever the table holds. A missing end marker is logged and
    /// the list stops at the end of the block.
    pub fn parse(table: &[u8]) -> Self {
        let (lists, terminated) = Self::split(table);
        if terminated < 2 {
            log::warn!(
                "Display table of {} bytes has {terminated} of 2 end markers; lists may be cut short",
                table.len()
            );
        }
        lists
    }

    /// Parses a table read from a meter, which must end both lists inside
    /// the block.
    pub fn parse_complete(table: &[u8]) -> Result<Self, ScsError> {
        let (lists, terminated) = Self::split(table);
        if terminated < 2 {
            return Err(ScsError::DataIntegrity(format!(
                "display table of {} bytes has {terminated} of 2 end markers",
                table.len()
            )));
        }
        Ok(lists)
    }

    /// Splits the table into its lists and counts the end markers seen.
    fn split(table: &[u8]) -> (Self, usize) {
        let mut lists = DisplayLists::default();
        let mut terminated = 0;
        let mut records = table.chunks_exact(DISPLAY_RECORD_LENGTH).map(|chunk| {
            let mut record = [0u8; DISPLAY_RECORD_LENGTH];
            record.copy_from_slice(chunk);
            record
        });

        for record in records.by_ref() {
            let Some(item) = DisplayItem::from_record(record, false) else {
                terminated += 1;
                break;
            };
            match item.mode {
                DisplayMode::Alternate => lists.alternate.push(item),
                _ => lists.normal.push(item),
            }
        }

        if terminated == 1 {
            for record in records {
                let Some(item) = DisplayItem::from_record(record, true) else {
                    terminated += 1;
                    break;
                };
                lists.test.push(item);
            }
        }

        log::debug!(
            "Display table: {} normal, {} alternate, {} test items",
            lists.normal.len(),
            lists.alternate.len(),
            lists.test.len()
        );
        (lists, terminated)
    }

    pub fn len(&self) -> usize {
        self.normal.len() + self.alternate.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item, normal first, then alternate, then test.
    pub fn iter(&self) -> impl Iterator<Item = &DisplayItem> {
        self.normal
            .iter()
            .chain(self.alternate.iter())
            .chain(self.test.iter())
    }
}
