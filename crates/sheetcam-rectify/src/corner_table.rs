//! Corner-selection table.
//!
//! Destination corners of the output square are, in order: top-left,
//! top-right, bottom-right, bottom-left. Each one is fed by one corner of one
//! marker. Marker corners are indexed clockwise from the marker's own
//! top-left (`0 = TL, 1 = TR, 2 = BR, 3 = BL`).
//!
//! The default table expects the sheet layout
//!
//! ```text
//!  [1] ---------- [2]
//!   |              |
//!   |              |
//!  [3] ---------- [4]
//! ```
//!
//! with every marker printed upright, and takes the outermost corner of each.
//! Swapping entries mirrors or rotates the output.

use crate::RectifyError;
use serde::{Deserialize, Serialize};

/// One corner of one marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CornerRef {
    pub marker_id: u32,
    /// Marker corner index `0..=3`.
    pub corner: u8,
}

impl CornerRef {
    pub const fn new(marker_id: u32, corner: u8) -> Self {
        Self { marker_id, corner }
    }
}

/// Default table, in destination order TL, TR, BR, BL.
pub const DEFAULT_CORNER_TABLE: [CornerRef; 4] = [
    CornerRef::new(1, 0),
    CornerRef::new(2, 1),
    CornerRef::new(4, 2),
    CornerRef::new(3, 3),
];

/// Validated mapping from output corners to marker corners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[CornerRef; 4]", into = "[CornerRef; 4]")]
pub struct CornerTable {
    entries: [CornerRef; 4],
}

impl CornerTable {
    /// Build a table; marker ids must be distinct and corner indices `< 4`.
    pub fn new(entries: [CornerRef; 4]) -> Result<Self, RectifyError> {
        for (i, e) in entries.iter().enumerate() {
            if e.corner > 3 {
                return Err(RectifyError::InvalidCornerTable(format!(
                    "entry {i}: corner index {} is not in 0..=3",
                    e.corner
                )));
            }
            if entries[..i].iter().any(|p| p.marker_id == e.marker_id) {
                return Err(RectifyError::InvalidCornerTable(format!(
                    "marker id {} appears more than once",
                    e.marker_id
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Entries in destination order TL, TR, BR, BL.
    pub fn entries(&self) -> &[CornerRef; 4] {
        &self.entries
    }

    /// Marker ids that must be detected, ascending.
    pub fn required_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entries.iter().map(|e| e.marker_id).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for CornerTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_CORNER_TABLE,
        }
    }
}

impl TryFrom<[CornerRef; 4]> for CornerTable {
    type Error = RectifyError;

    fn try_from(entries: [CornerRef; 4]) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<CornerTable> for [CornerRef; 4] {
    fn from(table: CornerTable) -> Self {
        table.entries
    }
}
