//! Cursor for navigating a log in either direction.

use crate::encoding::RECORD_SIZE;
use aliastrace_core::RecordIndex;
use serde::{Deserialize, Serialize};

/// Direction of traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Emission order, starting at record 0
    Forward,
    /// Reverse emission order, starting at the last record
    Backward,
}

/// Record-granular position in a log of known length.
///
/// `boundary` is the number of records on the "already consumed" side when
/// moving forward, and the number of records still ahead when moving
/// backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    boundary: u64,
    total: u64,
    direction: Direction,
}

impl Cursor {
    /// Cursor at the start of a traversal over `total` records
    #[must_use]
    pub fn new(direction: Direction, total: u64) -> Self {
        let boundary = match direction {
            Direction::Forward => 0,
            Direction::Backward => total,
        };
        Self {
            boundary,
            total,
            direction,
        }
    }

    /// Index of the record the next step yields
    #[must_use]
    pub fn next_index(&self) -> Option<RecordIndex> {
        match self.direction {
            Direction::Forward if self.boundary < self.total => {
                Some(RecordIndex::from_raw(self.boundary))
            }
            Direction::Backward if self.boundary > 0 => {
                Some(RecordIndex::from_raw(self.boundary - 1))
            }
            _ => None,
        }
    }

    /// Step over one record
    pub fn advance(&mut self) {
        match self.direction {
            Direction::Forward => self.boundary = (self.boundary + 1).min(self.total),
            Direction::Backward => self.boundary = self.boundary.saturating_sub(1),
        }
    }

    /// Records not yet yielded
    #[must_use]
    pub fn remaining(&self) -> u64 {
        match self.direction {
            Direction::Forward => self.total - self.boundary,
            Direction::Backward => self.boundary,
        }
    }

    /// Records yielded so far
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.total - self.remaining()
    }

    /// Total records in the log
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Traversal direction
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Byte offset of a record slot
    #[must_use]
    pub const fn byte_offset(index: RecordIndex) -> u64 {
        index.as_u64() * RECORD_SIZE as u64
    }
}
