//! Locates the starting records for slicing two values.

use aliastrace_core::{Address, RecordIndex, ValueId};
use aliastrace_log::LogRecord;

/// Forward scan over `TopLevel` records that stops at the first point where
/// both values hold the same non-null address.
#[derive(Debug, Clone)]
pub struct RecordFinder {
    values: [ValueId; 2],
    latest: [Option<(RecordIndex, Address)>; 2],
    found: Option<(RecordIndex, RecordIndex)>,
}

impl RecordFinder {
    /// Look for the point where `first` and `second` meet
    #[must_use]
    pub fn new(first: ValueId, second: ValueId) -> Self {
        Self {
            values: [first, second],
            latest: [None, None],
            found: None,
        }
    }

    /// Feed one record; returns `true` once both starting records are known
    pub fn on_record(&mut self, index: RecordIndex, record: &LogRecord) -> bool {
        if self.found.is_some() {
            return true;
        }
        let LogRecord::TopLevel {
            pointer, pointee, ..
        } = *record
        else {
            return false;
        };

        for side in 0..2 {
            if self.values[side] == pointer {
                self.latest[side] = Some((index, pointee));
            }
        }

        if let [Some((i, x)), Some((j, y))] = self.latest {
            if x == y && !x.is_null() {
                tracing::debug!(first = %i, second = %j, address = %x, "starting records found");
                self.found = Some((i, j));
            }
        }
        self.found.is_some()
    }

    /// The two starting records, if the values ever met
    #[must_use]
    pub fn found(&self) -> Option<(RecordIndex, RecordIndex)> {
        self.found
    }
}
