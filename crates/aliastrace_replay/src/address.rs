//! Versioned address space.
//!
//! Maps disjoint byte ranges to the version of the allocation that currently
//! owns them. A declaration evicts every range it overlaps, so a reused
//! address always resolves to its newest owner.

use aliastrace_core::{Address, Version};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    /// Exclusive end
    end: u64,
    version: Version,
}

/// Interval map from byte ranges to allocation versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionedAddressSpace {
    /// Ranges keyed by start address
    intervals: BTreeMap<u64, Interval>,
}

impl VersionedAddressSpace {
    /// Create an empty address space
    #[must_use]
    pub fn new() -> Self {
        Self {
            intervals: BTreeMap::new(),
        }
    }

    /// Declare `[address, address + bound)` as owned by `version`.
    ///
    /// Every existing range overlapping the new one is removed first. A
    /// zero-length declaration covers nothing and changes nothing.
    pub fn declare(&mut self, address: Address, bound: u64, version: Version) {
        if bound == 0 {
            return;
        }
        let start = address.as_u64();
        let end = address.end(bound);

        let mut evicted: Vec<u64> = self
            .intervals
            .range(start..end)
            .map(|(s, _)| *s)
            .collect();
        if let Some((s, interval)) = self.intervals.range(..start).next_back() {
            if interval.end > start {
                evicted.push(*s);
            }
        }
        for s in evicted {
            self.intervals.remove(&s);
        }

        self.intervals.insert(start, Interval { end, version });
    }

    /// Version owning `address`, if any declared range covers it
    #[must_use]
    pub fn lookup(&self, address: Address) -> Option<Version> {
        let addr = address.as_u64();
        self.intervals
            .range(..=addr)
            .next_back()
            .filter(|(_, interval)| addr < interval.end)
            .map(|(_, interval)| interval.version)
    }

    /// Number of live ranges
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Check whether no range is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Live ranges as `(start, end, version)` in address order
    pub fn ranges(&self) -> impl Iterator<Item = (u64, u64, Version)> + '_ {
        self.intervals
            .iter()
            .map(|(start, interval)| (*start, interval.end, interval.version))
    }
}
