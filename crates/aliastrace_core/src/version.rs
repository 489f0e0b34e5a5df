//! Allocation versions.
//!
//! Every `MemAlloc` event receives the next value of a single monotonically
//! increasing counter. `Version::UNKNOWN` is reserved and is never handed out.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allocation version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);

impl Version {
    /// Address not covered by any declared allocation
    pub const UNKNOWN: Self = Self(u32::MAX);

    /// Create a new version
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw version
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Check for the reserved unknown version
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "?")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Global version counter owned by a single forward replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCounter {
    next: u32,
}

impl VersionCounter {
    /// Create a counter starting at version 0
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Start from an arbitrary raw version
    #[must_use]
    pub const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Version the next allocation will receive
    ///
    /// # Errors
    ///
    /// Returns `VersionCounterOverflow` once the counter reaches the reserved
    /// unknown version
    pub fn current(&self) -> CoreResult<Version> {
        let version = Version(self.next);
        if version.is_unknown() {
            return Err(CoreError::VersionCounterOverflow);
        }
        Ok(version)
    }

    /// Move past the current version
    ///
    /// # Errors
    ///
    /// Returns `VersionCounterOverflow` instead of wrapping
    pub fn advance(&mut self) -> CoreResult<()> {
        self.next = self
            .next
            .checked_add(1)
            .ok_or(CoreError::VersionCounterOverflow)?;
        Ok(())
    }

    /// Number of versions handed out so far
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.next
    }
}

impl Default for VersionCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display() {
        assert_eq!(format!("{}", Version::new(7)), "7");
        assert_eq!(format!("{}", Version::UNKNOWN), "?");
    }

    #[test]
    fn test_version_ord() {
        assert!(Version::new(1) < Version::new(2));
        assert!(Version::new(2) < Version::UNKNOWN);
    }

    #[test]
    fn test_counter_monotonic() {
        let mut counter = VersionCounter::new();
        assert_eq!(counter.current().unwrap(), Version::new(0));
        counter.advance().unwrap();
        assert_eq!(counter.current().unwrap(), Version::new(1));
        assert_eq!(counter.issued(), 1);
    }

    #[test]
    fn test_counter_never_yields_unknown() {
        let mut counter = VersionCounter::starting_at(u32::MAX - 1);
        assert_eq!(counter.current().unwrap(), Version::new(u32::MAX - 1));
        counter.advance().unwrap();
        assert_eq!(counter.current(), Err(CoreError::VersionCounterOverflow));
        assert_eq!(counter.advance(), Err(CoreError::VersionCounterOverflow));
    }
}
