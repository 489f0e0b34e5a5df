//! Raw and versioned memory addresses.

use crate::version::Version;
use serde::{Deserialize, Serialize};

/// A byte address in the traced process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// The null pointer
    pub const NULL: Self = Self(0);

    /// Create from a raw address
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw address
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check for the null pointer
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// End of the range `[self, self + bound)`, saturating at the top of the
    /// address space
    #[must_use]
    pub const fn end(&self, bound: u64) -> u64 {
        self.0.saturating_add(bound)
    }
}

impl From<u64> for Address {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// An address qualified by the allocation version that owned it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionedAddress {
    /// Byte address
    pub address: Address,
    /// Owning allocation version, possibly [`Version::UNKNOWN`]
    pub version: Version,
}

impl VersionedAddress {
    /// Create a new versioned address
    #[must_use]
    pub const fn new(address: Address, version: Version) -> Self {
        Self { address, version }
    }

    /// Whether the owning allocation could not be resolved
    #[must_use]
    pub const fn is_version_unknown(&self) -> bool {
        self.version.is_unknown()
    }
}

impl std::fmt::Display for VersionedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.address, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_null() {
        assert!(Address::NULL.is_null());
        assert!(!Address::new(0x1000).is_null());
    }

    #[test]
    fn test_address_end_saturates() {
        assert_eq!(Address::new(0x10).end(8), 0x18);
        assert_eq!(Address::new(u64::MAX - 1).end(8), u64::MAX);
    }

    #[test]
    fn test_versioned_address_display() {
        let va = VersionedAddress::new(Address::new(0x20), Version::new(3));
        assert_eq!(format!("{}", va), "0x20@3");
        assert!(!va.is_version_unknown());
    }

    #[test]
    fn test_same_address_different_version() {
        let a = VersionedAddress::new(Address::new(0x20), Version::new(1));
        let b = VersionedAddress::new(Address::new(0x20), Version::new(2));
        assert_ne!(a, b);
    }
}
