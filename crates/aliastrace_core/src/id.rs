//! Identifiers for program values and log records.
//!
//! Program values (pointers, instructions, functions, basic blocks) share a
//! single dense id space assigned by the instrumentation pass.

use serde::{Deserialize, Serialize};

/// Program value identifier, shared by pointers, instructions, functions and blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Wire encoding of "no value" (e.g. memory allocated outside the program)
    pub const UNKNOWN_RAW: u32 = u32::MAX;

    /// Create from the raw wire id
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Decode a wire id that may carry the unknown sentinel
    #[must_use]
    pub const fn from_wire(raw: u32) -> Option<Self> {
        if raw == Self::UNKNOWN_RAW {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Encode an optional id for the wire
    #[must_use]
    pub const fn to_wire(id: Option<Self>) -> u32 {
        match id {
            Some(id) => id.0,
            None => Self::UNKNOWN_RAW,
        }
    }

    /// Get the raw id
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ValueId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// 0-based position of a record in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordIndex(u64);

impl RecordIndex {
    /// Create from a raw position
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw position
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for RecordIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_id_wire_sentinel() {
        assert_eq!(ValueId::from_wire(u32::MAX), None);
        assert_eq!(ValueId::from_wire(3), Some(ValueId::new(3)));
        assert_eq!(ValueId::to_wire(None), u32::MAX);
        assert_eq!(ValueId::to_wire(Some(ValueId::new(3))), 3);
    }

    #[test]
    fn test_value_id_ordering() {
        assert!(ValueId::new(1) < ValueId::new(2));
    }

    #[test]
    fn test_value_id_display() {
        assert_eq!(format!("{}", ValueId::new(42)), "v42");
    }

    #[test]
    fn test_value_id_serde_transparent() {
        let json = serde_json::to_string(&ValueId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
