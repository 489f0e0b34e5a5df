//! ALIASTRACE Core Types
//!
//! This crate contains pure types and logic with no I/O beyond parsing
//! program metadata from an in-memory string.
//! Program values are dense integer ids; everything else is derived from them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod error;
pub mod id;
pub mod program;
pub mod version;

// Re-exports
pub use address::{Address, VersionedAddress};
pub use error::{CoreError, CoreResult};
pub use id::{RecordIndex, ValueId};
pub use program::{Callee, ProgramInfo, ValueDescriptor, ValueKind, ValueLookup};
pub use version::{Version, VersionCounter};
