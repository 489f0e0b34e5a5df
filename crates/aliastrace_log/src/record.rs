//! Log record types.
//!
//! One record per instrumentation callback. Records carry raw addresses and
//! value ids only; versions are derived during replay.

use aliastrace_core::{Address, ValueId};
use serde::{Deserialize, Serialize};

/// Record kind - the `u32` tag at the start of every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum RecordKind {
    /// A byte range comes into existence
    MemAlloc = 0,
    /// A top-level pointer takes a new value
    TopLevel = 1,
    /// A pointer is written to memory
    Store = 2,
    /// A call instruction is about to transfer control
    Call = 3,
    /// A return instruction is about to transfer control
    Return = 4,
    /// A basic block is entered
    BasicBlock = 5,
    /// A function body is entered
    Enter = 6,
}

impl RecordKind {
    /// All kinds in tag order
    pub const ALL: [Self; 7] = [
        Self::MemAlloc,
        Self::TopLevel,
        Self::Store,
        Self::Call,
        Self::Return,
        Self::BasicBlock,
        Self::Enter,
    ];

    /// Decode a wire tag
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Wire tag
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MemAlloc => "MemAlloc",
            Self::TopLevel => "TopLevel",
            Self::Store => "Store",
            Self::Call => "Call",
            Self::Return => "Return",
            Self::BasicBlock => "BasicBlock",
            Self::Enter => "Enter",
        };
        f.write_str(name)
    }
}

/// A decoded log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LogRecord {
    /// `[address, address + bound)` is now owned by `allocated_by`
    MemAlloc {
        /// Start of the range
        address: Address,
        /// Size in bytes
        bound: u64,
        /// Allocating value; `None` for memory supplied from outside
        allocated_by: Option<ValueId>,
    },
    /// Top-level pointer `pointer` now holds `pointee`
    TopLevel {
        /// Pointer value
        pointer: ValueId,
        /// New target, possibly null
        pointee: Address,
        /// Address the pointer was loaded from, null if not a load
        loaded_from: Address,
    },
    /// `instruction` wrote `pointee` through `pointer_address`
    Store {
        /// Store instruction
        instruction: ValueId,
        /// Written location
        pointer_address: Address,
        /// Written pointer
        pointee: Address,
    },
    /// Call instruction about to execute
    Call {
        /// Call instruction
        instruction: ValueId,
    },
    /// Return instruction about to execute
    Return {
        /// Return instruction
        instruction: ValueId,
    },
    /// Basic block entered
    BasicBlock {
        /// Block value
        block: ValueId,
    },
    /// Function entered
    Enter {
        /// Function value
        function: ValueId,
    },
}

impl LogRecord {
    /// Kind of this record
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::MemAlloc { .. } => RecordKind::MemAlloc,
            Self::TopLevel { .. } => RecordKind::TopLevel,
            Self::Store { .. } => RecordKind::Store,
            Self::Call { .. } => RecordKind::Call,
            Self::Return { .. } => RecordKind::Return,
            Self::BasicBlock { .. } => RecordKind::BasicBlock,
            Self::Enter { .. } => RecordKind::Enter,
        }
    }

    /// The program value this record is about
    #[must_use]
    pub const fn value(&self) -> Option<ValueId> {
        match self {
            Self::MemAlloc { allocated_by, .. } => *allocated_by,
            Self::TopLevel { pointer, .. } => Some(*pointer),
            Self::Store { instruction, .. }
            | Self::Call { instruction }
            | Self::Return { instruction } => Some(*instruction),
            Self::BasicBlock { block } => Some(*block),
            Self::Enter { function } => Some(*function),
        }
    }
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemAlloc {
                address,
                bound,
                allocated_by,
            } => match allocated_by {
                Some(v) => write!(f, "MemAlloc {} +{} by {}", address, bound, v),
                None => write!(f, "MemAlloc {} +{} by <external>", address, bound),
            },
            Self::TopLevel {
                pointer,
                pointee,
                loaded_from,
            } => {
                if loaded_from.is_null() {
                    write!(f, "TopLevel {} -> {}", pointer, pointee)
                } else {
                    write!(f, "TopLevel {} -> {} (loaded from {})", pointer, pointee, loaded_from)
                }
            }
            Self::Store {
                instruction,
                pointer_address,
                pointee,
            } => write!(f, "Store {} *{} = {}", instruction, pointer_address, pointee),
            Self::Call { instruction } => write!(f, "Call {}", instruction),
            Self::Return { instruction } => write!(f, "Return {}", instruction),
            Self::BasicBlock { block } => write!(f, "BasicBlock {}", block),
            Self::Enter { function } => write!(f, "Enter {}", function),
        }
    }
}
