//! Program metadata supplied by the instrumentation pass.
//!
//! The trace only carries integer ids. What each id *is* (an argument, a
//! load, a call, ...) comes from an arena of immutable descriptors, queried
//! through the [`ValueLookup`] capability trait.

use crate::error::{CoreError, CoreResult};
use crate::id::ValueId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Target of a call instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    /// Statically known function
    Direct(ValueId),
    /// Call through a function pointer
    Indirect,
}

/// Classification of a program value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueKind {
    /// Formal parameter `index` of `function`
    Argument {
        /// Owning function
        function: ValueId,
        /// Parameter position
        index: u32,
    },
    /// Call instruction; its own id names the call result
    Call {
        /// Called function
        callee: Callee,
        /// Actual argument operands, by position
        #[serde(default)]
        arguments: Vec<Option<ValueId>>,
    },
    /// Return instruction
    Return {
        /// Returned operand, if any
        #[serde(default)]
        value: Option<ValueId>,
    },
    /// Memory load producing a pointer
    Load {
        /// Address operand
        pointer: ValueId,
    },
    /// Memory store
    Store {
        /// Address operand
        pointer: ValueId,
        /// Stored operand
        value: ValueId,
    },
    /// Address computation or type reinterpretation of a single operand
    Derived {
        /// Source operand
        source: ValueId,
    },
    /// Control-flow join (phi) or select
    Join {
        /// Incoming values
        incoming: Vec<ValueId>,
    },
    /// Stack allocation
    Alloca,
    /// Global variable
    Global,
    /// Function definition or declaration
    Function {
        /// Declared without a body
        #[serde(default)]
        external: bool,
    },
    /// Basic block
    BasicBlock,
    /// Anything else (constants, unsupported instructions)
    Other,
}

impl ValueKind {
    /// Short kind name for diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Argument { .. } => "argument",
            Self::Call { .. } => "call",
            Self::Return { .. } => "return",
            Self::Load { .. } => "load",
            Self::Store { .. } => "store",
            Self::Derived { .. } => "derived",
            Self::Join { .. } => "join",
            Self::Alloca => "alloca",
            Self::Global => "global",
            Self::Function { .. } => "function",
            Self::BasicBlock => "block",
            Self::Other => "other",
        }
    }
}

/// Immutable description of one program value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDescriptor {
    /// Dense id, matches the ids written into the trace
    pub id: ValueId,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Enclosing function, if the value lives inside one
    #[serde(default)]
    pub function: Option<ValueId>,
    /// Classification
    pub kind: ValueKind,
}

impl ValueDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(id: ValueId, name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            id,
            name: name.into(),
            function: None,
            kind,
        }
    }

    /// Set the enclosing function
    #[must_use]
    pub fn in_function(mut self, function: ValueId) -> Self {
        self.function = Some(function);
        self
    }
}

/// Capability lookup from value ids to their classification
pub trait ValueLookup {
    /// Descriptor for `id`, if the metadata knows it
    fn describe(&self, id: ValueId) -> Option<&ValueDescriptor>;

    /// Classification of `id`
    fn kind(&self, id: ValueId) -> Option<&ValueKind> {
        self.describe(id).map(|d| &d.kind)
    }

    /// Function enclosing `id`
    fn function_of(&self, id: ValueId) -> Option<ValueId> {
        self.describe(id).and_then(|d| d.function)
    }

    /// Whether `id` names a function declared without a body
    fn is_external_function(&self, id: ValueId) -> bool {
        matches!(self.kind(id), Some(ValueKind::Function { external: true }))
    }

    /// Whether a call instruction leaves the instrumented program
    fn calls_external(&self, call: ValueId) -> bool {
        match self.kind(call) {
            Some(ValueKind::Call {
                callee: Callee::Direct(f),
                ..
            }) => self.is_external_function(*f),
            _ => false,
        }
    }

    /// Name for printing; falls back to the raw id
    fn display_name(&self, id: ValueId) -> String {
        match self.describe(id) {
            Some(d) if !d.name.is_empty() => d.name.clone(),
            _ => id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProgramFile {
    values: Vec<ValueDescriptor>,
}

/// Arena of value descriptors keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInfo {
    values: IndexMap<ValueId, ValueDescriptor>,
}

impl ProgramInfo {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    /// Parse metadata from its JSON form: `{"values": [descriptor, ...]}`
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` on malformed JSON, duplicate ids or the
    /// reserved unknown id
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let file: ProgramFile = serde_json::from_str(json)?;
        let mut info = Self::new();
        info.values.reserve(file.values.len());
        for descriptor in file.values {
            info.insert(descriptor)?;
        }
        Ok(info)
    }

    /// Add a descriptor
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` if the id is already taken or is the
    /// reserved unknown id
    pub fn insert(&mut self, descriptor: ValueDescriptor) -> CoreResult<()> {
        let id = descriptor.id;
        if id.as_u32() == ValueId::UNKNOWN_RAW {
            return Err(CoreError::InvalidMetadata {
                reason: format!("value id {} is reserved for unknown values", id.as_u32()),
            });
        }
        if self.values.contains_key(&id) {
            return Err(CoreError::InvalidMetadata {
                reason: format!("duplicate value id {}", id),
            });
        }
        self.values.insert(id, descriptor);
        Ok(())
    }

    /// Builder-style insert for tests and fixtures
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` if the id is already taken
    pub fn with(mut self, descriptor: ValueDescriptor) -> CoreResult<Self> {
        self.insert(descriptor)?;
        Ok(self)
    }

    /// Number of known values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether no values are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ValueLookup for ProgramInfo {
    fn describe(&self, id: ValueId) -> Option<&ValueDescriptor> {
        self.values.get(&id)
    }
}
