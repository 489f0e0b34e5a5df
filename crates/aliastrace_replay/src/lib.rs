//! ALIASTRACE Replay
//!
//! Forward replay of a pointer-event log into a dynamic alias relation, and
//! backward slicing of two pointer values toward their common history.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod alias;
pub mod config;
pub mod engine;
pub mod finder;
pub mod slice;

pub use address::VersionedAddressSpace;
pub use alias::{
    AliasPair, AliasRelationBuilder, AliasReport, AliasResult, AliasSet, DynamicAliasAnalysis,
    PointerState, UnknownVersion,
};
pub use config::{MergePolicy, ReplayConfig, UnknownVersionPolicy};
pub use engine::{Flow, RecordConsumer, ReplayEngine, ReplayError, ReplayStats};
pub use finder::RecordFinder;
pub use slice::{
    Dependence, Frontier, PointerTrace, SliceEntry, SliceOutcome, TraceSlicer, TraceState,
};
