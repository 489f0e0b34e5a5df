//! Dynamic alias relation.
//!
//! Replays `MemAlloc` and `TopLevel` records forward. Two pointers alias when
//! they are observed holding the same address under the same allocation
//! version at the same time.

use crate::address::VersionedAddressSpace;
use crate::config::UnknownVersionPolicy;
use aliastrace_core::{
    Address, CoreError, CoreResult, ValueId, Version, VersionCounter, VersionedAddress,
};
use aliastrace_log::LogRecord;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Answer to an alias query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliasResult {
    /// Never observed at the same versioned address
    NoAlias,
    /// Observed at the same versioned address at least once
    MayAlias,
}

impl std::fmt::Display for AliasResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAlias => write!(f, "NoAlias"),
            Self::MayAlias => write!(f, "MayAlias"),
        }
    }
}

/// Unordered pair of values, stored with the smaller id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AliasPair {
    first: ValueId,
    second: ValueId,
}

impl AliasPair {
    /// Canonicalize `(a, b)`
    #[must_use]
    pub fn new(a: ValueId, b: ValueId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Smaller id
    #[must_use]
    pub const fn first(&self) -> ValueId {
        self.first
    }

    /// Larger id
    #[must_use]
    pub const fn second(&self) -> ValueId {
        self.second
    }
}

/// Set of canonical alias pairs in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet {
    pairs: IndexSet<AliasPair>,
}

impl AliasSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self {
            pairs: IndexSet::new(),
        }
    }

    /// Add a pair; returns whether it was new
    pub fn insert(&mut self, a: ValueId, b: ValueId) -> bool {
        self.pairs.insert(AliasPair::new(a, b))
    }

    /// Membership query
    #[must_use]
    pub fn alias(&self, a: ValueId, b: ValueId) -> AliasResult {
        if self.pairs.contains(&AliasPair::new(a, b)) {
            AliasResult::MayAlias
        } else {
            AliasResult::NoAlias
        }
    }

    /// All pairs in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &AliasPair> {
        self.pairs.iter()
    }

    /// Number of pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check for no pairs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Current pointer targets and their inverse.
///
/// `pointing_to` and `pointed_by` are mutual inverses at every step.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    pointing_to: IndexMap<ValueId, VersionedAddress>,
    pointed_by: IndexMap<VersionedAddress, IndexSet<ValueId>>,
}

impl PointerState {
    /// Create empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current target of `pointer`
    #[must_use]
    pub fn target(&self, pointer: ValueId) -> Option<VersionedAddress> {
        self.pointing_to.get(&pointer).copied()
    }

    /// Pointers currently at `target`
    pub fn pointers_at(&self, target: VersionedAddress) -> impl Iterator<Item = ValueId> + '_ {
        self.pointed_by
            .get(&target)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Forget `pointer`'s current target
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the inverse map has no matching entry
    pub fn remove(&mut self, pointer: ValueId) -> CoreResult<Option<VersionedAddress>> {
        let Some(target) = self.pointing_to.swap_remove(&pointer) else {
            return Ok(None);
        };
        let set = self.pointed_by.get_mut(&target).ok_or_else(|| {
            CoreError::invariant(format!("{} points to {} but nothing is pointed there", pointer, target))
        })?;
        if !set.swap_remove(&pointer) {
            return Err(CoreError::invariant(format!(
                "{} points to {} but is missing from its pointed-by set",
                pointer, target
            )));
        }
        if set.is_empty() {
            self.pointed_by.swap_remove(&target);
        }
        Ok(Some(target))
    }

    /// Record `pointer -> target`; `pointer` must have no current target
    pub fn insert(&mut self, pointer: ValueId, target: VersionedAddress) {
        self.pointing_to.insert(pointer, target);
        self.pointed_by.entry(target).or_default().insert(pointer);
    }

    /// Number of pointers with a target
    #[must_use]
    pub fn len(&self) -> usize {
        self.pointing_to.len()
    }

    /// Check for no tracked pointers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pointing_to.is_empty()
    }

    /// Check that both maps describe the same relation
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let forward = self
            .pointing_to
            .iter()
            .all(|(p, t)| self.pointed_by.get(t).is_some_and(|s| s.contains(p)));
        let backward = self.pointed_by.iter().all(|(t, set)| {
            !set.is_empty() && set.iter().all(|p| self.pointing_to.get(p) == Some(t))
        });
        forward && backward
    }
}

/// A pointer whose target had no live allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownVersion {
    /// Unresolved address
    pub address: Address,
    /// First pointer observed there
    pub pointer: ValueId,
}

/// Forward consumer that builds the alias relation
#[derive(Debug, Clone, Default)]
pub struct AliasRelationBuilder {
    space: VersionedAddressSpace,
    counter: VersionCounter,
    state: PointerState,
    aliases: AliasSet,
    unknown_versions: IndexMap<Address, ValueId>,
    policy: UnknownVersionPolicy,
}

impl AliasRelationBuilder {
    /// Create a builder with the default unknown-version policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-version policy
    #[must_use]
    pub fn with_policy(mut self, policy: UnknownVersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_counter(mut self, counter: VersionCounter) -> Self {
        self.counter = counter;
        self
    }

    /// Dispatch one record; control-flow and store records are ignored
    ///
    /// # Errors
    ///
    /// Propagates `InvariantViolation` and `VersionCounterOverflow`
    pub fn on_record(&mut self, record: &LogRecord) -> CoreResult<()> {
        match *record {
            LogRecord::MemAlloc {
                address,
                bound,
                allocated_by,
            } => self.on_mem_alloc(address, bound, allocated_by),
            LogRecord::TopLevel {
                pointer, pointee, ..
            } => self.on_top_level(pointer, pointee),
            _ => Ok(()),
        }
    }

    /// A new allocation takes over `[address, address + bound)`
    ///
    /// # Errors
    ///
    /// Returns `VersionCounterOverflow` when versions run out
    pub fn on_mem_alloc(
        &mut self,
        address: Address,
        bound: u64,
        _allocated_by: Option<ValueId>,
    ) -> CoreResult<()> {
        let version = self.counter.current()?;
        self.space.declare(address, bound, version);
        self.counter.advance()
    }

    /// `pointer` now holds `pointee`
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the pointer maps disagree
    pub fn on_top_level(&mut self, pointer: ValueId, pointee: Address) -> CoreResult<()> {
        self.state.remove(pointer)?;
        if pointee.is_null() {
            return Ok(());
        }

        let version = match self.space.lookup(pointee) {
            Some(version) => version,
            None => {
                self.unknown_versions.entry(pointee).or_insert(pointer);
                Version::UNKNOWN
            }
        };
        let target = VersionedAddress::new(pointee, version);

        let joins = !version.is_unknown() || self.policy == UnknownVersionPolicy::MatchAddress;
        if joins {
            let others: Vec<ValueId> = self.state.pointers_at(target).collect();
            for other in others {
                self.aliases.insert(pointer, other);
            }
        }
        self.state.insert(pointer, target);
        Ok(())
    }

    /// Alias query against the pairs found so far
    #[must_use]
    pub fn alias(&self, a: ValueId, b: ValueId) -> AliasResult {
        self.aliases.alias(a, b)
    }

    /// Pairs found so far
    #[must_use]
    pub fn all_alias_pairs(&self) -> &AliasSet {
        &self.aliases
    }

    /// Current pointer state
    #[must_use]
    pub fn pointer_state(&self) -> &PointerState {
        &self.state
    }

    /// Versions handed out so far
    #[must_use]
    pub fn versions_issued(&self) -> u32 {
        self.counter.issued()
    }

    /// Finish the pass and report version-unknown pointers
    #[must_use]
    pub fn finish(self) -> DynamicAliasAnalysis {
        if !self.unknown_versions.is_empty() {
            tracing::warn!(
                addresses = self.unknown_versions.len(),
                "pointers observed at addresses with no live allocation"
            );
        }
        tracing::info!(
            pairs = self.aliases.len(),
            versions = self.counter.issued(),
            "alias relation built"
        );
        DynamicAliasAnalysis {
            aliases: self.aliases,
            unknown_versions: self
                .unknown_versions
                .into_iter()
                .map(|(address, pointer)| UnknownVersion { address, pointer })
                .collect(),
            versions_issued: self.counter.issued(),
        }
    }
}

/// Completed alias relation, read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicAliasAnalysis {
    aliases: AliasSet,
    unknown_versions: Vec<UnknownVersion>,
    versions_issued: u32,
}

impl DynamicAliasAnalysis {
    /// `MayAlias` iff `(a, b)` was ever observed together
    #[must_use]
    pub fn alias(&self, a: ValueId, b: ValueId) -> AliasResult {
        self.aliases.alias(a, b)
    }

    /// Every observed pair
    #[must_use]
    pub fn all_alias_pairs(&self) -> &AliasSet {
        &self.aliases
    }

    /// Pointers whose address resolved to no allocation, one per address
    #[must_use]
    pub fn unknown_versions(&self) -> &[UnknownVersion] {
        &self.unknown_versions
    }

    /// Serializable summary
    #[must_use]
    pub fn report(&self) -> AliasReport {
        AliasReport {
            pairs: self
                .aliases
                .iter()
                .map(|p| (p.first(), p.second()))
                .collect(),
            unknown_versions: self.unknown_versions.clone(),
            versions_issued: self.versions_issued,
        }
    }
}

/// Alias pass output for printing or JSON export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasReport {
    /// Canonical pairs
    pub pairs: Vec<(ValueId, ValueId)>,
    /// Version-unknown diagnostics
    pub unknown_versions: Vec<UnknownVersion>,
    /// Allocations replayed
    pub versions_issued: u32,
}
