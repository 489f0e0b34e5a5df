//! Backward trace slicing.
//!
//! Two independent cursors walk the log backward from their starting records.
//! Each one keeps a [`Frontier`] describing the event its latest slice entry
//! depends on, and extends its slice whenever an earlier record satisfies it.
//! When both sides extend to the same record in one step, their histories
//! have met.

use crate::config::MergePolicy;
use crate::engine::ReplayError;
use aliastrace_core::{Address, Callee, RecordIndex, ValueId, ValueKind, ValueLookup};
use aliastrace_log::{LogRecord, RecordKind};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// One record in a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceEntry {
    /// Position in the log
    pub record: RecordIndex,
    /// Kind of the record
    pub kind: RecordKind,
    /// Program value the record is about
    pub value: ValueId,
}

/// What the latest slice entry of a side depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frontier {
    /// The `TopLevel` that gave one of `values` its pointer, optionally
    /// requiring it to hold `pointee`
    Operand {
        /// Acceptable producing values
        values: Vec<ValueId>,
        /// Required pointee, `None` for address computations
        pointee: Option<Address>,
    },
    /// The latest `Store` to the location a load read from
    Loaded {
        /// Location that was loaded
        address: Address,
        /// Pointer that was loaded
        pointee: Address,
    },
    /// The call site binding parameter `index` of `function`
    Argument {
        /// Callee whose parameter is being traced
        function: ValueId,
        /// Parameter position
        index: u32,
        /// Pointer held by the parameter
        pointee: Address,
    },
    /// The return instruction that produced the result of `call`
    Returned {
        /// Call whose result is being traced
        call: ValueId,
        /// Its callee
        callee: Callee,
        /// Returned pointer
        pointee: Address,
    },
}

/// Outcome of testing one record against a frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependence {
    /// The record belongs in the slice
    pub is_predecessor: bool,
    /// The side keeps looking
    pub remains_active: bool,
}

impl Dependence {
    /// Not related to the frontier; keep going
    pub const UNRELATED: Self = Self {
        is_predecessor: false,
        remains_active: true,
    };

    /// The frontier's dependency
    pub const PREDECESSOR: Self = Self {
        is_predecessor: true,
        remains_active: true,
    };

    /// No predecessor can be established past this record
    pub const TERMINATED: Self = Self {
        is_predecessor: false,
        remains_active: false,
    };
}

/// Test whether `record` is what `previous` depends on
///
/// A call into a bodyless function ends the side only while it seeks an
/// argument binding or a return; operand and load searches pass over it.
pub fn depends_on<P: ValueLookup + ?Sized>(
    program: &P,
    record: &LogRecord,
    previous: &Frontier,
) -> Dependence {
    match previous {
        Frontier::Operand { values, pointee } => match *record {
            LogRecord::TopLevel {
                pointer,
                pointee: held,
                ..
            } if values.contains(&pointer) && pointee.is_none_or(|p| p == held) => {
                Dependence::PREDECESSOR
            }
            _ => Dependence::UNRELATED,
        },

        Frontier::Loaded { address, pointee } => match *record {
            LogRecord::Store {
                pointer_address,
                pointee: stored,
                ..
            } if pointer_address == *address => {
                if stored == *pointee {
                    Dependence::PREDECESSOR
                } else {
                    // Overwritten by something that was not logged.
                    Dependence::TERMINATED
                }
            }
            LogRecord::MemAlloc {
                address: start,
                bound,
                ..
            } if start <= *address && address.as_u64() < start.end(bound) => {
                Dependence::TERMINATED
            }
            _ => Dependence::UNRELATED,
        },

        Frontier::Argument { function, .. } => match *record {
            LogRecord::Call { instruction } => {
                if program.calls_external(instruction) {
                    return Dependence::TERMINATED;
                }
                match program.kind(instruction) {
                    Some(ValueKind::Call {
                        callee: Callee::Direct(f),
                        ..
                    }) if f == function => Dependence::PREDECESSOR,
                    Some(ValueKind::Call {
                        callee: Callee::Indirect,
                        ..
                    }) => Dependence::PREDECESSOR,
                    _ => Dependence::TERMINATED,
                }
            }
            _ => Dependence::UNRELATED,
        },

        Frontier::Returned { call, callee, .. } => match *record {
            LogRecord::Return { instruction } => match callee {
                Callee::Direct(f) if program.function_of(instruction) == Some(*f) => {
                    Dependence::PREDECESSOR
                }
                Callee::Direct(_) => Dependence::TERMINATED,
                Callee::Indirect => Dependence::PREDECESSOR,
            },
            LogRecord::Call { instruction }
                if instruction == *call || program.calls_external(instruction) =>
            {
                Dependence::TERMINATED
            }
            _ => Dependence::UNRELATED,
        },
    }
}

/// Frontier of a value observed holding `pointee`
fn value_frontier<P: ValueLookup + ?Sized>(
    program: &P,
    value: ValueId,
    pointee: Address,
    loaded_from: Address,
) -> Option<Frontier> {
    match program.kind(value)? {
        ValueKind::Load { .. } if !loaded_from.is_null() => Some(Frontier::Loaded {
            address: loaded_from,
            pointee,
        }),
        ValueKind::Derived { source } => Some(Frontier::Operand {
            values: vec![*source],
            pointee: None,
        }),
        ValueKind::Join { incoming } => Some(Frontier::Operand {
            values: incoming.clone(),
            pointee: Some(pointee),
        }),
        ValueKind::Argument { function, index } => Some(Frontier::Argument {
            function: *function,
            index: *index,
            pointee,
        }),
        ValueKind::Call { callee, .. } if !program.calls_external(value) => {
            Some(Frontier::Returned {
                call: value,
                callee: *callee,
                pointee,
            })
        }
        // Allocation sites, globals, external results: origins.
        _ => None,
    }
}

/// Frontier after `record` joined a slice whose previous frontier was
/// `previous` (`None` for a starting record)
pub fn next_frontier<P: ValueLookup + ?Sized>(
    program: &P,
    record: &LogRecord,
    previous: Option<&Frontier>,
) -> Option<Frontier> {
    match (*record, previous) {
        (
            LogRecord::TopLevel {
                pointer,
                pointee,
                loaded_from,
            },
            _,
        ) => value_frontier(program, pointer, pointee, loaded_from),

        (
            LogRecord::Store {
                instruction,
                pointee,
                ..
            },
            _,
        ) => match program.kind(instruction)? {
            ValueKind::Store { value, .. } => Some(Frontier::Operand {
                values: vec![*value],
                pointee: Some(pointee),
            }),
            _ => None,
        },

        (LogRecord::Call { instruction }, Some(Frontier::Argument { index, pointee, .. })) => {
            match program.kind(instruction)? {
                ValueKind::Call { arguments, .. } => {
                    let actual = (*arguments.get(*index as usize)?)?;
                    Some(Frontier::Operand {
                        values: vec![actual],
                        pointee: Some(*pointee),
                    })
                }
                _ => None,
            }
        }

        (LogRecord::Return { instruction }, Some(Frontier::Returned { pointee, .. })) => {
            match program.kind(instruction)? {
                ValueKind::Return { value: Some(v) } => Some(Frontier::Operand {
                    values: vec![*v],
                    pointee: Some(*pointee),
                }),
                _ => None,
            }
        }

        _ => None,
    }
}

/// Lifecycle of one slicing side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceState {
    /// Starting record not reached yet
    Pending,
    /// Extending its slice
    Active,
    /// Finished; never reactivates
    Inactive,
}

/// One side of a slicing run
#[derive(Debug, Clone)]
pub struct PointerTrace {
    starting_record: RecordIndex,
    starting_function: Option<ValueId>,
    state: TraceState,
    previous: Option<Frontier>,
    slice: Vec<SliceEntry>,
}

impl PointerTrace {
    /// A side that starts at `starting_record`
    #[must_use]
    pub fn new(starting_record: RecordIndex) -> Self {
        Self {
            starting_record,
            starting_function: None,
            state: TraceState::Pending,
            previous: None,
            slice: Vec::new(),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> TraceState {
        self.state
    }

    /// Record the side starts from
    #[must_use]
    pub fn starting_record(&self) -> RecordIndex {
        self.starting_record
    }

    /// Function containing the starting value, once known
    #[must_use]
    pub fn starting_function(&self) -> Option<ValueId> {
        self.starting_function
    }

    /// What the side is currently looking for
    #[must_use]
    pub fn frontier(&self) -> Option<&Frontier> {
        self.previous.as_ref()
    }

    /// Entries from the starting record backward
    #[must_use]
    pub fn slice(&self) -> &[SliceEntry] {
        &self.slice
    }

    fn activate<P: ValueLookup + ?Sized>(
        &mut self,
        program: &P,
        index: RecordIndex,
        record: &LogRecord,
    ) -> Result<(), ReplayError> {
        let value = record.value().ok_or_else(|| ReplayError::InvalidStart {
            index,
            reason: format!("{} names no program value", record.kind()),
        })?;
        self.starting_function = program.function_of(value);
        self.slice.push(SliceEntry {
            record: index,
            kind: record.kind(),
            value,
        });
        self.previous = next_frontier(program, record, None);
        self.state = if self.previous.is_some() {
            TraceState::Active
        } else {
            TraceState::Inactive
        };
        Ok(())
    }

    fn extend<P: ValueLookup + ?Sized>(&mut self, program: &P, index: RecordIndex, record: &LogRecord) {
        if let Some(value) = record.value() {
            self.slice.push(SliceEntry {
                record: index,
                kind: record.kind(),
                value,
            });
        }
        self.previous = next_frontier(program, record, self.previous.as_ref());
        if self.previous.is_none() {
            self.state = TraceState::Inactive;
        }
    }

    fn deactivate(&mut self) {
        self.state = TraceState::Inactive;
        self.previous = None;
    }

    /// Test one record; returns whether the slice grew
    fn step<P: ValueLookup + ?Sized>(
        &mut self,
        program: &P,
        index: RecordIndex,
        record: &LogRecord,
    ) -> Result<bool, ReplayError> {
        match self.state {
            TraceState::Pending if index == self.starting_record => {
                self.activate(program, index, record)?;
                Ok(true)
            }
            TraceState::Active => {
                let Some(previous) = self.previous.as_ref() else {
                    self.deactivate();
                    return Ok(false);
                };
                let dependence = depends_on(program, record, previous);
                if dependence.is_predecessor {
                    self.extend(program, index, record);
                    Ok(true)
                } else {
                    if !dependence.remains_active {
                        self.deactivate();
                    }
                    Ok(false)
                }
            }
            _ => Ok(false),
        }
    }
}

/// Backward consumer growing two slices toward each other
pub struct TraceSlicer<'p, P: ?Sized> {
    program: &'p P,
    traces: [PointerTrace; 2],
    policy: MergePolicy,
    merged_at: Option<RecordIndex>,
}

impl<'p, P: ValueLookup + ?Sized> TraceSlicer<'p, P> {
    /// Slice from two starting records
    #[must_use]
    pub fn new(program: &'p P, first: RecordIndex, second: RecordIndex) -> Self {
        Self {
            program,
            traces: [PointerTrace::new(first), PointerTrace::new(second)],
            policy: MergePolicy::default(),
            merged_at: None,
        }
    }

    /// Set the merge policy
    #[must_use]
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Feed the next record in backward order
    ///
    /// # Errors
    ///
    /// Returns `InvalidStart` if a starting record names no value
    pub fn on_record(&mut self, index: RecordIndex, record: &LogRecord) -> Result<(), ReplayError> {
        let program = self.program;
        let mut extended = [false; 2];
        for (side, trace) in self.traces.iter_mut().enumerate() {
            extended[side] = trace.step(program, index, record)?;
        }

        if extended[0] && extended[1] {
            if self.merged_at.is_none() {
                tracing::debug!(record = %index, kind = %record.kind(), "slices merged");
                self.merged_at = Some(index);
            }
            if self.policy == MergePolicy::Stop {
                for trace in &mut self.traces {
                    trace.deactivate();
                }
            }
        }
        Ok(())
    }

    /// Both sides have started and finished
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.traces.iter().all(|t| t.state == TraceState::Inactive)
    }

    /// One side
    #[must_use]
    pub fn trace(&self, side: usize) -> &PointerTrace {
        &self.traces[side]
    }

    /// Most recent record both slices reached first, if any
    #[must_use]
    pub fn merged_at(&self) -> Option<RecordIndex> {
        self.merged_at
    }

    /// The last entry of both slices, if those entries are the same record
    #[must_use]
    pub fn latest_common_ancestor(&self) -> Option<SliceEntry> {
        let a = self.traces[0].slice.last()?;
        let b = self.traces[1].slice.last()?;
        (a == b).then_some(*a)
    }

    /// End of the log reached; close both sides
    #[must_use]
    pub fn finish(mut self) -> SliceOutcome {
        for trace in &mut self.traces {
            if trace.state != TraceState::Inactive {
                tracing::debug!(
                    start = %trace.starting_record,
                    state = ?trace.state,
                    frontier = ?trace.frontier(),
                    "side closed at start of log"
                );
                trace.deactivate();
            }
        }
        let common_ancestor = self.latest_common_ancestor();
        let [first, second] = self.traces;
        SliceOutcome {
            starting_functions: [first.starting_function, second.starting_function],
            slices: [first.slice, second.slice],
            common_ancestor,
            merged_at: self.merged_at,
        }
    }
}

/// Result of slicing two values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceOutcome {
    /// Each side's entries, starting record first, in backward order
    pub slices: [Vec<SliceEntry>; 2],
    /// Function containing each starting value
    pub starting_functions: [Option<ValueId>; 2],
    /// Shared last entry, if the histories met
    pub common_ancestor: Option<SliceEntry>,
    /// First record (in backward order) both sides extended to
    pub merged_at: Option<RecordIndex>,
}

impl SliceOutcome {
    /// Both slices merged in ascending record order, tagged with their side
    #[must_use]
    pub fn interleaved(&self) -> Vec<(usize, SliceEntry)> {
        let [first, second] = &self.slices;
        let mut out = Vec::with_capacity(first.len() + second.len());
        let (mut i, mut j) = (first.len(), second.len());
        while i > 0 || j > 0 {
            let take_first = match (i.checked_sub(1), j.checked_sub(1)) {
                (Some(a), Some(b)) => first[a].record <= second[b].record,
                (Some(_), None) => true,
                _ => false,
            };
            if take_first {
                i -= 1;
                out.push((0, first[i]));
            } else {
                j -= 1;
                out.push((1, second[j]));
            }
        }
        out
    }

    /// Write the interleaved slices, one entry per line
    ///
    /// # Errors
    ///
    /// Returns the I/O error from `out`
    pub fn print<W: Write, P: ValueLookup + ?Sized>(&self, out: &mut W, program: &P) -> io::Result<()> {
        for side in 0..2 {
            let function = self.starting_functions[side]
                .map(|f| program.display_name(f))
                .unwrap_or_else(|| "?".to_string());
            match self.slices[side].first() {
                Some(start) => writeln!(
                    out,
                    "side {}: starts at {} {} in {}",
                    side,
                    start.record,
                    program.display_name(start.value),
                    function
                )?,
                None => writeln!(out, "side {}: empty", side)?,
            }
        }
        for (side, entry) in self.interleaved() {
            let function = program
                .function_of(entry.value)
                .map(|f| program.display_name(f))
                .unwrap_or_default();
            let kind = program.kind(entry.value).map_or("?", |k| k.kind_name());
            writeln!(
                out,
                "{:>8} [{}] {:<10} {} ({}) {}",
                entry.record.to_string(),
                side,
                entry.kind.to_string(),
                program.display_name(entry.value),
                kind,
                function
            )?;
        }
        match &self.common_ancestor {
            Some(entry) => writeln!(
                out,
                "common ancestor: {} {} {}",
                entry.record,
                entry.kind,
                program.display_name(entry.value)
            ),
            None => writeln!(out, "common ancestor: none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliastrace_core::{ProgramInfo, ValueDescriptor};

    fn v(raw: u32) -> ValueId {
        ValueId::new(raw)
    }

    fn a(raw: u64) -> Address {
        Address::new(raw)
    }

    fn idx(raw: u64) -> RecordIndex {
        RecordIndex::from_raw(raw)
    }

    fn top(pointer: u32, pointee: u64, loaded_from: u64) -> LogRecord {
        LogRecord::TopLevel {
            pointer: v(pointer),
            pointee: a(pointee),
            loaded_from: a(loaded_from),
        }
    }

    fn desc(id: u32, name: &str, kind: ValueKind) -> ValueDescriptor {
        ValueDescriptor::new(v(id), name, kind).in_function(v(0))
    }

    /// main (v0): slot = alloca (v1), obj = alloca (v2), store obj -> slot (v3),
    /// loaded = load slot (v4), other = alloca (v5); malloc (v6) is external.
    fn store_load_program() -> ProgramInfo {
        let mut info = ProgramInfo::new();
        for d in [
            ValueDescriptor::new(v(0), "main", ValueKind::Function { external: false }),
            desc(1, "slot", ValueKind::Alloca),
            desc(2, "obj", ValueKind::Alloca),
            desc(3, "store", ValueKind::Store { pointer: v(1), value: v(2) }),
            desc(4, "loaded", ValueKind::Load { pointer: v(1) }),
            desc(5, "other", ValueKind::Alloca),
            ValueDescriptor::new(v(6), "malloc", ValueKind::Function { external: true }),
        ] {
            info.insert(d).unwrap();
        }
        info
    }

    fn store_load_trace() -> Vec<LogRecord> {
        vec![
            LogRecord::MemAlloc { address: a(0x100), bound: 8, allocated_by: Some(v(1)) },
            top(1, 0x100, 0),
            LogRecord::MemAlloc { address: a(0x200), bound: 8, allocated_by: Some(v(2)) },
            top(2, 0x200, 0),
            LogRecord::Store { instruction: v(3), pointer_address: a(0x100), pointee: a(0x200) },
            LogRecord::BasicBlock { block: v(9) },
            top(4, 0x200, 0x100),
            LogRecord::MemAlloc { address: a(0x300), bound: 8, allocated_by: Some(v(5)) },
            top(5, 0x300, 0),
        ]
    }

    fn run<P: ValueLookup + ?Sized>(slicer: &mut TraceSlicer<'_, P>, records: &[LogRecord]) {
        for (i, record) in records.iter().enumerate().rev() {
            slicer.on_record(idx(i as u64), record).unwrap();
        }
    }

    #[test]
    fn test_store_load_merge() {
        let program = store_load_program();
        let records = store_load_trace();
        let mut slicer = TraceSlicer::new(&program, idx(6), idx(3));
        run(&mut slicer, &records);
        let outcome = slicer.finish();

        let ancestor = outcome.common_ancestor.unwrap();
        assert_eq!(ancestor.record, idx(3));
        assert_eq!(ancestor.value, v(2));
        assert!(ancestor.record < idx(4));
        assert_eq!(outcome.merged_at, Some(idx(3)));

        let first: Vec<u64> = outcome.slices[0].iter().map(|e| e.record.as_u64()).collect();
        assert_eq!(first, vec![6, 4, 3]);
        assert_eq!(outcome.slices[1].len(), 1);
        assert_eq!(outcome.starting_functions, [Some(v(0)), Some(v(0))]);
    }

    #[test]
    fn test_unrelated_values_terminate() {
        let program = store_load_program();
        let records = store_load_trace();
        let mut slicer = TraceSlicer::new(&program, idx(8), idx(3));
        run(&mut slicer, &records);
        assert!(slicer.is_done());
        assert_eq!(slicer.trace(0).state(), TraceState::Inactive);
        assert_eq!(slicer.trace(1).state(), TraceState::Inactive);

        let outcome = slicer.finish();
        assert_eq!(outcome.common_ancestor, None);
        assert_eq!(outcome.merged_at, None);
    }

    #[test]
    fn test_pending_side_keeps_stream_alive() {
        let program = store_load_program();
        let records = store_load_trace();
        let mut slicer = TraceSlicer::new(&program, idx(8), idx(6));
        // Side 0 starts (and ends: alloca origin) before side 1 is reached.
        slicer.on_record(idx(8), &records[8]).unwrap();
        assert_eq!(slicer.trace(0).state(), TraceState::Inactive);
        assert_eq!(slicer.trace(1).state(), TraceState::Pending);
        assert!(!slicer.is_done());
    }

    #[test]
    fn test_store_overwritten_without_log_terminates() {
        let program = store_load_program();
        let mut records = store_load_trace();
        records[4] = LogRecord::Store {
            instruction: v(3),
            pointer_address: a(0x100),
            pointee: a(0x999),
        };
        let mut slicer = TraceSlicer::new(&program, idx(6), idx(3));
        run(&mut slicer, &records);
        assert_eq!(slicer.trace(0).slice().len(), 1);
        assert_eq!(slicer.finish().common_ancestor, None);
    }

    #[test]
    fn test_merge_policy_continue() {
        let program = store_load_program();
        let records = store_load_trace();
        let mut slicer =
            TraceSlicer::new(&program, idx(6), idx(3)).with_policy(MergePolicy::Continue);
        run(&mut slicer, &records);
        let outcome = slicer.finish();
        assert_eq!(outcome.merged_at, Some(idx(3)));
        assert_eq!(outcome.common_ancestor.map(|e| e.record), Some(idx(3)));
    }

    /// main (v0) calls foo (v10) with obj (v1); foo returns a field address
    /// derived from its parameter; the call result is v5.
    fn call_program(callee_external: bool) -> ProgramInfo {
        let mut info = ProgramInfo::new();
        for d in [
            ValueDescriptor::new(v(0), "main", ValueKind::Function { external: false }),
            desc(1, "obj", ValueKind::Alloca),
            desc(
                5,
                "result",
                ValueKind::Call { callee: Callee::Direct(v(10)), arguments: vec![Some(v(1))] },
            ),
            ValueDescriptor::new(v(10), "foo", ValueKind::Function { external: callee_external }),
            ValueDescriptor::new(v(11), "param", ValueKind::Argument { function: v(10), index: 0 })
                .in_function(v(10)),
            ValueDescriptor::new(v(12), "field", ValueKind::Derived { source: v(11) })
                .in_function(v(10)),
            ValueDescriptor::new(v(13), "ret", ValueKind::Return { value: Some(v(12)) })
                .in_function(v(10)),
        ] {
            info.insert(d).unwrap();
        }
        info
    }

    fn call_trace() -> Vec<LogRecord> {
        vec![
            LogRecord::Enter { function: v(0) },
            LogRecord::MemAlloc { address: a(0x100), bound: 16, allocated_by: Some(v(1)) },
            top(1, 0x100, 0),
            LogRecord::Call { instruction: v(5) },
            LogRecord::Enter { function: v(10) },
            top(11, 0x100, 0),
            top(12, 0x108, 0),
            LogRecord::Return { instruction: v(13) },
            top(5, 0x108, 0),
        ]
    }

    #[test]
    fn test_slice_through_call_and_return() {
        let program = call_program(false);
        let records = call_trace();
        let mut slicer = TraceSlicer::new(&program, idx(8), idx(2));
        run(&mut slicer, &records);
        let outcome = slicer.finish();

        let kinds: Vec<RecordKind> = outcome.slices[0].iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::TopLevel,
                RecordKind::Return,
                RecordKind::TopLevel,
                RecordKind::TopLevel,
                RecordKind::Call,
                RecordKind::TopLevel,
            ]
        );
        assert_eq!(outcome.common_ancestor.map(|e| e.value), Some(v(1)));
    }

    #[test]
    fn test_external_call_boundary_terminates() {
        let mut program = call_program(false);
        // Route the parameter through a call into bodyless code.
        program
            .insert(ValueDescriptor::new(v(20), "qsort", ValueKind::Function { external: true }))
            .unwrap();
        program
            .insert(desc(
                21,
                "sort",
                ValueKind::Call { callee: Callee::Direct(v(20)), arguments: vec![] },
            ))
            .unwrap();
        let mut records = call_trace();
        records[3] = LogRecord::Call { instruction: v(21) };

        let mut slicer = TraceSlicer::new(&program, idx(5), idx(2));
        run(&mut slicer, &records);
        assert_eq!(slicer.trace(0).slice().len(), 1);
        assert_eq!(slicer.finish().common_ancestor, None);
    }

    #[test]
    fn test_external_call_result_is_origin() {
        let program = call_program(true);
        let frontier = next_frontier(&program, &top(5, 0x108, 0), None);
        assert_eq!(frontier, None);
    }

    /// `call_program` plus an indirect call (v6) passing obj, and a direct
    /// call (v7) into bar (v30), a function with a body other than foo.
    fn indirect_program() -> ProgramInfo {
        let mut program = call_program(false);
        for d in [
            desc(
                6,
                "via_ptr",
                ValueKind::Call { callee: Callee::Indirect, arguments: vec![Some(v(1))] },
            ),
            desc(
                7,
                "to_bar",
                ValueKind::Call { callee: Callee::Direct(v(30)), arguments: vec![Some(v(1))] },
            ),
            ValueDescriptor::new(v(30), "bar", ValueKind::Function { external: false }),
            ValueDescriptor::new(v(31), "bar_ret", ValueKind::Return { value: None })
                .in_function(v(30)),
        ] {
            program.insert(d).unwrap();
        }
        program
    }

    #[test]
    fn test_indirect_call_binds_argument() {
        let program = indirect_program();
        let frontier = Frontier::Argument { function: v(10), index: 0, pointee: a(0x100) };
        let call = LogRecord::Call { instruction: v(6) };
        assert_eq!(depends_on(&program, &call, &frontier), Dependence::PREDECESSOR);
        assert_eq!(
            next_frontier(&program, &call, Some(&frontier)),
            Some(Frontier::Operand { values: vec![v(1)], pointee: Some(a(0x100)) })
        );
    }

    #[test]
    fn test_direct_call_to_other_function_ends_argument_search() {
        let program = indirect_program();
        let frontier = Frontier::Argument { function: v(10), index: 0, pointee: a(0x100) };
        let call = LogRecord::Call { instruction: v(7) };
        assert_eq!(depends_on(&program, &call, &frontier), Dependence::TERMINATED);
        // Records other than calls are skipped.
        assert_eq!(
            depends_on(&program, &top(1, 0x100, 0), &frontier),
            Dependence::UNRELATED
        );
    }

    #[test]
    fn test_indirect_call_accepts_any_return() {
        let program = indirect_program();
        let frontier =
            Frontier::Returned { call: v(6), callee: Callee::Indirect, pointee: a(0x108) };
        for ret in [v(13), v(31)] {
            let record = LogRecord::Return { instruction: ret };
            assert_eq!(depends_on(&program, &record, &frontier), Dependence::PREDECESSOR);
        }
        assert_eq!(
            next_frontier(&program, &LogRecord::Return { instruction: v(13) }, Some(&frontier)),
            Some(Frontier::Operand { values: vec![v(12)], pointee: Some(a(0x108)) })
        );
        // Reaching the call itself means the callee never returned a pointer.
        let own_call = LogRecord::Call { instruction: v(6) };
        assert_eq!(depends_on(&program, &own_call, &frontier), Dependence::TERMINATED);
    }

    #[test]
    fn test_direct_return_from_other_function_terminates() {
        let program = indirect_program();
        let frontier =
            Frontier::Returned { call: v(5), callee: Callee::Direct(v(10)), pointee: a(0x108) };
        let foreign = LogRecord::Return { instruction: v(31) };
        assert_eq!(depends_on(&program, &foreign, &frontier), Dependence::TERMINATED);
    }

    #[test]
    fn test_join_requires_matching_pointee() {
        let mut program = store_load_program();
        program
            .insert(desc(7, "phi", ValueKind::Join { incoming: vec![v(2), v(5)] }))
            .unwrap();
        let frontier = next_frontier(&program, &top(7, 0x300, 0), None).unwrap();
        assert_eq!(depends_on(&program, &top(2, 0x200, 0), &frontier), Dependence::UNRELATED);
        assert_eq!(depends_on(&program, &top(5, 0x300, 0), &frontier), Dependence::PREDECESSOR);
    }

    #[test]
    fn test_reallocation_ends_load_search() {
        let program = store_load_program();
        let frontier = Frontier::Loaded { address: a(0x104), pointee: a(0x200) };
        let realloc = LogRecord::MemAlloc { address: a(0x100), bound: 8, allocated_by: None };
        assert_eq!(depends_on(&program, &realloc, &frontier), Dependence::TERMINATED);
    }

    #[test]
    fn test_invalid_start_record() {
        let program = store_load_program();
        let mut slicer = TraceSlicer::new(&program, idx(0), idx(1));
        let record = LogRecord::MemAlloc { address: a(0x10), bound: 8, allocated_by: None };
        let result = slicer.on_record(idx(0), &record);
        assert!(matches!(result, Err(ReplayError::InvalidStart { .. })));
    }

    #[test]
    fn test_interleaved_ascending() {
        let entry = |r: u64| SliceEntry { record: idx(r), kind: RecordKind::TopLevel, value: v(1) };
        let outcome = SliceOutcome {
            slices: [vec![entry(9), entry(4), entry(1)], vec![entry(7), entry(4)]],
            starting_functions: [None, None],
            common_ancestor: None,
            merged_at: None,
        };
        let order: Vec<(usize, u64)> = outcome
            .interleaved()
            .into_iter()
            .map(|(s, e)| (s, e.record.as_u64()))
            .collect();
        assert_eq!(order, vec![(0, 1), (0, 4), (1, 4), (1, 7), (0, 9)]);
    }

    #[test]
    fn test_print_names_values() {
        let program = store_load_program();
        let records = store_load_trace();
        let mut slicer = TraceSlicer::new(&program, idx(6), idx(3));
        run(&mut slicer, &records);
        let outcome = slicer.finish();

        let mut out = Vec::new();
        outcome.print(&mut out, &program).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("side 0: starts at #6 loaded in main"));
        assert!(text.contains("Store"));
        assert!(text.contains("store (store) main"));
        assert!(text.contains("common ancestor: #3 TopLevel obj"));
    }
}
