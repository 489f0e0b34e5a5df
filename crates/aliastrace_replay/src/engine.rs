//! Replay engine driving record consumers over a log.

use crate::alias::{AliasRelationBuilder, DynamicAliasAnalysis};
use crate::config::ReplayConfig;
use crate::finder::RecordFinder;
use crate::slice::{SliceOutcome, TraceSlicer};
use aliastrace_core::{CoreError, RecordIndex, ValueId, ValueLookup};
use aliastrace_log::{Direction, LogReader, LogRecord};
use std::io::{Read, Seek};
use std::path::Path;
use thiserror::Error;

/// Replay error
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Log access, decoding or bookkeeping failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The two values never held the same address
    #[error("Values {first} and {second} never point to the same address")]
    StartNotFound {
        /// First value
        first: ValueId,
        /// Second value
        second: ValueId,
    },

    /// A starting record lies past the end of the log
    #[error("Starting record {index} is outside a log of {total} records")]
    StartOutOfRange {
        /// Requested record
        index: RecordIndex,
        /// Records in the log
        total: u64,
    },

    /// A starting record cannot seed a slice
    #[error("Record {index} cannot start a slice: {reason}")]
    InvalidStart {
        /// Requested record
        index: RecordIndex,
        /// Why not
        reason: String,
    },
}

/// Whether a pass keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Feed the next record
    Continue,
    /// End the pass here
    Stop,
}

/// Something fed one record at a time by the engine
pub trait RecordConsumer {
    /// Handle one record
    ///
    /// # Errors
    ///
    /// Any error aborts the pass
    fn consume(&mut self, index: RecordIndex, record: &LogRecord) -> Result<Flow, ReplayError>;
}

impl RecordConsumer for AliasRelationBuilder {
    fn consume(&mut self, _index: RecordIndex, record: &LogRecord) -> Result<Flow, ReplayError> {
        self.on_record(record)?;
        Ok(Flow::Continue)
    }
}

impl RecordConsumer for RecordFinder {
    fn consume(&mut self, index: RecordIndex, record: &LogRecord) -> Result<Flow, ReplayError> {
        Ok(if self.on_record(index, record) {
            Flow::Stop
        } else {
            Flow::Continue
        })
    }
}

/// Slicer plus the early-stop setting of the pass
struct SlicePass<'s, 'p, P: ?Sized> {
    slicer: &'s mut TraceSlicer<'p, P>,
    stop_when_inactive: bool,
}

impl<P: ValueLookup + ?Sized> RecordConsumer for SlicePass<'_, '_, P> {
    fn consume(&mut self, index: RecordIndex, record: &LogRecord) -> Result<Flow, ReplayError> {
        self.slicer.on_record(index, record)?;
        Ok(if self.stop_when_inactive && self.slicer.is_done() {
            Flow::Stop
        } else {
            Flow::Continue
        })
    }
}

/// Summary of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Traversal direction
    pub direction: Direction,
    /// Records handed to the consumer
    pub consumed: u64,
    /// Records in the log
    pub total: u64,
    /// The consumer ended the pass before the log ran out
    pub stopped_early: bool,
}

type ProgressFn = Box<dyn FnMut(u64, u64)>;

/// Replay engine for alias reconstruction and slicing
pub struct ReplayEngine {
    config: ReplayConfig,
    progress: Option<ProgressFn>,
}

impl ReplayEngine {
    /// Create a new replay engine
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ReplayConfig::default(),
            progress: None,
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Called with `(consumed, total)` every `progress_interval` records
    /// and once at the end of each pass
    #[must_use]
    pub fn with_progress<F: FnMut(u64, u64) + 'static>(mut self, progress: F) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Feed every record of `reader` to `consumer` until it stops
    ///
    /// # Errors
    ///
    /// Returns the first read or consumer error; the consumer's partial
    /// state must then be discarded
    pub fn run<R, C>(&mut self, mut reader: LogReader<R>, consumer: &mut C) -> Result<ReplayStats, ReplayError>
    where
        R: Read + Seek,
        C: RecordConsumer + ?Sized,
    {
        let total = reader.total();
        let direction = reader.direction();
        let interval = self.config.progress_interval;
        let mut stopped_early = false;

        while let Some((index, record)) = reader.next_record()? {
            let consumed = reader.consumed();
            let flow = consumer.consume(index, &record)?;

            if interval > 0 && consumed % interval == 0 {
                tracing::debug!(consumed, total, "replay progress");
                if let Some(progress) = self.progress.as_mut() {
                    progress(consumed, total);
                }
            }

            if flow == Flow::Stop {
                stopped_early = consumed < total;
                break;
            }
        }

        let consumed = reader.consumed();
        if let Some(progress) = self.progress.as_mut() {
            progress(consumed, total);
        }
        Ok(ReplayStats {
            direction,
            consumed,
            total,
            stopped_early,
        })
    }

    /// Build the alias relation of the log at `path`
    ///
    /// # Errors
    ///
    /// Returns `MissingLogFile`, `CorruptLog`, `InvariantViolation` or
    /// `VersionCounterOverflow`
    pub fn build_aliases(&mut self, path: impl AsRef<Path>) -> Result<DynamicAliasAnalysis, ReplayError> {
        let reader = LogReader::open(path, Direction::Forward)?;
        self.aliases_from(reader)
    }

    /// Build the alias relation from an already opened forward reader
    ///
    /// # Errors
    ///
    /// Same as [`Self::build_aliases`]
    pub fn aliases_from<R: Read + Seek>(
        &mut self,
        reader: LogReader<R>,
    ) -> Result<DynamicAliasAnalysis, ReplayError> {
        let mut builder = AliasRelationBuilder::new().with_policy(self.config.unknown_version_policy);
        let stats = self.run(reader, &mut builder)?;
        tracing::debug!(records = stats.consumed, "forward pass complete");
        Ok(builder.finish())
    }

    /// Find the latest records at which `first` and `second` held the same
    /// non-null address
    ///
    /// # Errors
    ///
    /// Returns `StartNotFound` if they never did
    pub fn find_records(
        &mut self,
        path: impl AsRef<Path>,
        first: ValueId,
        second: ValueId,
    ) -> Result<(RecordIndex, RecordIndex), ReplayError> {
        let reader = LogReader::open(path, Direction::Forward)?;
        self.find_records_from(reader, first, second)
    }

    /// [`Self::find_records`] over an opened forward reader
    ///
    /// # Errors
    ///
    /// Returns `StartNotFound` if the values never met
    pub fn find_records_from<R: Read + Seek>(
        &mut self,
        reader: LogReader<R>,
        first: ValueId,
        second: ValueId,
    ) -> Result<(RecordIndex, RecordIndex), ReplayError> {
        let mut finder = RecordFinder::new(first, second);
        self.run(reader, &mut finder)?;
        finder
            .found()
            .ok_or(ReplayError::StartNotFound { first, second })
    }

    /// Slice backward from two known records
    ///
    /// # Errors
    ///
    /// Returns `StartOutOfRange` for an index past the log, `InvalidStart`
    /// for a record naming no value, and any read error
    pub fn slice_from_records<P: ValueLookup + ?Sized>(
        &mut self,
        path: impl AsRef<Path>,
        program: &P,
        first: RecordIndex,
        second: RecordIndex,
    ) -> Result<SliceOutcome, ReplayError> {
        let reader = LogReader::open(path, Direction::Backward)?;
        self.slice_records_from(reader, program, first, second)
    }

    /// [`Self::slice_from_records`] over an opened backward reader
    ///
    /// # Errors
    ///
    /// Same as [`Self::slice_from_records`]
    pub fn slice_records_from<R: Read + Seek, P: ValueLookup + ?Sized>(
        &mut self,
        reader: LogReader<R>,
        program: &P,
        first: RecordIndex,
        second: RecordIndex,
    ) -> Result<SliceOutcome, ReplayError> {
        let total = reader.total();
        for index in [first, second] {
            if index.as_u64() >= total {
                return Err(ReplayError::StartOutOfRange { index, total });
            }
        }

        let mut slicer = TraceSlicer::new(program, first, second).with_policy(self.config.merge_policy);
        let mut pass = SlicePass {
            slicer: &mut slicer,
            stop_when_inactive: self.config.stop_when_inactive,
        };
        let stats = self.run(reader, &mut pass)?;
        tracing::debug!(
            records = stats.consumed,
            stopped_early = stats.stopped_early,
            "backward pass complete"
        );

        let outcome = slicer.finish();
        tracing::info!(
            first = outcome.slices[0].len(),
            second = outcome.slices[1].len(),
            merged = outcome.common_ancestor.is_some(),
            "slices built"
        );
        Ok(outcome)
    }

    /// Locate where `first` and `second` met, then slice both backward
    ///
    /// # Errors
    ///
    /// Returns `StartNotFound` if the values never met, plus anything
    /// [`Self::slice_from_records`] returns
    pub fn slice_between<P: ValueLookup + ?Sized>(
        &mut self,
        path: impl AsRef<Path>,
        program: &P,
        first: ValueId,
        second: ValueId,
    ) -> Result<SliceOutcome, ReplayError> {
        let path = path.as_ref();
        let (i, j) = self.find_records(path, first, second)?;
        tracing::info!(first = %i, second = %j, "slicing from starting records");
        self.slice_from_records(path, program, i, j)
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}
