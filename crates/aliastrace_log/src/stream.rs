//! Record stream over a log file, forward or backward.

use crate::cursor::{Cursor, Direction};
use crate::encoding::{RECORD_SIZE, decode_record};
use crate::record::LogRecord;
use aliastrace_core::{CoreError, CoreResult, RecordIndex};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Open a log file for reading.
///
/// # Errors
///
/// Returns `MissingLogFile` if the path cannot be opened or is not a
/// regular file
pub fn open_log(path: &Path) -> CoreResult<(File, u64)> {
    let missing = |err: io::Error| CoreError::MissingLogFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };
    let file = File::open(path).map_err(missing)?;
    let metadata = file.metadata().map_err(missing)?;
    if !metadata.is_file() {
        return Err(CoreError::MissingLogFile {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    Ok((file, metadata.len()))
}

/// Slots fetched from the source per read
const BLOCK_SLOTS: u64 = 256;

/// Reads decoded records in either direction.
///
/// Slots are fetched in blocks that extend ahead of the cursor in the
/// traversal direction, so each byte of the source is read once per pass.
/// The stream is finite and not rewindable; open a new reader to start over.
/// After the first error it yields nothing further.
pub struct LogReader<R> {
    source: R,
    cursor: Cursor,
    /// Slots currently held, starting at byte `block_start`
    block: Vec<u8>,
    block_start: u64,
    failed: bool,
}

impl LogReader<File> {
    /// Open a log file in the given direction
    ///
    /// # Errors
    ///
    /// Returns `MissingLogFile` if the file cannot be opened and
    /// `CorruptLog` if its size is not a whole number of records
    pub fn open(path: impl AsRef<Path>, direction: Direction) -> CoreResult<Self> {
        let path = path.as_ref();
        let (file, len) = open_log(path)?;
        let reader = Self::with_len(file, len, direction)?;
        tracing::debug!(
            path = %path.display(),
            records = reader.total(),
            ?direction,
            "opened log"
        );
        Ok(reader)
    }
}

impl<R: Read + Seek> LogReader<R> {
    /// Wrap any seekable byte source
    ///
    /// # Errors
    ///
    /// Returns `CorruptLog` if the source size is not a whole number of
    /// records or cannot be determined
    pub fn new(mut source: R, direction: Direction) -> CoreResult<Self> {
        let len = source
            .seek(SeekFrom::End(0))
            .map_err(|e| CoreError::corrupt(0, format!("cannot size log: {}", e)))?;
        Self::with_len(source, len, direction)
    }

    fn with_len(source: R, len: u64, direction: Direction) -> CoreResult<Self> {
        let slot = RECORD_SIZE as u64;
        if len % slot != 0 {
            return Err(CoreError::corrupt(
                len - len % slot,
                format!("log size {} is not a multiple of {}", len, slot),
            ));
        }
        Ok(Self {
            source,
            cursor: Cursor::new(direction, len / slot),
            block: Vec::new(),
            block_start: 0,
            failed: false,
        })
    }

    /// Total records in the log
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cursor.total()
    }

    /// Records not yet read
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.cursor.remaining()
    }

    /// Records read so far
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.cursor.consumed()
    }

    /// Traversal direction
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.cursor.direction()
    }

    /// Read the next record in traversal order
    ///
    /// # Errors
    ///
    /// Returns `CorruptLog` on a short read or unknown tag
    pub fn next_record(&mut self) -> CoreResult<Option<(RecordIndex, LogRecord)>> {
        if self.failed {
            return Ok(None);
        }
        let Some(index) = self.cursor.next_index() else {
            return Ok(None);
        };

        match self.read_slot(index) {
            Ok(record) => {
                self.cursor.advance();
                Ok(Some((index, record)))
            }
            Err(err) => {
                self.failed = true;
                Err(err)
            }
        }
    }

    fn read_slot(&mut self, index: RecordIndex) -> CoreResult<LogRecord> {
        let offset = Cursor::byte_offset(index);
        let held = self.block_start..self.block_start + self.block.len() as u64;
        if !held.contains(&offset) {
            self.fill_block(index)?;
        }
        let at = (offset - self.block_start) as usize;
        decode_record(&self.block[at..at + RECORD_SIZE], offset)
    }

    /// Load the block of slots containing `index`, extending toward the
    /// records still to be read
    fn fill_block(&mut self, index: RecordIndex) -> CoreResult<()> {
        let total = self.cursor.total();
        let (first, end) = match self.cursor.direction() {
            Direction::Forward => (index.as_u64(), (index.as_u64() + BLOCK_SLOTS).min(total)),
            Direction::Backward => (
                (index.as_u64() + 1).saturating_sub(BLOCK_SLOTS),
                index.as_u64() + 1,
            ),
        };
        let start = Cursor::byte_offset(RecordIndex::from_raw(first));
        let len = ((end - first) as usize) * RECORD_SIZE;

        self.block.clear();
        self.block.resize(len, 0);
        self.block_start = start;
        let read = self
            .source
            .seek(SeekFrom::Start(start))
            .and_then(|_| self.source.read_exact(&mut self.block));
        if let Err(e) = read {
            self.block.clear();
            return Err(if e.kind() == io::ErrorKind::UnexpectedEof {
                CoreError::corrupt(start, "short read")
            } else {
                CoreError::corrupt(start, e.to_string())
            });
        }
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for LogReader<R> {
    type Item = CoreResult<(RecordIndex, LogRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
