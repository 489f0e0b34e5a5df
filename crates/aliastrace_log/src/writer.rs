//! Log writer.
//!
//! The production writer lives in the instrumentation runtime; this one emits
//! the same byte stream and is used for fixtures and tooling.

use crate::encoding::encode_record;
use crate::record::LogRecord;
use aliastrace_core::{Address, ValueId};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Appends encoded records to a byte sink
pub struct LogWriter<W> {
    writer: W,
    written: u64,
}

impl LogWriter<BufWriter<File>> {
    /// Create (or truncate) a log file
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> LogWriter<W> {
    /// Create a new writer
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        self.writer.write_all(&encode_record(record))?;
        self.written += 1;
        Ok(())
    }

    /// Append a `MemAlloc` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn mem_alloc(&mut self, address: u64, bound: u64, allocated_by: Option<u32>) -> io::Result<()> {
        self.write(&LogRecord::MemAlloc {
            address: Address::new(address),
            bound,
            allocated_by: allocated_by.map(ValueId::new),
        })
    }

    /// Append a `TopLevel` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn top_level(&mut self, pointer: u32, pointee: u64, loaded_from: u64) -> io::Result<()> {
        self.write(&LogRecord::TopLevel {
            pointer: ValueId::new(pointer),
            pointee: Address::new(pointee),
            loaded_from: Address::new(loaded_from),
        })
    }

    /// Append a `Store` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn store(&mut self, instruction: u32, pointer_address: u64, pointee: u64) -> io::Result<()> {
        self.write(&LogRecord::Store {
            instruction: ValueId::new(instruction),
            pointer_address: Address::new(pointer_address),
            pointee: Address::new(pointee),
        })
    }

    /// Append a `Call` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn call(&mut self, instruction: u32) -> io::Result<()> {
        self.write(&LogRecord::Call {
            instruction: ValueId::new(instruction),
        })
    }

    /// Append a `Return` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn ret(&mut self, instruction: u32) -> io::Result<()> {
        self.write(&LogRecord::Return {
            instruction: ValueId::new(instruction),
        })
    }

    /// Append a `BasicBlock` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn basic_block(&mut self, block: u32) -> io::Result<()> {
        self.write(&LogRecord::BasicBlock {
            block: ValueId::new(block),
        })
    }

    /// Append an `Enter` record
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn enter(&mut self, function: u32) -> io::Result<()> {
        self.write(&LogRecord::Enter {
            function: ValueId::new(function),
        })
    }

    /// Records written so far
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush the writer
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the underlying sink
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
