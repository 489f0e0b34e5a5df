//! Record counting pre-pass.

use crate::cursor::Direction;
use crate::stream::LogReader;
use aliastrace_core::{CoreError, CoreResult};
use std::io::{Read, Seek};
use std::path::Path;

/// Counts the records in a log, validating every tag on the way.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCounter;

impl LogCounter {
    /// Count the records in a log file
    ///
    /// # Errors
    ///
    /// Returns `MissingLogFile` or `CorruptLog`
    pub fn count_file(path: impl AsRef<Path>) -> CoreResult<u64> {
        Self::count(LogReader::open(path, Direction::Forward)?)
    }

    /// Count the records produced by a reader, which must be fresh
    ///
    /// # Errors
    ///
    /// Returns `CorruptLog` on any decode failure, or if the number of
    /// decoded records disagrees with the size of the source
    pub fn count<R: Read + Seek>(reader: LogReader<R>) -> CoreResult<u64> {
        let expected = reader.remaining();
        let mut seen = 0u64;
        for item in reader {
            item?;
            seen += 1;
        }
        if seen != expected {
            return Err(CoreError::corrupt(
                0,
                format!("decoded {} records, file holds {}", seen, expected),
            ));
        }
        tracing::debug!(records = seen, "counted log records");
        Ok(seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::LogWriter;
    use std::io::Cursor;

    #[test]
    fn test_count_records() {
        let mut writer = LogWriter::new(Vec::new());
        for i in 0..5 {
            writer.basic_block(i).unwrap();
        }
        let reader = LogReader::new(Cursor::new(writer.into_inner()), Direction::Forward).unwrap();
        assert_eq!(LogCounter::count(reader).unwrap(), 5);
    }

    #[test]
    fn test_count_rejects_bad_tag() {
        let mut writer = LogWriter::new(Vec::new());
        writer.enter(0).unwrap();
        writer.enter(1).unwrap();
        let mut bytes = writer.into_inner();
        bytes[32] = 99;
        let reader = LogReader::new(Cursor::new(bytes), Direction::Forward).unwrap();
        assert!(matches!(
            LogCounter::count(reader),
            Err(CoreError::CorruptLog { .. })
        ));
    }

    #[test]
    fn test_count_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.log");
        let mut writer = LogWriter::create(&path).unwrap();
        writer.call(1).unwrap();
        writer.flush().unwrap();
        drop(writer);
        assert_eq!(LogCounter::count_file(&path).unwrap(), 1);
    }
}
