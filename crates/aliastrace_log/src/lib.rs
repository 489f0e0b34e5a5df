//! ALIASTRACE Event Log
//!
//! Fixed-width binary records emitted by an instrumented program, and the
//! readers that replay them forward or backward.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod counter;
pub mod cursor;
pub mod encoding;
pub mod record;
pub mod stream;
pub mod writer;

pub use counter::LogCounter;
pub use cursor::{Cursor, Direction};
pub use encoding::{RECORD_SIZE, decode_record, encode_record};
pub use record::{LogRecord, RecordKind};
pub use stream::{LogReader, open_log};
pub use writer::LogWriter;
