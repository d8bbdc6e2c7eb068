//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over replay records from a command-log file.
//! Delegates CSV format concerns to the `csv_format` module.
//!
//! # Design
//!
//! `SyncReader` wraps `csv::Reader` and deserializes one row at a time, so
//! memory use does not grow with the size of the log.
//!
//! ```no_run
//! use transfer_process_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Replaying: {:?}", record),
//!         Err(e) => eprintln!("Skipping row: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Opening the file fails fast from `new()`
//! - Row-level parse and conversion errors are yielded as `Err` items with the
//!   line number; iteration continues with the next row

use crate::io::csv_format::{convert_csv_record, CsvCommandRecord};
use crate::types::{ReplayError, ReplayRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous command-log reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open `path` for streaming
    ///
    /// The reader trims whitespace, tolerates rows without a `detail` column
    /// and uses an 8KB buffer.
    pub fn new(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|e| ReplayError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<ReplayRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvCommandRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        // Header is line 1
        let line = self.line_num + 1;
        Some(match row {
            Ok(csv_record) => {
                convert_csv_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}
