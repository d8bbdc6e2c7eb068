//! I/O module
//!
//! Handles command-log parsing and snapshot output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, snapshot serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_csv_record, write_processes_csv, CsvCommandRecord};
pub use sync_reader::SyncReader;
