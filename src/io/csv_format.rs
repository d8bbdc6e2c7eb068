//! CSV format handling for command logs and process snapshots
//!
//! This module centralizes all CSV format concerns:
//! - `CsvCommandRecord` for deserializing command-log rows
//! - Conversion from rows to `ReplayRecord`s
//! - Process snapshot serialization
//!
//! All functions are pure (no file I/O) for easy testing.
//!
//! # Input Format
//!
//! ```text
//! process,command,detail
//! tp-1,initiate,
//! tp-1,request,
//! tp-1,terminate,counterparty withdrew
//! ```
//!
//! `detail` is the suspend reason, the terminate reason or the fault detail.
//! It is ignored for the other commands.

use crate::types::{ProcessId, ReplayError, ReplayRecord, TransferCommand, TransferProcess};
use serde::Deserialize;
use std::io::Write;

/// One command-log row as it appears in the file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvCommandRecord {
    pub process: String,
    pub command: String,
    pub detail: Option<String>,
}

/// Convert a row into a replay record
///
/// Command names are case-insensitive. A missing terminate reason or fault
/// detail is passed through as an empty string; the command's own validation
/// rejects it when it is dispatched.
///
/// # Returns
///
/// * `Ok(ReplayRecord)` - converted row
/// * `Err(String)` - blank process id or unknown command name
pub fn convert_csv_record(csv_record: CsvCommandRecord) -> Result<ReplayRecord, String> {
    let process = csv_record.process.trim();
    if process.is_empty() {
        return Err(format!(
            "Missing process id for '{}' command",
            csv_record.command
        ));
    }

    let detail = csv_record
        .detail
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let record = match csv_record.command.trim().to_lowercase().as_str() {
        "initiate" => ReplayRecord::Initiate(ProcessId::new(process)),
        "request" => ReplayRecord::Command(TransferCommand::request(process)),
        "start" => ReplayRecord::Command(TransferCommand::start(process)),
        "suspend" => ReplayRecord::Command(TransferCommand::suspend(process, detail)),
        "resume" => ReplayRecord::Command(TransferCommand::resume(process)),
        "complete" => ReplayRecord::Command(TransferCommand::complete(process)),
        "terminate" => ReplayRecord::Command(TransferCommand::terminate(
            process,
            detail.unwrap_or_default(),
        )),
        "fail" => ReplayRecord::Command(TransferCommand::fail(
            process,
            detail.unwrap_or_default(),
        )),
        _ => {
            return Err(format!(
                "Invalid command: '{}' for process {}",
                csv_record.command, process
            ))
        }
    };

    Ok(record)
}

/// Write process snapshots as CSV
///
/// Columns: process, state, state_count, error_detail. Rows are sorted by
/// process id for deterministic output.
pub fn write_processes_csv(
    processes: &[TransferProcess],
    output: &mut dyn Write,
) -> Result<(), ReplayError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["process", "state", "state_count", "error_detail"])?;

    let mut sorted: Vec<&TransferProcess> = processes.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    for process in sorted {
        let state_count = process.state_count.to_string();
        writer.write_record([
            process.id.as_str(),
            process.state.as_str(),
            state_count.as_str(),
            process.error_detail.as_deref().unwrap_or(""),
        ])?;
    }

    writer
        .flush()
        .map_err(|e| ReplayError::Output(format!("Failed to flush output: {}", e)))?;

    Ok(())
}
