//! One row of a command log, after parsing

use super::command::TransferCommand;
use super::process::ProcessId;

/// A parsed command-log entry
///
/// `Initiate` stands for the adapter accepting a new transfer request; it
/// creates the process in INITIAL and never goes through a handler. Every
/// other entry is a command for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayRecord {
    Initiate(ProcessId),
    Command(TransferCommand),
}

impl ReplayRecord {
    /// Process the entry targets; used to partition batches
    pub fn process_id(&self) -> &ProcessId {
        match self {
            ReplayRecord::Initiate(id) => id,
            ReplayRecord::Command(command) => command.target_process_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_of_each_variant() {
        let initiate = ReplayRecord::Initiate(ProcessId::new("tp-1"));
        let command = ReplayRecord::Command(TransferCommand::start("tp-2"));

        assert_eq!(initiate.process_id().as_str(), "tp-1");
        assert_eq!(command.process_id().as_str(), "tp-2");
    }
}
