//! Transfer Process Engine CLI
//!
//! Replays a command log against an in-memory store and prints the final
//! state of every transfer process.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > processes.csv
//! cargo run -- --strategy sync commands.csv > processes.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 commands.csv > processes.csv
//! RUST_LOG=debug cargo run -- commands.csv > processes.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, output failure, configuration fault, etc.)

use std::process;
use tracing::error;
use transfer_process_engine::{cli, logging, strategy};

fn main() {
    let args = cli::parse_args();
    logging::init_logging(&args.log_level);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.to_retry_policy())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "Replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
