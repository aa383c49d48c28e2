//! Rust Streaming Engine CLI
//!
//! Command-line interface for processing token-stream operation logs from
//! CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > streams.csv
//! cargo run -- --strategy sync operations.csv > streams.csv
//! cargo run -- --fee-rate 0.01 operations.csv > streams.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 operations.csv > streams.csv
//! ```
//!
//! The program reads operation records from the input CSV file, applies them
//! through the streaming engine using the selected processing strategy, and
//! outputs the final stream states to stdout.
//!
//! # Processing Strategies
//!
//! - **sync**: single-threaded, strictly serializable processing
//! - **async**: batched processing, parallel across streams (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_streaming_engine::cli;
use rust_streaming_engine::strategy;
use std::process;

fn main() {
    // Parse command-line arguments using clap
    let args = cli::parse_args();

    // Create the appropriate processing strategy based on CLI arguments
    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, args.fee_rate, config)
    };

    // Process operations using the selected strategy
    // Output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
