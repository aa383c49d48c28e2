use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Process a token-stream operation log
#[derive(Parser, Debug)]
#[command(name = "streaming-engine")]
#[command(about = "Process a token-stream operation log", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "INPUT", help = "Path to the input operation-log CSV")]
    pub input_file: PathBuf,

    /// Processing strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for single-threaded or 'async' for batched"
    )]
    pub strategy: StrategyType,

    /// Protocol fee fraction charged on every creation
    #[arg(
        long = "fee-rate",
        value_name = "RATE",
        default_value = "0",
        help = "Protocol fee fraction in [0, 0.1], e.g. 0.01 for 1%"
    )]
    pub fee_rate: Decimal,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent batches (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available processing strategies
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Falls back to defaults where no custom value was provided; zero
    /// values are rejected by `BatchConfig::new` with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "ops.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "ops.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "ops.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        match (&parsed.strategy, &expected) {
            (StrategyType::Sync, StrategyType::Sync) => (),
            (StrategyType::Async, StrategyType::Async) => (),
            _ => panic!("Expected {:?}, got {:?}", expected, parsed.strategy),
        }
    }

    #[rstest]
    #[case::default_rate(&["program", "ops.csv"], Decimal::ZERO)]
    #[case::one_percent(&["program", "--fee-rate", "0.01", "ops.csv"], Decimal::new(1, 2))]
    fn test_fee_rate_parsing(#[case] args: &[&str], #[case] expected: Decimal) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.fee_rate, expected);
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "ops.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "ops.csv"], None, Some(8))]
    #[case::no_options(&["program", "ops.csv"], None, None)]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent_batches, max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "ops.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "ops.csv"], 2000, num_cpus::get())]
    #[case::all_custom(
        &["program", "--batch-size", "2000", "--max-concurrent", "8", "ops.csv"],
        2000,
        8
    )]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "ops.csv"])]
    #[case::invalid_fee_rate(&["program", "--fee-rate", "lots", "ops.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
