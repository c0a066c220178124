//! Argument parsing for running from the command line

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::aggregator::DEFAULT_WINDOW;

/// Matches the data logger's queue sizing, about ten days of 1 Hz sweeps
pub const DEFAULT_CAPACITY: usize = 864002;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Directory the data logger writes its daily sweep files into
    #[clap(short, long, default_value = "./tinysa_data")]
    pub data_dir: PathBuf,
    /// Extension of the sweep files to watch
    #[clap(short, long, default_value = "csv")]
    pub extension: String,
    /// Trailing window of integrated power to keep, in minutes
    #[clap(short, long, default_value_t = 15)]
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    pub window_minutes: u64,
    /// How often to check the active file for new rows (ms)
    #[clap(long, default_value_t = 500)]
    pub poll_ms: u64,
    /// How often to look for a file while none exists (ms)
    #[clap(long, default_value_t = 1000)]
    pub search_ms: u64,
    /// How often one queued sweep is consumed (ms)
    #[clap(long, default_value_t = 1000)]
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,
    /// Queue capacity between the file reader and the consumer
    #[clap(short, long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

/// Runtime configuration, independent of how it was provided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub extension: String,
    pub window: Duration,
    pub poll_interval: Duration,
    pub search_interval: Duration,
    pub tick_interval: Duration,
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tinysa_data"),
            extension: "csv".to_owned(),
            window: DEFAULT_WINDOW,
            poll_interval: Duration::from_millis(500),
            search_interval: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            data_dir: args.data_dir.clone(),
            extension: args.extension.trim_start_matches('.').to_owned(),
            window: Duration::from_secs(args.window_minutes * 60),
            poll_interval: Duration::from_millis(args.poll_ms),
            search_interval: Duration::from_millis(args.search_ms),
            tick_interval: Duration::from_millis(args.tick_ms),
            capacity: args.capacity.max(1),
        }
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}
