//! Live ingestion of RF spectrum sweeps from an append-only sweep log.
//!
//! A collector thread tails the newest file in a directory and pushes decoded
//! sweeps through a bounded queue. A tick-driven [`playback::Monitor`] takes one
//! sweep per tick, integrates its power and keeps a trailing window of the
//! results next to the latest full spectrum.

pub mod aggregator;
pub mod args;
pub mod capture;
pub mod error;
pub mod monitoring;
pub mod playback;
pub mod power;
pub mod queue;
pub mod record;

pub use aggregator::{AggregatePoint, Aggregator, SpectrumView, WindowSummary};
pub use args::Config;
pub use capture::{Collector, PollOutcome, StreamCursor};
pub use playback::{Command, DashboardView, Monitor, PlaybackController, PlaybackState};
pub use queue::{Queued, SweepQueue};
pub use record::{FrequencyAxis, RowDecoder, SweepRecord};
