//! This module contains all the capture logic
//!
//! The collector thread does one thing: find the newest sweep file in the data
//! directory, notice when rows have been appended to it, and push the decoded
//! rows into the [`SweepQueue`]. It never waits on the consumer, a full queue
//! just costs us the record.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant, SystemTime},
};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::{
    args::Config,
    error::{CaptureError, CaptureResult, CodecError},
    monitoring::PipelineStats,
    queue::SweepQueue,
    record::{FrequencyAxis, RowDecoder, TimestampSource},
};

// Longest uninterrupted sleep, so shutdown is noticed promptly
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Position of the collector in the active file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    pub path: PathBuf,
    pub rows_consumed: usize,
}

impl StreamCursor {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            rows_consumed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Searching,
    Tailing,
}

/// What a single poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No candidate file in the directory
    Searching,
    /// The active file has no rows past the cursor
    Idle,
    /// This many new rows were read (decoded or discarded)
    Read(usize),
    /// The directory or file couldn't be read this time around
    Retry,
}

pub struct Collector {
    dir: PathBuf,
    extension: String,
    poll_interval: Duration,
    search_interval: Duration,
    queue: Arc<SweepQueue>,
    cursor: Option<StreamCursor>,
    decoder: Option<RowDecoder>,
    generation: u64,
}

impl Collector {
    pub fn new(config: &Config, queue: Arc<SweepQueue>) -> Self {
        let generation = queue.generation();
        Self {
            dir: config.data_dir.clone(),
            extension: config.extension.clone(),
            poll_interval: config.poll_interval,
            search_interval: config.search_interval,
            queue,
            cursor: None,
            decoder: None,
            generation,
        }
    }

    pub fn state(&self) -> CollectorState {
        match self.cursor {
            Some(_) => CollectorState::Tailing,
            None => CollectorState::Searching,
        }
    }

    pub fn cursor(&self) -> Option<&StreamCursor> {
        self.cursor.as_ref()
    }

    fn stats(&self) -> &PipelineStats {
        self.queue.stats()
    }

    /// Most recently created file with our extension, ties broken by name
    pub fn latest_file(&self) -> CaptureResult<Option<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CaptureError::TransientIo {
            path: self.dir.clone(),
            source,
        })?;
        let latest = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(&self.extension))
            })
            .filter_map(|entry| {
                let meta = entry.metadata().ok().filter(|m| m.is_file())?;
                // Not every filesystem records a birth time
                let created = meta
                    .created()
                    .or_else(|_| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((created, entry.path()))
            })
            .max()
            .map(|(_, path)| path);
        Ok(latest)
    }

    /// Run one collection cycle
    pub fn poll(&mut self, now: NaiveDateTime) -> PollOutcome {
        // A reset happened since the last poll, reread the active file from the top
        let generation = self.queue.generation();
        if generation != self.generation {
            self.generation = generation;
            self.decoder = None;
            if let Some(cursor) = self.cursor.as_mut() {
                info!(file = %cursor.path.display(), "Reset, rereading from row 0");
                cursor.rows_consumed = 0;
            }
        }

        let latest = match self.latest_file() {
            Ok(latest) => latest,
            Err(e) => {
                warn!("{}", e);
                self.stats().transient_io_error();
                return PollOutcome::Retry;
            }
        };
        let latest = match latest {
            Some(path) => path,
            None => {
                if let Some(cursor) = self.cursor.take() {
                    info!(file = %cursor.path.display(), "Active file is gone, searching");
                    self.decoder = None;
                }
                return PollOutcome::Searching;
            }
        };

        match self.cursor.as_mut() {
            None => {
                info!(file = %latest.display(), "Tailing");
                self.cursor = Some(StreamCursor::new(latest));
            }
            Some(cursor) if cursor.path != latest => {
                info!(
                    from = %cursor.path.display(),
                    to = %latest.display(),
                    "Switched to new file"
                );
                self.queue.stats().rotation();
                *cursor = StreamCursor::new(latest);
                self.decoder = None;
            }
            Some(_) => (),
        }

        match self.read_new_rows(now) {
            Ok(0) => PollOutcome::Idle,
            Ok(n) => PollOutcome::Read(n),
            Err(e) => {
                warn!("{}", e);
                self.stats().transient_io_error();
                PollOutcome::Retry
            }
        }
    }

    fn read_new_rows(&mut self, now: NaiveDateTime) -> CaptureResult<usize> {
        let cursor = match self.cursor.as_ref() {
            Some(cursor) => cursor.clone(),
            None => return Ok(0),
        };
        let bytes = fs::read(&cursor.path).map_err(|source| CaptureError::TransientIo {
            path: cursor.path.clone(),
            source,
        })?;
        // Invalid bytes only spoil their own row, which then fails to decode
        let content = String::from_utf8_lossy(&bytes);
        let mut lines = complete_lines(&content);
        let header = match lines.next() {
            Some(header) => header,
            None => return Ok(0),
        };
        let rows: Vec<&str> = lines.collect();
        let count = rows.len();
        if count <= cursor.rows_consumed {
            return Ok(0);
        }

        if self.decoder.is_none() {
            self.decoder = self.decoder_for(&cursor.path, header);
        }
        for (idx, line) in rows.iter().enumerate().skip(cursor.rows_consumed) {
            let decoded = match self.decoder.as_ref() {
                Some(decoder) => decoder.decode(line, idx, count, now),
                None => Err(CodecError::EmptyHeader),
            };
            match decoded {
                Ok(record) => {
                    self.stats().row_decoded();
                    if record.timestamp_source() == TimestampSource::WallClock {
                        debug!(
                            row = idx,
                            raw = record.raw_timestamp(),
                            "Unreadable timestamp, using local time"
                        );
                        self.stats().wall_clock_timestamp();
                    }
                    // Drops are counted by the queue
                    let _ = self.queue.enqueue(record, self.generation);
                }
                Err(e) => {
                    warn!(row = idx, file = %cursor.path.display(), "Discarding row: {}", e);
                    self.stats().row_discarded();
                }
            }
        }
        if let Some(active) = self.cursor.as_mut() {
            active.rows_consumed = count;
        }
        Ok(count - cursor.rows_consumed)
    }

    fn decoder_for(&self, path: &Path, header: &str) -> Option<RowDecoder> {
        let axis = match FrequencyAxis::from_header(header) {
            Ok(axis) => {
                if let Some((low, high)) = axis.range() {
                    info!(
                        points = axis.len(),
                        "Frequency range: {:.3} MHz to {:.3} MHz",
                        low,
                        high
                    );
                }
                axis
            }
            Err(CodecError::MalformedHeader { column, columns }) => {
                warn!(
                    file = %path.display(),
                    points = columns,
                    "Frequency column '{}' is not numeric, using an index axis",
                    column
                );
                self.stats().header_degraded();
                FrequencyAxis::index_based(columns)
            }
            Err(e) => {
                warn!(file = %path.display(), "{}", e);
                return None;
            }
        };
        Some(RowDecoder::new(axis, Arc::from(path)))
    }

    /// Poll until `shutdown` is set
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!(dir = %self.dir.display(), "Collector started");
        while !shutdown.load(Ordering::Acquire) {
            let pause = match self.poll(Local::now().naive_local()) {
                PollOutcome::Searching | PollOutcome::Retry => self.search_interval,
                PollOutcome::Idle | PollOutcome::Read(_) => self.poll_interval,
            };
            sleep_unless(&shutdown, pause);
        }
        info!("Collector stopped");
    }
}

/// Newline-terminated, non-blank lines. A trailing line without a newline is
/// still being written and is left for the next poll.
fn complete_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split_inclusive('\n')
        .filter(|line| line.ends_with('\n'))
        .filter(|line| !line.trim().is_empty())
}

fn sleep_unless(shutdown: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while !shutdown.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
