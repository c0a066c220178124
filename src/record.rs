//! Decoding of the append-only sweep table
//!
//! The header is `Timestamp` followed by one column per frequency bin, each named
//! by its frequency in Hz. Every following row is a timestamp and one power value
//! (dBm) per bin.

use std::{path::Path, sync::Arc};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{CodecError, CodecResult};

/// Full timestamp layout, e.g. `2025-11-12 19:11:39.123456`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// The data logger only writes the time of day
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S%.f";

const HZ_PER_MHZ: f64 = 1e6;
/// Daily files are named after the day they cover, e.g. `20251112.csv`
const FILE_DATE_FORMAT: &str = "%Y%m%d";
/// A time-of-day row this far ahead of the local clock belongs to the previous day
const CLOCK_SKEW_MINUTES: i64 = 5;

/// Where a record's timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// Full date and time parsed from the row
    Recorded,
    /// Time of day from the row, date from the file name or the local clock
    TimeOfDay,
    /// Row timestamp was unreadable, the local clock was substituted
    WallClock,
}

/// Frequency axis of one file generation, in MHz
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAxis {
    mhz: Arc<[f64]>,
    index_based: bool,
}

impl FrequencyAxis {
    /// Parse the header row, failing if any frequency column is not a number
    pub fn from_header(line: &str) -> CodecResult<Self> {
        let columns: Vec<&str> = fields(line).skip(1).collect();
        if columns.is_empty() {
            return Err(CodecError::EmptyHeader);
        }
        let mhz = columns
            .iter()
            .map(|col| match col.parse::<f64>() {
                Ok(hz) if hz.is_finite() => Ok(hz / HZ_PER_MHZ),
                _ => Err(CodecError::MalformedHeader {
                    column: col.to_string(),
                    columns: columns.len(),
                }),
            })
            .collect::<CodecResult<Vec<f64>>>()?;
        Ok(Self {
            mhz: mhz.into(),
            index_based: false,
        })
    }

    /// Evenly spaced `0..n` axis used when the header can't be read
    pub fn index_based(n: usize) -> Self {
        Self {
            mhz: (0..n).map(|i| i as f64).collect::<Vec<_>>().into(),
            index_based: true,
        }
    }

    pub fn len(&self) -> usize {
        self.mhz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mhz.is_empty()
    }

    pub fn is_index_based(&self) -> bool {
        self.index_based
    }

    pub fn mhz(&self) -> &[f64] {
        &self.mhz
    }

    /// First and last frequency, in file order
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((*self.mhz.first()?, *self.mhz.last()?))
    }
}

/// One decoded spectrum sweep. Frequencies and powers always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRecord {
    timestamp: NaiveDateTime,
    timestamp_source: TimestampSource,
    raw_timestamp: String,
    frequencies: Arc<[f64]>,
    powers: Vec<f64>,
    sweep_index: usize,
    total_sweeps: usize,
    source_file: Arc<Path>,
}

impl SweepRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: NaiveDateTime,
        timestamp_source: TimestampSource,
        raw_timestamp: impl Into<String>,
        frequencies: Arc<[f64]>,
        powers: Vec<f64>,
        sweep_index: usize,
        total_sweeps: usize,
        source_file: Arc<Path>,
    ) -> CodecResult<Self> {
        if frequencies.len() != powers.len() {
            return Err(CodecError::RowLengthMismatch {
                expected: frequencies.len(),
                actual: powers.len(),
            });
        }
        Ok(Self {
            timestamp,
            timestamp_source,
            raw_timestamp: raw_timestamp.into(),
            frequencies,
            powers,
            sweep_index,
            total_sweeps,
            source_file,
        })
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn timestamp_source(&self) -> TimestampSource {
        self.timestamp_source
    }

    /// The timestamp field exactly as written in the file
    pub fn raw_timestamp(&self) -> &str {
        &self.raw_timestamp
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn powers(&self) -> &[f64] {
        &self.powers
    }

    /// 0-based row position within the source file
    pub fn sweep_index(&self) -> usize {
        self.sweep_index
    }

    /// Rows in the source file when this one was read
    pub fn total_sweeps(&self) -> usize {
        self.total_sweeps
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }
}

/// Decodes rows of a single file generation against its header
#[derive(Debug, Clone)]
pub struct RowDecoder {
    axis: FrequencyAxis,
    source_file: Arc<Path>,
    file_date: Option<NaiveDate>,
}

impl RowDecoder {
    pub fn new(axis: FrequencyAxis, source_file: Arc<Path>) -> Self {
        let file_date = file_date(&source_file);
        Self {
            axis,
            source_file,
            file_date,
        }
    }

    /// Day the source file covers, if its name says so
    pub fn file_date(&self) -> Option<NaiveDate> {
        self.file_date
    }

    pub fn axis(&self) -> &FrequencyAxis {
        &self.axis
    }

    /// Decode one data row. `now` is substituted for unreadable timestamps.
    pub fn decode(
        &self,
        line: &str,
        sweep_index: usize,
        total_sweeps: usize,
        now: NaiveDateTime,
    ) -> CodecResult<SweepRecord> {
        let mut fields = fields(line);
        let raw_timestamp = fields.next().unwrap_or_default();
        let powers = fields
            .enumerate()
            .map(|(column, value)| {
                value.parse::<f64>().map_err(|_| CodecError::InvalidPower {
                    column,
                    value: value.to_string(),
                })
            })
            .collect::<CodecResult<Vec<f64>>>()?;
        let (timestamp, timestamp_source) = parse_timestamp(raw_timestamp, self.file_date, now);
        SweepRecord::new(
            timestamp,
            timestamp_source,
            raw_timestamp,
            self.axis.mhz.clone(),
            powers,
            sweep_index,
            total_sweeps,
            self.source_file.clone(),
        )
    }
}

/// Parse a row timestamp, falling back to `now` instead of rejecting the row.
///
/// A bare time of day is dated with `file_date` when known. Otherwise it gets
/// the local date, moved back a day if that would put the row in the future
/// (a row written just before midnight and read just after).
pub fn parse_timestamp(
    raw: &str,
    file_date: Option<NaiveDate>,
    now: NaiveDateTime,
) -> (NaiveDateTime, TimestampSource) {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        (ts, TimestampSource::Recorded)
    } else if let Ok(time) = NaiveTime::parse_from_str(raw, TIME_OF_DAY_FORMAT) {
        let ts = match file_date {
            Some(date) => date.and_time(time),
            None => {
                let ts = now.date().and_time(time);
                if ts > now + Duration::minutes(CLOCK_SKEW_MINUTES) {
                    ts - Duration::days(1)
                } else {
                    ts
                }
            }
        };
        (ts, TimestampSource::TimeOfDay)
    } else {
        (now, TimestampSource::WallClock)
    }
}

fn file_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, FILE_DATE_FORMAT).ok()
}

fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.trim_end_matches(['\r', '\n'])
        .split(',')
        .map(|f| f.trim().trim_matches('"'))
}
