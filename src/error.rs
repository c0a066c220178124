//! Error types for every stage of the pipeline.
//!
//! None of these are fatal: the collector and the aggregator recover from all
//! of them locally and record the event in [`crate::monitoring::PipelineStats`].

use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors produced while decoding the tabular sweep file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// A header column could not be read as a frequency in Hz
    #[error("Malformed header column '{column}' ({columns} frequency columns)")]
    MalformedHeader { column: String, columns: usize },

    /// The header names no frequency columns at all
    #[error("Header has no frequency columns")]
    EmptyHeader,

    /// The number of power fields differs from the number of frequency columns
    #[error("Row length mismatch: expected {expected} power values, got {actual}")]
    RowLengthMismatch { expected: usize, actual: usize },

    /// A power field could not be read as dBm
    #[error("Invalid power value '{value}' in column {column}")]
    InvalidPower { column: usize, value: String },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while polling the watched directory
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The file or directory was momentarily unreadable
    #[error("Transient I/O error on {path}: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Reasons a record was not accepted by the queue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity, the record was dropped
    #[error("Queue full, record dropped")]
    Full,

    /// The record was read before the last reset
    #[error("Record from generation {record} rejected, queue is at generation {current}")]
    Stale { record: u64, current: u64 },
}
