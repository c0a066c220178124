//! Runtime counters for everything the pipeline drops or degrades.
//! Nothing here is fatal, so these counters are the only record of lost data.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    rows_decoded: AtomicU64,
    rows_discarded: AtomicU64,
    degraded_headers: AtomicU64,
    wall_clock_timestamps: AtomicU64,
    transient_io_errors: AtomicU64,
    rotations: AtomicU64,
    enqueued: AtomicU64,
    dropped_full: AtomicU64,
    rejected_stale: AtomicU64,
    flushed: AtomicU64,
    degraded_integrations: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub rows_decoded: u64,
    pub rows_discarded: u64,
    pub degraded_headers: u64,
    pub wall_clock_timestamps: u64,
    pub transient_io_errors: u64,
    pub rotations: u64,
    pub enqueued: u64,
    pub dropped_full: u64,
    pub rejected_stale: u64,
    pub flushed: u64,
    pub degraded_integrations: u64,
}

fn bump(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn row_decoded(&self) {
        bump(&self.rows_decoded, 1)
    }

    pub fn row_discarded(&self) {
        bump(&self.rows_discarded, 1)
    }

    pub fn header_degraded(&self) {
        bump(&self.degraded_headers, 1)
    }

    pub fn wall_clock_timestamp(&self) {
        bump(&self.wall_clock_timestamps, 1)
    }

    pub fn transient_io_error(&self) {
        bump(&self.transient_io_errors, 1)
    }

    pub fn rotation(&self) {
        bump(&self.rotations, 1)
    }

    pub fn enqueued(&self) {
        bump(&self.enqueued, 1)
    }

    pub fn dropped_full(&self) {
        bump(&self.dropped_full, 1)
    }

    pub fn rejected_stale(&self) {
        bump(&self.rejected_stale, 1)
    }

    pub fn flushed(&self, n: u64) {
        bump(&self.flushed, n)
    }

    pub fn integration_degraded(&self) {
        bump(&self.degraded_integrations, 1)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            rows_decoded: load(&self.rows_decoded),
            rows_discarded: load(&self.rows_discarded),
            degraded_headers: load(&self.degraded_headers),
            wall_clock_timestamps: load(&self.wall_clock_timestamps),
            transient_io_errors: load(&self.transient_io_errors),
            rotations: load(&self.rotations),
            enqueued: load(&self.enqueued),
            dropped_full: load(&self.dropped_full),
            rejected_stale: load(&self.rejected_stale),
            flushed: load(&self.flushed),
            degraded_integrations: load(&self.degraded_integrations),
        }
    }
}
