//! Rolling window of integrated power, plus the most recent full spectrum

use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::{
    monitoring::PipelineStats,
    power::{integrate, mean, spectrum_stats, IntegratedPower, IntegrationMethod, SpectrumStats},
    record::SweepRecord,
};

/// Default trailing window, 15 minutes
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Integrated power of one sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatePoint {
    pub timestamp: NaiveDateTime,
    pub dbm: f64,
    pub method: IntegrationMethod,
}

/// Everything the presentation needs about the newest sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumView {
    pub record: SweepRecord,
    pub stats: SpectrumStats,
    pub integrated: IntegratedPower,
}

/// Statistics over the points currently in the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    pub count: usize,
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub span: chrono::Duration,
}

impl WindowSummary {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

pub struct Aggregator {
    window: Duration,
    points: VecDeque<AggregatePoint>,
    latest: Option<SpectrumView>,
    stats: Arc<PipelineStats>,
}

impl Aggregator {
    pub fn new(window: Duration, stats: Arc<PipelineStats>) -> Self {
        Self {
            window,
            points: VecDeque::new(),
            latest: None,
            stats,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Fold one sweep into the window, evicting anything older than `now - window`
    pub fn ingest(&mut self, record: SweepRecord, now: NaiveDateTime) -> Option<AggregatePoint> {
        let (integrated, stats) = match (
            integrate(record.powers()),
            spectrum_stats(record.frequencies(), record.powers()),
        ) {
            (Some(integrated), Some(stats)) => (integrated, stats),
            _ => {
                warn!(sweep = record.sweep_index(), "Sweep has no bins");
                return None;
            }
        };
        if integrated.method.is_degraded() {
            warn!(
                sweep = record.sweep_index(),
                "Linear integration overflowed, reporting mean power"
            );
            self.stats.integration_degraded();
        }
        if record.sweep_index() < 3 {
            debug!(
                sweep = record.sweep_index(),
                "Peak at {:.3} MHz ({:.2} dBm), integrated power: {:.2} dBm",
                stats.peak_mhz,
                stats.peak_dbm,
                integrated.dbm
            );
        }

        let point = AggregatePoint {
            timestamp: record.timestamp(),
            dbm: integrated.dbm,
            method: integrated.method,
        };
        self.points.push_back(point);
        self.evict(now);
        self.latest = Some(SpectrumView {
            record,
            stats,
            integrated,
        });
        Some(point)
    }

    /// Drop points older than `now - window`. Timestamps arrive in order, so only the front is checked.
    pub fn evict(&mut self, now: NaiveDateTime) {
        let cutoff = match chrono::Duration::from_std(self.window)
            .ok()
            .and_then(|w| now.checked_sub_signed(w))
        {
            Some(cutoff) => cutoff,
            None => return,
        };
        while self
            .points
            .front()
            .map_or(false, |p| p.timestamp < cutoff)
        {
            self.points.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.latest = None;
    }

    pub fn latest(&self) -> Option<&SpectrumView> {
        self.latest.as_ref()
    }

    pub fn points(&self) -> impl Iterator<Item = &AggregatePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn summary(&self) -> Option<WindowSummary> {
        let first = self.points.front()?;
        let last = self.points.back()?;
        let values: Vec<f64> = self.points.iter().map(|p| p.dbm).collect();
        Some(WindowSummary {
            count: values.len(),
            current: last.dbm,
            average: mean(&values)?,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            span: last.timestamp - first.timestamp,
        })
    }
}
