//! Play / pause / reset, and the tick-driven consumer they gate
//!
//! The collector keeps tailing while paused, so nothing is lost; only the
//! consumer stops advancing. A reset flushes the queue and starts a new queue
//! generation, which the collector and the [`Monitor`] each pick up on their next
//! cycle: the collector rereads the active file from row 0 and the monitor
//! clears its window.

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::NaiveDateTime;
use tracing::info;

use crate::{
    aggregator::{AggregatePoint, Aggregator, SpectrumView, WindowSummary},
    queue::{Queued, SweepQueue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Live,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Live => write!(f, "Live"),
            PlaybackState::Paused => write!(f, "Paused"),
        }
    }
}

/// Control actions available to the presentation side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePlay,
    Reset,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" | "play" | "toggle" => Ok(Command::TogglePlay),
            "r" | "reset" => Ok(Command::Reset),
            other => Err(format!("Unknown command '{}'", other)),
        }
    }
}

pub struct PlaybackController {
    paused: AtomicBool,
    queue: Arc<SweepQueue>,
}

impl PlaybackController {
    pub fn new(queue: Arc<SweepQueue>) -> Self {
        Self {
            paused: AtomicBool::new(false),
            queue,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.paused.load(Ordering::Acquire) {
            PlaybackState::Paused
        } else {
            PlaybackState::Live
        }
    }

    pub fn is_live(&self) -> bool {
        self.state() == PlaybackState::Live
    }

    /// Flip between live and paused, returning the new state
    pub fn toggle_play(&self) -> PlaybackState {
        let was_paused = self.paused.fetch_xor(true, Ordering::AcqRel);
        let state = if was_paused {
            PlaybackState::Live
        } else {
            PlaybackState::Paused
        };
        info!(%state, "Playback toggled");
        state
    }

    /// Flush the queue and signal the collector and consumer to start over.
    /// Returns the number of queued records thrown away.
    pub fn reset(&self) -> usize {
        let flushed = self.queue.clear();
        info!(flushed, "Reset: cleared queue, window and cursor");
        flushed
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Paused,
    Empty,
    Updated(AggregatePoint),
    /// A record was dequeued but had nothing to integrate
    Skipped,
}

/// Read-only view handed to the presentation each tick
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub playback: PlaybackState,
    pub latest: Option<SpectrumView>,
    pub points: Vec<AggregatePoint>,
    pub summary: Option<WindowSummary>,
}

/// The consuming end of the queue, advanced one record per tick
pub struct Monitor {
    aggregator: Aggregator,
    queue: Arc<SweepQueue>,
    playback: Arc<PlaybackController>,
    generation: u64,
}

impl Monitor {
    pub fn new(
        aggregator: Aggregator,
        queue: Arc<SweepQueue>,
        playback: Arc<PlaybackController>,
    ) -> Self {
        let generation = queue.generation();
        Self {
            aggregator,
            queue,
            playback,
            generation,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn queue(&self) -> &SweepQueue {
        &self.queue
    }

    /// Consume at most one queued record
    pub fn tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        let generation = self.queue.generation();
        self.follow_generation(generation);
        if !self.playback.is_live() {
            return TickOutcome::Paused;
        }
        while let Some(queued) = self.queue.try_dequeue_tagged() {
            if let Some(outcome) = self.consume(queued, now) {
                return outcome;
            }
        }
        TickOutcome::Empty
    }

    /// Ingest one dequeued record, or `None` if it predates the last reset we saw.
    /// A record from a newer generation means a reset landed after the check at the
    /// top of the tick, so the window is cleared before it goes in.
    fn consume(&mut self, queued: Queued, now: NaiveDateTime) -> Option<TickOutcome> {
        if queued.generation < self.generation {
            self.queue.stats().rejected_stale();
            return None;
        }
        self.follow_generation(queued.generation);
        Some(match self.aggregator.ingest(queued.record, now) {
            Some(point) => TickOutcome::Updated(point),
            None => TickOutcome::Skipped,
        })
    }

    fn follow_generation(&mut self, generation: u64) {
        if generation > self.generation {
            self.generation = generation;
            self.aggregator.clear();
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            playback: self.playback.state(),
            latest: self.aggregator.latest().cloned(),
            points: self.aggregator.points().copied().collect(),
            summary: self.aggregator.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregator::DEFAULT_WINDOW,
        record::{SweepRecord, TimestampSource},
    };
    use chrono::NaiveDate;
    use std::path::Path;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 12)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn record(idx: usize) -> SweepRecord {
        SweepRecord::new(
            now() + chrono::Duration::seconds(idx as i64),
            TimestampSource::Recorded,
            "",
            Arc::from(vec![100.0, 200.0]),
            vec![-10.0 - idx as f64, -20.0],
            idx,
            idx + 1,
            Arc::from(Path::new("20251112.csv")),
        )
        .unwrap()
    }

    fn setup() -> (Arc<SweepQueue>, Arc<PlaybackController>, Monitor) {
        let queue = Arc::new(SweepQueue::new(16, Arc::default()));
        let playback = Arc::new(PlaybackController::new(queue.clone()));
        let monitor = Monitor::new(
            Aggregator::new(DEFAULT_WINDOW, queue.stats().clone()),
            queue.clone(),
            playback.clone(),
        );
        (queue, playback, monitor)
    }

    #[test]
    fn test_toggle() {
        let (_, playback, _) = setup();
        assert_eq!(playback.state(), PlaybackState::Live);
        assert_eq!(playback.toggle_play(), PlaybackState::Paused);
        assert!(!playback.is_live());
        assert_eq!(playback.toggle_play(), PlaybackState::Live);
    }

    #[test]
    fn test_one_record_per_tick() {
        let (queue, _, mut monitor) = setup();
        assert_eq!(monitor.tick(now()), TickOutcome::Empty);
        queue.enqueue(record(0), 0).unwrap();
        queue.enqueue(record(1), 0).unwrap();
        assert!(matches!(monitor.tick(now()), TickOutcome::Updated(_)));
        assert_eq!(queue.len(), 1);
        assert_eq!(monitor.view().latest.unwrap().record.sweep_index(), 0);
        monitor.tick(now());
        assert_eq!(monitor.view().points.len(), 2);
    }

    #[test]
    fn test_pause_freezes_view() {
        let (queue, playback, mut monitor) = setup();
        queue.enqueue(record(0), 0).unwrap();
        monitor.tick(now());
        playback.toggle_play();
        let frozen = monitor.view();
        for i in 1..4 {
            queue.enqueue(record(i), 0).unwrap();
            assert_eq!(monitor.tick(now()), TickOutcome::Paused);
        }
        let mut after = monitor.view();
        assert_eq!(after.playback, PlaybackState::Paused);
        after.playback = frozen.playback;
        assert_eq!(after, frozen);

        // Resuming takes the oldest queued record, not the newest
        playback.toggle_play();
        monitor.tick(now());
        assert_eq!(monitor.view().latest.unwrap().record.sweep_index(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (queue, playback, mut monitor) = setup();
        for i in 0..3 {
            queue.enqueue(record(i), 0).unwrap();
        }
        monitor.tick(now());
        assert_eq!(playback.reset(), 2);
        assert!(queue.is_empty());
        assert_eq!(monitor.tick(now()), TickOutcome::Empty);
        let view = monitor.view();
        assert!(view.latest.is_none());
        assert!(view.points.is_empty());
        assert!(view.summary.is_none());
    }

    #[test]
    fn test_reset_while_paused() {
        let (queue, playback, mut monitor) = setup();
        queue.enqueue(record(0), 0).unwrap();
        monitor.tick(now());
        playback.toggle_play();
        playback.reset();
        assert_eq!(monitor.tick(now()), TickOutcome::Paused);
        assert!(monitor.view().latest.is_none());
    }

    #[test]
    fn test_reset_between_check_and_dequeue() {
        let (queue, _, mut monitor) = setup();
        for i in 0..3 {
            queue.enqueue(record(i), 0).unwrap();
            monitor.tick(now());
        }
        assert_eq!(monitor.view().points.len(), 3);

        // Reset and re-read land after the monitor last looked at the generation
        queue.clear();
        queue.enqueue(record(0), 1).unwrap();
        let queued = queue.try_dequeue_tagged().unwrap();
        assert!(matches!(
            monitor.consume(queued, now()),
            Some(TickOutcome::Updated(_))
        ));
        let view = monitor.view();
        assert_eq!(view.points.len(), 1);
        assert_eq!(view.latest.unwrap().record.sweep_index(), 0);

        // The next tick must not clear the freshly ingested point
        queue.enqueue(record(1), 1).unwrap();
        monitor.tick(now());
        assert_eq!(monitor.view().points.len(), 2);
    }

    #[test]
    fn test_record_older_than_seen_reset_is_dropped() {
        let (queue, _, mut monitor) = setup();
        queue.clear();
        assert_eq!(monitor.tick(now()), TickOutcome::Empty);
        let stale = Queued {
            generation: 0,
            record: record(5),
        };
        assert_eq!(monitor.consume(stale, now()), None);
        assert!(monitor.view().latest.is_none());
        assert_eq!(queue.stats().snapshot().rejected_stale, 1);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("p".parse::<Command>(), Ok(Command::TogglePlay));
        assert_eq!(" Reset\n".parse::<Command>(), Ok(Command::Reset));
        assert!("quit".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }
}
