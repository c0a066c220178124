//! Bounded hand-off between the collector and the tick consumer
//!
//! Backed by a crossbeam bounded channel. Nothing here ever blocks: a full queue
//! drops the new record and an empty queue returns `None`.
//!
//! Resets are tracked with a generation counter. A producer stamps each enqueue
//! with the generation it read its data under, so rows read before a reset can't
//! sneak in after the flush. The stamp travels with the record, so the consumer
//! can tell which side of a reset a dequeued record belongs to.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, info};

use crate::{error::QueueError, monitoring::PipelineStats, record::SweepRecord};

/// A record together with the generation it was read under
#[derive(Debug, Clone, PartialEq)]
pub struct Queued {
    pub generation: u64,
    pub record: SweepRecord,
}

pub struct SweepQueue {
    sender: Sender<Queued>,
    receiver: Receiver<Queued>,
    capacity: usize,
    generation: AtomicU64,
    // Held across check-and-send and across flush so a clear is atomic for producers
    gate: Mutex<()>,
    stats: Arc<PipelineStats>,
}

impl SweepQueue {
    pub fn new(capacity: usize, stats: Arc<PipelineStats>) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
            stats,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Number of resets so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Non-blocking enqueue of a record read under `generation`
    pub fn enqueue(&self, record: SweepRecord, generation: u64) -> Result<(), QueueError> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.generation();
        if generation != current {
            self.stats.rejected_stale();
            return Err(QueueError::Stale {
                record: generation,
                current,
            });
        }
        match self.sender.try_send(Queued { generation, record }) {
            Ok(()) => {
                self.stats.enqueued();
                Ok(())
            }
            Err(TrySendError::Full(queued)) => {
                debug!(sweep = queued.record.sweep_index(), "Queue full, dropping sweep");
                self.stats.dropped_full();
                Err(QueueError::Full)
            }
            // We own a receiver, so the channel can't be disconnected
            Err(TrySendError::Disconnected(_)) => unreachable!(),
        }
    }

    /// Oldest queued record and its generation, if any
    pub fn try_dequeue_tagged(&self) -> Option<Queued> {
        match self.receiver.try_recv() {
            Ok(queued) => Some(queued),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Oldest queued record, if any
    pub fn try_dequeue(&self) -> Option<SweepRecord> {
        self.try_dequeue_tagged().map(|queued| queued.record)
    }

    /// Empty the queue and start a new generation. Returns the number of records flushed.
    pub fn clear(&self) -> usize {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let flushed = self.receiver.try_iter().count();
        self.stats.flushed(flushed as u64);
        info!(generation, flushed, "Queue cleared");
        flushed
    }
}
