use crate::core::space::TileCoord;
use crate::prelude::HashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Outcome of the admission policy for one tile
///
/// A rejected tile can never become useful for the current view and should be
/// dropped by the caller; there is no null-priority sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Fetch the tile; lower values are served first
    Admit(f64),
    /// Never fetch the tile
    Reject,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    priority: f64,
    /// Tie-breaker; earlier enqueues are served first
    sequence: u64,
    coord: TileCoord,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the max-heap pops the lowest priority number first
        match other.priority.partial_cmp(&self.priority) {
            Some(Ordering::Equal) | None => other.sequence.cmp(&self.sequence),
            Some(ordering) => ordering,
        }
    }
}

/// Bounded-concurrency priority admission queue
///
/// Holds coordinates whose fetch has not started yet, ordered by priority
/// number (lowest first). Admission moves a coordinate into the in-flight set,
/// which never grows beyond `max_concurrent`; a completion frees the slot and
/// the caller immediately attempts the next admission. In-flight fetches are
/// never cancelled or reordered.
#[derive(Debug)]
pub struct TileQueue {
    max_concurrent: usize,
    pending: BinaryHeap<QueueEntry>,
    queued: HashSet<TileCoord>,
    in_flight: HashSet<TileCoord>,
    sequence: u64,
}

impl TileQueue {
    pub fn new(max_concurrent: usize) -> Self {
        debug_assert!(max_concurrent > 0);
        Self {
            max_concurrent,
            pending: BinaryHeap::new(),
            queued: HashSet::default(),
            in_flight: HashSet::default(),
            sequence: 0,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Submits a coordinate under the given admission decision
    ///
    /// Returns false for `Reject`, in which case the queue tracks nothing and
    /// the caller should drop the tile. Coordinates already pending or in
    /// flight are left untouched.
    pub fn enqueue(&mut self, coord: TileCoord, admission: Admission) -> bool {
        if self.queued.contains(&coord) || self.in_flight.contains(&coord) {
            return true;
        }
        match admission {
            Admission::Admit(priority) => {
                debug_assert!(priority.is_finite(), "admitted tile without a finite priority");
                let sequence = self.sequence;
                self.sequence += 1;
                self.queued.insert(coord);
                self.pending.push(QueueEntry {
                    priority,
                    sequence,
                    coord,
                });
                true
            }
            Admission::Reject => false,
        }
    }

    /// Recomputes the priority of every still-pending entry
    ///
    /// The pending set is preserved except for entries the policy now
    /// rejects, which are removed and returned so the caller can drop them.
    /// In-flight fetches are not touched.
    pub fn reprioritize(
        &mut self,
        mut admission: impl FnMut(TileCoord) -> Admission,
    ) -> Vec<TileCoord> {
        let entries: Vec<QueueEntry> = self.pending.drain().collect();
        let mut dropped = Vec::new();
        for entry in entries {
            match admission(entry.coord) {
                Admission::Admit(priority) => self.pending.push(QueueEntry {
                    priority,
                    sequence: entry.sequence,
                    coord: entry.coord,
                }),
                Admission::Reject => {
                    self.queued.remove(&entry.coord);
                    dropped.push(entry.coord);
                }
            }
        }
        if !dropped.is_empty() {
            log::debug!("reprioritize dropped {} pending tiles", dropped.len());
        }
        dropped
    }

    /// Pops pending coordinates into the in-flight set while slots are free
    pub fn admit(&mut self) -> Vec<TileCoord> {
        let mut admitted = Vec::new();
        while self.in_flight.len() < self.max_concurrent {
            let Some(entry) = self.pending.pop() else {
                break;
            };
            self.queued.remove(&entry.coord);
            self.in_flight.insert(entry.coord);
            admitted.push(entry.coord);
        }
        admitted
    }

    /// Frees the in-flight slot held by `coord`
    pub fn complete(&mut self, coord: TileCoord) {
        let removed = self.in_flight.remove(&coord);
        debug_assert!(removed, "completion for a tile that was never admitted");
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_pending(&self, coord: &TileCoord) -> bool {
        self.queued.contains(coord)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }
}
