// src/track_history.rs
//
// Per-track bounded trail of bottom-center points, most recent first.
// Histories only live while a track is continuously present: the frame a
// track id is missing from the active set, its history is dropped.

use crate::types::Point;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

pub struct TrackHistoryStore {
    histories: HashMap<u32, VecDeque<Point>>,
    capacity: usize,
}

impl TrackHistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            histories: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Prepend a sample, dropping the oldest beyond capacity.
    pub fn observe(&mut self, track_id: u32, point: Point) {
        let capacity = self.capacity;
        let history = self.histories.entry(track_id).or_insert_with(|| {
            debug!("New track history: ID #{}", track_id);
            VecDeque::with_capacity(capacity)
        });
        history.push_front(point);
        if history.len() > capacity {
            history.pop_back();
        }
    }

    /// Remove every track not in `active_track_ids`. Returns the evicted ids.
    pub fn evict_stale(&mut self, active_track_ids: &HashSet<u32>) -> Vec<u32> {
        let mut evicted = Vec::new();
        self.histories.retain(|id, _| {
            let keep = active_track_ids.contains(id);
            if !keep {
                evicted.push(*id);
            }
            keep
        });
        if !evicted.is_empty() {
            debug!("🗑️  Evicted {} stale track(s): {:?}", evicted.len(), evicted);
        }
        evicted
    }

    /// Trail for `track_id`, most recent first. Empty for unknown tracks.
    pub fn history_of(&self, track_id: u32) -> impl ExactSizeIterator<Item = Point> + '_ {
        self.histories
            .get(&track_id)
            .map(|h| h.iter())
            .unwrap_or_default()
            .copied()
    }

    /// The two most recent samples `(latest, previous)`, if recorded.
    pub fn latest_segment(&self, track_id: u32) -> Option<(Point, Point)> {
        let history = self.histories.get(&track_id)?;
        Some((*history.front()?, *history.get(1)?))
    }

    pub fn len_of(&self, track_id: u32) -> usize {
        self.histories.get(&track_id).map_or(0, VecDeque::len)
    }

    pub fn track_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.histories.keys().copied()
    }

    pub fn active_tracks(&self) -> usize {
        self.histories.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TrackHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
