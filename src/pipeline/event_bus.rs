// src/pipeline/event_bus.rs
//
// Decoupled event system. The session publishes what happened each frame;
// overlay and reporting consumers drain it instead of reaching into engine
// state.

use crate::crossing_engine::{CrossingEvent, DiscardedCrossing};
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    CrossingCounted(CrossingEvent),

    CrossingDiscarded(DiscardedCrossing),

    TrackEvicted { track_id: u32, frame_id: u64 },
}

/// Bounded FIFO of session events between frames.
pub struct EventBus {
    events: VecDeque<SessionEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    /// Queues `event`. When `max_pending` events are already waiting, the
    /// oldest is dropped so the newest frame's events always get through.
    pub fn publish(&mut self, event: SessionEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Takes every pending event in publish order.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_drops_oldest_when_full() {
        let mut bus = EventBus::new(2);
        for track_id in 1..=3 {
            bus.publish(SessionEvent::TrackEvicted {
                track_id,
                frame_id: 10,
            });
        }
        assert_eq!(bus.pending_count(), 2);

        let ids: Vec<u32> = bus
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::TrackEvicted { track_id, .. } => Some(track_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(bus.pending_count(), 0);
    }
}
