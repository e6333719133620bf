// src/session.rs
//
// One processing session: owns every piece of mutable state (track
// histories, ledger, event log) and drives a frame through
//
//   evict stale tracks → observe bottom-centers → evaluate crossings → record
//
// Frames must be fed one at a time, in order, from a single owner. There is
// no internal locking.

use crate::counting_ledger::CountingLedger;
use crate::crossing_engine::{CrossingEngine, CrossingEvent, DiscardReason, EngineConfig};
use crate::error::Result;
use crate::event_log::EventLog;
use crate::lane_registry::LaneRegistry;
use crate::overlay::OverlaySnapshot;
use crate::pipeline::{EventBus, FrameContext, SessionEvent, SessionMetrics};
use crate::track_history::TrackHistoryStore;
use crate::types::Config;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct CountingSession {
    history: TrackHistoryStore,
    registry: LaneRegistry,
    engine: CrossingEngine,
    ledger: CountingLedger,
    event_log: Option<EventLog>,
    bus: EventBus,
    metrics: SessionMetrics,
    last_frame_id: Option<u64>,
}

impl CountingSession {
    /// Builds the lane registry and clears the event log.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let registry = LaneRegistry::from_config(&config.lanes)?;
        let event_log = EventLog::create(&config.session.event_log_path)?;

        let mut session = Self::in_memory(
            registry,
            EngineConfig {
                calibration: config.calibration,
                count_once_per_track: config.session.count_once_per_track,
            },
            config.session.history_capacity,
        );
        session.bus = EventBus::new(config.session.event_bus_capacity);
        session.event_log = Some(event_log);

        info!(
            "✓ Counting session ready (history={}, once_per_track={})",
            config.session.history_capacity, config.session.count_once_per_track
        );
        Ok(session)
    }

    /// Session without a persisted event log.
    pub fn in_memory(registry: LaneRegistry, engine_config: EngineConfig, history_capacity: usize) -> Self {
        Self {
            history: TrackHistoryStore::with_capacity(history_capacity),
            registry,
            engine: CrossingEngine::new(engine_config),
            ledger: CountingLedger::new(),
            event_log: None,
            bus: EventBus::new(256),
            metrics: SessionMetrics::new(),
            last_frame_id: None,
        }
    }

    /// Runs one frame and returns the crossings counted in it.
    pub fn process_frame(&mut self, frame: &FrameContext) -> Result<Vec<CrossingEvent>> {
        let started = Instant::now();

        if let Some(last) = self.last_frame_id {
            if frame.frame_id <= last {
                warn!(
                    "Frame {} arrived after frame {}; processing in arrival order",
                    frame.frame_id, last
                );
            }
        }
        self.last_frame_id = Some(frame.frame_id);

        self.metrics.inc(&self.metrics.total_frames);
        if !frame.is_empty() {
            self.metrics.inc(&self.metrics.frames_with_detections);
            self.metrics
                .add(&self.metrics.detections_seen, frame.detections.len() as u64);
        }

        // Stale eviction strictly precedes this frame's observations
        let evicted = self.history.evict_stale(&frame.active_track_ids());
        self.engine.forget(&evicted);
        self.metrics
            .add(&self.metrics.tracks_evicted, evicted.len() as u64);
        for track_id in evicted {
            self.bus.publish(SessionEvent::TrackEvicted {
                track_id,
                frame_id: frame.frame_id,
            });
        }

        for det in &frame.detections {
            self.history.observe(det.identity(), det.bbox.bottom_center());
        }

        let outcome = self.engine.evaluate_frame(
            frame.frame_id,
            frame.timestamp_ms,
            &frame.detections,
            &self.history,
            &self.registry,
        );
        self.metrics
            .add(&self.metrics.boundary_hits, outcome.boundary_hits as u64);

        for discarded in outcome.discarded {
            let counter = match discarded.reason {
                DiscardReason::NoLane => &self.metrics.unattributed_crossings,
                DiscardReason::Unclassified => &self.metrics.unclassified_crossings,
                DiscardReason::AlreadyCounted => &self.metrics.suppressed_repeats,
            };
            self.metrics.inc(counter);
            self.bus.publish(SessionEvent::CrossingDiscarded(discarded));
        }

        // Log line first: the ledger only holds events the log also holds
        for event in &outcome.events {
            if let Some(log) = self.event_log.as_mut() {
                log.append(event)?;
            }
            self.ledger.record(event.clone());
            self.metrics.inc(&self.metrics.events_recorded);
            if event.against_flow {
                self.metrics.inc(&self.metrics.against_flow_events);
            }
            self.bus.publish(SessionEvent::CrossingCounted(event.clone()));
        }

        let elapsed_us = started.elapsed().as_micros() as u64;
        self.metrics.set_timing(&self.metrics.frame_time_us, elapsed_us);
        debug!(
            "Frame {}: {} detection(s), {} active track(s), {} event(s) in {}µs",
            frame.frame_id,
            frame.detections.len(),
            self.history.active_tracks(),
            outcome.events.len(),
            elapsed_us
        );

        Ok(outcome.events)
    }

    pub fn history(&self) -> &TrackHistoryStore {
        &self.history
    }

    pub fn registry(&self) -> &LaneRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &CrossingEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &CountingLedger {
        &self.ledger
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        self.event_log.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.bus.drain()
    }

    /// Read-only view for the overlay renderer.
    pub fn overlay(&self, frame: &FrameContext) -> OverlaySnapshot {
        OverlaySnapshot::capture(self, frame)
    }
}
