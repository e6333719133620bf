// src/crossing_engine.rs
//
// Per-frame crossing evaluation.
//
// For every detection whose track has at least two samples, the latest
// motion segment (latest, previous) is tested in order:
//
//   1. crosses the crossing boundary?        no  → nothing this frame
//   2. first lane (lowest index) it crosses   none → discarded (NoLane)
//   3. vertical flow of previous → latest     none → discarded (Unclassified)
//   4. speed estimate, event emitted
//
// The same two samples are re-evaluated every frame until the track's
// history advances, so a track that stays straddling the line is counted
// again each frame. `count_once_per_track` latches a track after its first
// count until the track is evicted; that is a deliberate behavior change and
// stays off by default.

use crate::geometry::{self, FlowDirection};
use crate::lane_registry::LaneRegistry;
use crate::track_history::TrackHistoryStore;
use crate::types::{CalibrationConfig, ClassLabel, Detection};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// ============================================================================
// TYPES
// ============================================================================

/// A counted crossing of one lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingEvent {
    pub track_id: u32,
    /// Approximate km/h, see `geometry::estimate_speed`
    pub speed_kmh: u32,
    pub direction: FlowDirection,
    /// 1-based lane ordinal
    pub lane_index: usize,
    pub class_label: ClassLabel,
    pub frame_id: u64,
    pub timestamp_ms: f64,
    /// Direction contradicts the lane's configured flow
    pub against_flow: bool,
}

/// Why a boundary crossing did not produce an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscardReason {
    /// Crossed the boundary but no configured lane
    NoLane,
    /// No vertical motion component
    Unclassified,
    /// Track already counted and the latch is on
    AlreadyCounted,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoLane => "NO_LANE",
            Self::Unclassified => "UNCLASSIFIED",
            Self::AlreadyCounted => "ALREADY_COUNTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscardedCrossing {
    pub track_id: u32,
    pub frame_id: u64,
    pub reason: DiscardReason,
}

#[derive(Debug, Clone, Default)]
pub struct FrameOutcome {
    pub events: Vec<CrossingEvent>,
    pub discarded: Vec<DiscardedCrossing>,
    /// Detections whose segment crossed the crossing boundary
    pub boundary_hits: usize,
}

/// Most recent boundary matches, for overlay highlight effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight {
    /// Frame in which the crossing boundary last matched
    pub crossing_frame: Option<u64>,
    /// Lane index and frame of the last lane attribution
    pub lane: Option<(usize, u64)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub calibration: CalibrationConfig,
    pub count_once_per_track: bool,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Sum and count of one track's speed samples.
#[derive(Debug, Default, Clone, Copy)]
struct SpeedTotal {
    sum: u64,
    count: u64,
}

impl SpeedTotal {
    fn add(&mut self, speed_kmh: u32) {
        self.sum = self.sum.saturating_add(speed_kmh as u64);
        self.count += 1;
    }

    fn mean(&self) -> Option<u32> {
        (self.count > 0).then(|| (self.sum / self.count) as u32)
    }
}

pub struct CrossingEngine {
    config: EngineConfig,
    /// Latched tracks (only used with `count_once_per_track`)
    counted: HashSet<u32>,
    /// Per-track running speed totals, for labels
    speed_totals: HashMap<u32, SpeedTotal>,
    highlight: Highlight,
}

impl CrossingEngine {
    pub fn new(config: EngineConfig) -> Self {
        if config.count_once_per_track {
            warn!("count_once_per_track enabled: tracks are counted at most once until evicted");
        }
        Self {
            config,
            counted: HashSet::new(),
            speed_totals: HashMap::new(),
            highlight: Highlight::default(),
        }
    }

    /// Evaluates one frame. `history` must already hold this frame's samples.
    pub fn evaluate_frame(
        &mut self,
        frame_id: u64,
        timestamp_ms: f64,
        detections: &[Detection],
        history: &TrackHistoryStore,
        registry: &LaneRegistry,
    ) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        let calibration = self.config.calibration;

        for det in detections {
            let track_id = det.identity();
            let Some((latest, previous)) = history.latest_segment(track_id) else {
                continue;
            };

            let speed_kmh = geometry::estimate_speed_with(
                previous,
                latest,
                calibration.pixels_per_meter,
                calibration.time_constant,
            );
            self.speed_totals.entry(track_id).or_default().add(speed_kmh);

            if !registry.crossing().is_crossed_by(latest, previous) {
                continue;
            }
            outcome.boundary_hits += 1;
            self.highlight.crossing_frame = Some(frame_id);

            let mut discard = |reason: DiscardReason| {
                debug!(
                    "Track #{} ({}) crossed at frame {} but was discarded: {}",
                    track_id,
                    det.class_label,
                    frame_id,
                    reason.as_str()
                );
                outcome.discarded.push(DiscardedCrossing {
                    track_id,
                    frame_id,
                    reason,
                });
            };

            let Some(lane) = registry.first_crossed_lane(latest, previous) else {
                discard(DiscardReason::NoLane);
                continue;
            };
            self.highlight.lane = Some((lane.index, frame_id));

            let heading = geometry::classify_direction(previous, latest);
            let Some(direction) = heading.flow() else {
                discard(DiscardReason::Unclassified);
                continue;
            };

            if self.config.count_once_per_track && !self.counted.insert(track_id) {
                discard(DiscardReason::AlreadyCounted);
                continue;
            }

            let against_flow = lane.flow.is_some_and(|flow| flow != direction);
            if against_flow {
                warn!(
                    "⚠️  Track #{} ({}) moving {} in {} (expected {})",
                    track_id,
                    det.class_label,
                    direction,
                    lane.name,
                    lane.flow.map_or("any", |f| f.as_str())
                );
            }

            info!(
                "🚗 Track #{} ({}) crossed lane {} heading {} → {} at {} km/h",
                track_id,
                det.class_label,
                lane.ordinal(),
                heading,
                direction,
                speed_kmh
            );

            outcome.events.push(CrossingEvent {
                track_id,
                speed_kmh,
                direction,
                lane_index: lane.ordinal(),
                class_label: det.class_label.clone(),
                frame_id,
                timestamp_ms,
                against_flow,
            });
        }

        outcome
    }

    /// Drops per-track state for evicted tracks.
    pub fn forget(&mut self, evicted: &[u32]) {
        for id in evicted {
            self.counted.remove(id);
            self.speed_totals.remove(id);
        }
    }

    /// Integer mean of the track's speed samples.
    pub fn average_speed(&self, track_id: u32) -> Option<u32> {
        self.speed_totals.get(&track_id)?.mean()
    }

    pub fn highlight(&self) -> Highlight {
        self.highlight
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane_registry::{CrossingBoundary, LaneBoundary};
    use crate::types::{BoundingBox, Point};

    fn registry() -> LaneRegistry {
        let crossing = CrossingBoundary::new(Point::new(0, 300), Point::new(640, 300));
        let lanes = vec![LaneBoundary::new(0, Point::new(100, 295), Point::new(150, 305))];
        LaneRegistry::new(crossing, lanes, 10).unwrap()
    }

    fn car(track_id: u32) -> Detection {
        Detection::new(Some(track_id), BoundingBox::new(100, 250, 150, 310), ClassLabel::Car)
    }

    /// Seeds a history given most-recent-first points.
    fn history_with(track_id: u32, points: &[Point]) -> TrackHistoryStore {
        let mut history = TrackHistoryStore::new();
        for p in points.iter().rev() {
            history.observe(track_id, *p);
        }
        history
    }

    #[test]
    fn test_downward_crossing_counts_in() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(7, &[Point::new(125, 310), Point::new(125, 290)]);

        let outcome = engine.evaluate_frame(2, 66.0, &[car(7)], &history, &registry());

        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.track_id, 7);
        assert_eq!(event.direction, FlowDirection::In);
        assert_eq!(event.lane_index, 1);
        assert_eq!(event.speed_kmh, 135);
        assert_eq!(outcome.boundary_hits, 1);
        assert_eq!(engine.highlight().lane, Some((0, 2)));
    }

    #[test]
    fn test_upward_crossing_counts_out() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(7, &[Point::new(125, 290), Point::new(125, 310)]);

        let outcome = engine.evaluate_frame(2, 66.0, &[car(7)], &history, &registry());

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].direction, FlowDirection::Out);
        assert_eq!(outcome.events[0].lane_index, 1);
    }

    #[test]
    fn test_crossing_outside_every_lane_is_discarded() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(3, &[Point::new(400, 310), Point::new(400, 290)]);

        let outcome = engine.evaluate_frame(2, 66.0, &[car(3)], &history, &registry());

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.boundary_hits, 1);
        assert_eq!(outcome.discarded[0].reason, DiscardReason::NoLane);
        assert_eq!(engine.highlight().crossing_frame, Some(2));
        assert_eq!(engine.highlight().lane, None);
    }

    #[test]
    fn test_single_point_history_never_counts() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(1, &[Point::new(125, 310)]);

        let outcome = engine.evaluate_frame(1, 33.0, &[car(1)], &history, &registry());

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.boundary_hits, 0);
        assert_eq!(engine.average_speed(1), None);
    }

    #[test]
    fn test_horizontal_motion_is_unclassified() {
        // Crossing boundary that a horizontal segment can intersect
        let crossing = CrossingBoundary::new(Point::new(125, 0), Point::new(125, 640));
        let lanes = vec![LaneBoundary::new(0, Point::new(100, 300), Point::new(150, 300))];
        let registry = LaneRegistry::new(crossing, lanes, 0).unwrap();
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(5, &[Point::new(130, 300), Point::new(120, 300)]);

        let outcome = engine.evaluate_frame(4, 0.0, &[car(5)], &history, &registry);

        assert_eq!(outcome.boundary_hits, 1);
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.discarded[0].reason, DiscardReason::Unclassified);
    }

    #[test]
    fn test_paused_track_is_recounted_by_default() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(7, &[Point::new(125, 310), Point::new(125, 290)]);
        let registry = registry();

        let first = engine.evaluate_frame(2, 0.0, &[car(7)], &history, &registry);
        let second = engine.evaluate_frame(3, 0.0, &[car(7)], &history, &registry);

        assert_eq!(first.events.len(), 1);
        assert_eq!(second.events.len(), 1);
    }

    #[test]
    fn test_latch_suppresses_repeat_until_forgotten() {
        let mut engine = CrossingEngine::new(EngineConfig {
            count_once_per_track: true,
            ..Default::default()
        });
        let history = history_with(7, &[Point::new(125, 310), Point::new(125, 290)]);
        let registry = registry();

        let first = engine.evaluate_frame(2, 0.0, &[car(7)], &history, &registry);
        let second = engine.evaluate_frame(3, 0.0, &[car(7)], &history, &registry);
        assert_eq!(first.events.len(), 1);
        assert!(second.events.is_empty());
        assert_eq!(second.discarded[0].reason, DiscardReason::AlreadyCounted);

        engine.forget(&[7]);
        let third = engine.evaluate_frame(9, 0.0, &[car(7)], &history, &registry);
        assert_eq!(third.events.len(), 1);
    }

    #[test]
    fn test_against_flow_is_flagged_but_counted() {
        let crossing = CrossingBoundary::new(Point::new(0, 300), Point::new(640, 300));
        let mut lane = LaneBoundary::new(0, Point::new(100, 300), Point::new(150, 300));
        lane.flow = Some(FlowDirection::Out);
        let registry = LaneRegistry::new(crossing, vec![lane], 0).unwrap();
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let history = history_with(7, &[Point::new(125, 310), Point::new(125, 290)]);

        let outcome = engine.evaluate_frame(2, 0.0, &[car(7)], &history, &registry);

        assert_eq!(outcome.events.len(), 1);
        assert!(outcome.events[0].against_flow);
    }

    #[test]
    fn test_average_speed_tracks_samples() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let registry = registry();
        // 20 px then 8 px downward, well above the boundary
        let mut history = TrackHistoryStore::new();
        history.observe(2, Point::new(10, 100));
        history.observe(2, Point::new(10, 120));
        engine.evaluate_frame(2, 0.0, &[car(2)], &history, &registry);
        history.observe(2, Point::new(10, 128));
        engine.evaluate_frame(3, 0.0, &[car(2)], &history, &registry);

        // (135 + 54) / 2
        assert_eq!(engine.average_speed(2), Some(94));
        engine.forget(&[2]);
        assert_eq!(engine.average_speed(2), None);
    }

    #[test]
    fn test_parked_track_keeps_constant_speed_state() {
        let mut engine = CrossingEngine::new(EngineConfig::default());
        let registry = registry();
        let mut history = TrackHistoryStore::new();
        history.observe(4, Point::new(10, 100));
        history.observe(4, Point::new(10, 116));
        engine.evaluate_frame(1, 0.0, &[car(4)], &history, &registry);

        for frame_id in 2..10_000 {
            history.observe(4, Point::new(10, 116));
            engine.evaluate_frame(frame_id, 0.0, &[car(4)], &history, &registry);
        }

        // One 108 km/h step followed by 9998 stationary ones
        assert_eq!(engine.speed_totals.len(), 1);
        assert_eq!(engine.speed_totals[&4].count, 9_999);
        assert_eq!(engine.average_speed(4), Some(0));
        assert_eq!(history.len_of(4), 64);
    }
}
