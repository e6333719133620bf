// src/pipeline/metrics.rs
//
// Session observability. Counts frames, crossings and discards for the
// end-of-session summary and periodic progress logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub frames_with_detections: Arc<AtomicU64>,
    pub detections_seen: Arc<AtomicU64>,
    pub boundary_hits: Arc<AtomicU64>,
    pub events_recorded: Arc<AtomicU64>,
    pub unattributed_crossings: Arc<AtomicU64>,
    pub unclassified_crossings: Arc<AtomicU64>,
    pub suppressed_repeats: Arc<AtomicU64>,
    pub against_flow_events: Arc<AtomicU64>,
    pub tracks_evicted: Arc<AtomicU64>,
    pub frame_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            frames_with_detections: Arc::new(AtomicU64::new(0)),
            detections_seen: Arc::new(AtomicU64::new(0)),
            boundary_hits: Arc::new(AtomicU64::new(0)),
            events_recorded: Arc::new(AtomicU64::new(0)),
            unattributed_crossings: Arc::new(AtomicU64::new(0)),
            unclassified_crossings: Arc::new(AtomicU64::new(0)),
            suppressed_repeats: Arc::new(AtomicU64::new(0)),
            against_flow_events: Arc::new(AtomicU64::new(0)),
            tracks_evicted: Arc::new(AtomicU64::new(0)),
            frame_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            frames_with_detections: self.frames_with_detections.load(Ordering::Relaxed),
            detections_seen: self.detections_seen.load(Ordering::Relaxed),
            boundary_hits: self.boundary_hits.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            unattributed_crossings: self.unattributed_crossings.load(Ordering::Relaxed),
            unclassified_crossings: self.unclassified_crossings.load(Ordering::Relaxed),
            suppressed_repeats: self.suppressed_repeats.load(Ordering::Relaxed),
            against_flow_events: self.against_flow_events.load(Ordering::Relaxed),
            tracks_evicted: self.tracks_evicted.load(Ordering::Relaxed),
            last_frame_us: self.frame_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub frames_with_detections: u64,
    pub detections_seen: u64,
    pub boundary_hits: u64,
    pub events_recorded: u64,
    pub unattributed_crossings: u64,
    pub unclassified_crossings: u64,
    pub suppressed_repeats: u64,
    pub against_flow_events: u64,
    pub tracks_evicted: u64,
    pub last_frame_us: u64,
    pub elapsed_secs: f64,
}
