// src/pipeline/frame_context.rs
//
// Single source of truth for one frame's tracked detections, as handed
// over by the detector/tracker. One JSON object per line in a recorded
// stream.

use crate::types::Detection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameContext {
    pub frame_id: u64,
    #[serde(default)]
    pub timestamp_ms: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl FrameContext {
    pub fn new(frame_id: u64, timestamp_ms: f64, detections: Vec<Detection>) -> Self {
        Self {
            frame_id,
            timestamp_ms,
            detections,
        }
    }

    /// Identities present this frame; unidentified detections map to 0.
    pub fn active_track_ids(&self) -> HashSet<u32> {
        self.detections.iter().map(Detection::identity).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
