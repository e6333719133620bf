// src/lane_registry.rs
//
// Immutable lane geometry for one processing session: the single crossing
// boundary plus the ordered lane boundaries used for attribution. Built once
// from configuration; geometry problems are rejected here, never per frame.

use crate::error::{CountError, Result};
use crate::geometry::{self, FlowDirection};
use crate::types::{LaneConfig, Point, Rgb};
use tracing::{info, warn};

/// Adjustment tool palette, by lane index.
const LANE_PALETTE: [Rgb; 8] = [
    Rgb(255, 0, 0),
    Rgb(0, 255, 0),
    Rgb(0, 0, 255),
    Rgb(0, 255, 255),
    Rgb(255, 0, 255),
    Rgb(255, 255, 0),
    Rgb(138, 43, 226),
    Rgb(247, 141, 187),
];

pub const MAX_LANES: usize = LANE_PALETTE.len();

const CROSSING_COLOR: Rgb = Rgb(65, 70, 84);

#[derive(Debug, Clone, PartialEq)]
pub struct LaneBoundary {
    pub index: usize,
    pub start: Point,
    pub end: Point,
    /// Display only
    pub color: Rgb,
    pub name: String,
    pub flow: Option<FlowDirection>,
}

impl LaneBoundary {
    pub fn new(index: usize, start: Point, end: Point) -> Self {
        Self {
            index,
            start,
            end,
            color: Self::palette_color(index),
            name: format!("lane {}", index + 1),
            flow: None,
        }
    }

    pub fn palette_color(index: usize) -> Rgb {
        LANE_PALETTE[index % LANE_PALETTE.len()]
    }

    /// 1-based ordinal reported in crossing events.
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }

    /// Lane-attribution test against a validated boundary.
    pub fn is_crossed_by(&self, latest: Point, previous: Point) -> bool {
        geometry::lane_overlap(latest, previous, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingBoundary {
    pub start: Point,
    pub end: Point,
    pub color: Rgb,
}

impl CrossingBoundary {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            color: CROSSING_COLOR,
        }
    }

    /// Full-width horizontal line one third of the way up from the bottom.
    pub fn for_frame(width: i32, height: i32) -> Self {
        let y = height - height / 3;
        Self::new(Point::new(0, y), Point::new(width, y))
    }

    pub fn is_crossed_by(&self, latest: Point, previous: Point) -> bool {
        geometry::segments_intersect(latest, previous, self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct LaneRegistry {
    crossing: CrossingBoundary,
    lanes: Vec<LaneBoundary>,
    tilt_tolerance: i32,
}

impl LaneRegistry {
    /// Validates every lane and orders them by index.
    pub fn new(
        crossing: CrossingBoundary,
        mut lanes: Vec<LaneBoundary>,
        tilt_tolerance: i32,
    ) -> Result<Self> {
        if lanes.len() > MAX_LANES {
            return Err(CountError::InvalidConfig(format!(
                "{} lanes configured, at most {} supported",
                lanes.len(),
                MAX_LANES
            )));
        }
        for lane in &lanes {
            if let Err(e) = geometry::check_lane_tilt(lane.index, lane.start, lane.end, tilt_tolerance) {
                warn!("Rejecting {}: {}", lane.name, e);
                return Err(e);
            }
        }
        lanes.sort_by_key(|l| l.index);
        if lanes.windows(2).any(|w| w[0].index == w[1].index) {
            return Err(CountError::InvalidConfig("duplicate lane index".to_string()));
        }

        Ok(Self {
            crossing,
            lanes,
            tilt_tolerance,
        })
    }

    /// Enabled lanes keep their configured position as `index`.
    pub fn from_config(config: &LaneConfig) -> Result<Self> {
        if config.boundaries.len() > MAX_LANES {
            return Err(CountError::InvalidConfig(format!(
                "{} lanes configured, at most {} supported",
                config.boundaries.len(),
                MAX_LANES
            )));
        }

        let crossing = match config.crossing {
            Some(seg) => CrossingBoundary::new(seg.start, seg.end),
            None => CrossingBoundary::for_frame(config.frame_width, config.frame_height),
        };

        let lanes: Vec<LaneBoundary> = config
            .boundaries
            .iter()
            .enumerate()
            .filter(|(_, lane)| lane.enabled)
            .map(|(index, lane)| {
                let (start, end) = lane.geometry.endpoints();
                let mut boundary = LaneBoundary::new(index, start, end);
                if let Some(color) = lane.color {
                    boundary.color = color;
                }
                if let Some(name) = &lane.name {
                    boundary.name = name.clone();
                }
                boundary.flow = lane.flow;
                boundary
            })
            .collect();

        let registry = Self::new(crossing, lanes, config.tilt_tolerance_px)?;
        info!(
            "✓ Lane registry ready: crossing {} → {}, {} lane(s) enabled",
            registry.crossing.start,
            registry.crossing.end,
            registry.lanes.len()
        );
        if registry.lanes.is_empty() {
            warn!("No lanes enabled; boundary crossings will never be counted");
        }
        Ok(registry)
    }

    pub fn crossing(&self) -> &CrossingBoundary {
        &self.crossing
    }

    /// Lanes in ascending index order.
    pub fn lanes(&self) -> &[LaneBoundary] {
        &self.lanes
    }

    pub fn lane(&self, index: usize) -> Option<&LaneBoundary> {
        self.lanes.iter().find(|l| l.index == index)
    }

    /// Lowest-index lane crossed by the segment.
    pub fn first_crossed_lane(&self, latest: Point, previous: Point) -> Option<&LaneBoundary> {
        self.lanes.iter().find(|lane| lane.is_crossed_by(latest, previous))
    }

    pub fn tilt_tolerance(&self) -> i32 {
        self.tilt_tolerance
    }
}
