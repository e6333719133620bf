// src/geometry.rs
//
// Stateless geometry used by the crossing engine:
//   - general segment intersection (crossing boundary)
//   - horizontal-lane overlap test (lane attribution)
//   - compass heading of a displacement and its in/out flow
//   - pixel displacement → km/h speed estimate

use crate::error::{CountError, Result};
use crate::types::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PIXELS_PER_METER: f64 = 8.0;
/// 15 frames per interval × 3.6 (m/s → km/h)
pub const TIME_CONSTANT: f64 = 15.0 * 3.6;

// ============================================================================
// INTERSECTION
// ============================================================================

/// True when A → B → C turns counter-clockwise in image coordinates.
/// Collinear points are never counter-clockwise.
fn ccw(a: Point, b: Point, c: Point) -> bool {
    let lhs = (c.y as i128 - a.y as i128) * (b.x as i128 - a.x as i128);
    let rhs = (b.y as i128 - a.y as i128) * (c.x as i128 - a.x as i128);
    lhs > rhs
}

/// Orientation test for segment AB against segment CD.
///
/// Ties resolve through the strict comparison in [`ccw`]: a point lying
/// exactly on CD is grouped with one fixed side of it. A track whose sample
/// lands on the boundary therefore crosses it on exactly one of the two
/// steps through that sample. Fully collinear segments never intersect.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    ccw(a, c, d) != ccw(b, c, d) && ccw(a, b, c) != ccw(a, b, d)
}

/// Lane-attribution test for a horizontal lane boundary.
///
/// Fails with `InvalidGeometry` unless `lane_start.y == lane_end.y`.
pub fn segment_crosses_lane(a: Point, b: Point, lane_start: Point, lane_end: Point) -> Result<bool> {
    segment_crosses_lane_within(a, b, lane_start, lane_end, 0)
}

/// Same as [`segment_crosses_lane`], accepting lanes whose endpoints differ
/// in y by at most `tilt_tolerance` pixels. A tilted lane is tested against
/// its mid-height.
///
/// The track segment must straddle the lane's y (inclusive). Then either
/// track endpoint lies inside the lane's x-range, or the lane's x-range lies
/// inside the track segment's x-range.
pub fn segment_crosses_lane_within(
    a: Point,
    b: Point,
    lane_start: Point,
    lane_end: Point,
    tilt_tolerance: i32,
) -> Result<bool> {
    check_lane_tilt(0, lane_start, lane_end, tilt_tolerance)?;
    Ok(lane_overlap(a, b, lane_start, lane_end))
}

/// Rejects lane boundaries that are not horizontal within `tilt_tolerance`.
pub fn check_lane_tilt(lane: usize, start: Point, end: Point, tilt_tolerance: i32) -> Result<()> {
    if (start.y as i64 - end.y as i64).abs() > tilt_tolerance.max(0) as i64 {
        return Err(CountError::InvalidGeometry { lane, start, end });
    }
    Ok(())
}

/// Overlap test without the tilt check; callers validate the lane first.
pub(crate) fn lane_overlap(a: Point, b: Point, lane_start: Point, lane_end: Point) -> bool {
    // Compare against 2×mid-height to stay in integers.
    let lane_y2 = lane_start.y as i64 + lane_end.y as i64;
    let (track_y_min, track_y_max) = (a.y.min(b.y) as i64, a.y.max(b.y) as i64);
    if !(2 * track_y_min <= lane_y2 && lane_y2 <= 2 * track_y_max) {
        return false;
    }

    let (lane_x_min, lane_x_max) = (lane_start.x.min(lane_end.x), lane_start.x.max(lane_end.x));
    let (track_x_min, track_x_max) = (a.x.min(b.x), a.x.max(b.x));

    let endpoint_inside = |x: i32| lane_x_min <= x && x <= lane_x_max;
    let lane_inside_track = track_x_min <= lane_x_min && lane_x_max <= track_x_max;

    endpoint_inside(a.x) || endpoint_inside(b.x) || lane_inside_track
}

// ============================================================================
// DIRECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    North,
    South,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    East,
    West,
}

/// Compass heading of a displacement. Either component is absent when the
/// coordinates are equal on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heading {
    pub vertical: Option<Vertical>,
    pub horizontal: Option<Horizontal>,
}

impl Heading {
    pub fn is_unclassified(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    /// Coarse traffic flow. Only the vertical component counts.
    pub fn flow(&self) -> Option<FlowDirection> {
        match self.vertical {
            Some(Vertical::South) => Some(FlowDirection::In),
            Some(Vertical::North) => Some(FlowDirection::Out),
            None => None,
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vertical {
            Some(Vertical::North) => f.write_str("North")?,
            Some(Vertical::South) => f.write_str("South")?,
            None => {}
        }
        match self.horizontal {
            Some(Horizontal::East) => f.write_str("East"),
            Some(Horizontal::West) => f.write_str("West"),
            None => Ok(()),
        }
    }
}

/// Heading of the motion from `p1` to `p2` (image y grows downward).
pub fn classify_direction(p1: Point, p2: Point) -> Heading {
    let vertical = match p2.y.cmp(&p1.y) {
        std::cmp::Ordering::Less => Some(Vertical::North),
        std::cmp::Ordering::Greater => Some(Vertical::South),
        std::cmp::Ordering::Equal => None,
    };
    let horizontal = match p2.x.cmp(&p1.x) {
        std::cmp::Ordering::Greater => Some(Horizontal::East),
        std::cmp::Ordering::Less => Some(Horizontal::West),
        std::cmp::Ordering::Equal => None,
    };
    Heading {
        vertical,
        horizontal,
    }
}

/// Counting direction: "in" is downward motion, "out" upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    In,
    Out,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SPEED
// ============================================================================

/// Approximate km/h from one frame-interval displacement, using the fixed
/// calibration constants. Not derived from real frame timing.
pub fn estimate_speed(p1: Point, p2: Point) -> u32 {
    estimate_speed_with(p1, p2, PIXELS_PER_METER, TIME_CONSTANT)
}

pub fn estimate_speed_with(p1: Point, p2: Point, pixels_per_meter: f64, time_constant: f64) -> u32 {
    let dx = (p2.x as i64 - p1.x as i64) as f64;
    let dy = (p2.y as i64 - p1.y as i64) as f64;
    let d_meters = dx.hypot(dy) / pixels_per_meter;
    (d_meters * time_constant) as u32
}
