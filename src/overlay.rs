// src/overlay.rs
//
// Render model for the video overlay collaborator. Everything here is plain
// data taken from the session after a frame has been processed; drawing is
// left to whoever consumes the snapshot.
//
//   - trails: tapering polylines from each active track's history
//   - labels: "{id}:{class} {avg}km/h" anchored at the box's top-left corner
//   - boundaries: lanes + crossing line with colors, flashed when matched
//   - counts: "entering" (in) and "leaving" (out) per class

use crate::geometry::FlowDirection;
use crate::lane_registry::LaneBoundary;
use crate::pipeline::FrameContext;
use crate::session::CountingSession;
use crate::types::{Point, Rgb};

/// Color used to flash a boundary that matched this frame.
pub const FLASH_COLOR: Rgb = Rgb(255, 255, 255);

#[derive(Debug, Clone, PartialEq)]
pub struct TrailSegment {
    pub from: Point,
    pub to: Point,
    pub thickness: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackOverlay {
    pub track_id: u32,
    pub label: String,
    pub anchor: Point,
    pub color: Rgb,
    pub trail: Vec<TrailSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryOverlay {
    pub start: Point,
    pub end: Point,
    pub color: Rgb,
    pub flashing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub frame_id: u64,
    pub tracks: Vec<TrackOverlay>,
    pub crossing: BoundaryOverlay,
    pub lanes: Vec<BoundaryOverlay>,
    pub entering: Vec<String>,
    pub leaving: Vec<String>,
}

/// Trail thickness for the `i`-th segment (1-based), thinning with age.
pub fn trail_thickness(i: usize, capacity: usize) -> u32 {
    ((capacity as f64 / (2 * i) as f64).sqrt() * 1.5) as u32
}

impl OverlaySnapshot {
    pub fn capture(session: &CountingSession, frame: &FrameContext) -> Self {
        let history = session.history();
        let highlight = session.engine().highlight();
        let flashed_now = |at: Option<u64>| at == Some(frame.frame_id);

        let tracks = frame
            .detections
            .iter()
            .map(|det| {
                let track_id = det.identity();
                let points: Vec<Point> = history.history_of(track_id).collect();
                let trail = points
                    .windows(2)
                    .enumerate()
                    .map(|(i, w)| TrailSegment {
                        from: w[0],
                        to: w[1],
                        thickness: trail_thickness(i + 1, history.capacity()),
                    })
                    .collect();

                let mut label = format!("{}:{}", track_id, det.class_label);
                if let Some(speed) = session.engine().average_speed(track_id) {
                    label.push_str(&format!(" {}km/h", speed));
                }

                TrackOverlay {
                    track_id,
                    label,
                    anchor: Point::new(det.bbox.x1, det.bbox.y1),
                    color: det.class_label.color(),
                    trail,
                }
            })
            .collect();

        let crossing = session.registry().crossing();
        let crossing_flash = flashed_now(highlight.crossing_frame);
        let lane_flash = |lane: &LaneBoundary| match highlight.lane {
            Some((index, at)) => index == lane.index && at == frame.frame_id,
            None => false,
        };

        let ledger = session.ledger();
        let counts = |direction: FlowDirection| -> Vec<String> {
            ledger
                .classes(direction)
                .into_iter()
                .map(|(class, count)| format!("{}:{}", class, count))
                .collect()
        };

        Self {
            frame_id: frame.frame_id,
            tracks,
            crossing: BoundaryOverlay {
                start: crossing.start,
                end: crossing.end,
                color: if crossing_flash { FLASH_COLOR } else { crossing.color },
                flashing: crossing_flash,
            },
            lanes: session
                .registry()
                .lanes()
                .iter()
                .map(|lane| {
                    let flashing = lane_flash(lane);
                    BoundaryOverlay {
                        start: lane.start,
                        end: lane.end,
                        color: if flashing { FLASH_COLOR } else { lane.color },
                        flashing,
                    }
                })
                .collect(),
            entering: counts(FlowDirection::In),
            leaving: counts(FlowDirection::Out),
        }
    }
}
