// src/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub calibration: CalibrationConfig,
    pub lanes: LaneConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Append-only crossing log, truncated when a session starts
    pub event_log_path: String,
    /// Points retained per track (most recent first)
    pub history_capacity: usize,
    /// Suppress repeat counts for a track until it is evicted
    pub count_once_per_track: bool,
    pub event_bus_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_log_path: "data.txt".to_string(),
            history_capacity: 64,
            count_once_per_track: false,
            event_bus_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub pixels_per_meter: f64,
    /// Per-frame-interval to km/h factor (15 * 3.6)
    pub time_constant: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: crate::geometry::PIXELS_PER_METER,
            time_constant: crate::geometry::TIME_CONSTANT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub frame_width: i32,
    pub frame_height: i32,
    /// Explicit crossing boundary; derived from the frame size when absent
    pub crossing: Option<SegmentConfig>,
    /// Maximum |dy| between a lane's endpoints still accepted as horizontal
    pub tilt_tolerance_px: i32,
    pub boundaries: Vec<LaneBoundaryConfig>,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            frame_width: 1280,
            frame_height: 720,
            crossing: None,
            tilt_tolerance_px: 10,
            boundaries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub start: Point,
    pub end: Point,
}

/// A lane either as two explicit endpoints or as the adjustment tool's
/// `start_x` / `width` / `y` triple.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaneGeometry {
    Segment { start: Point, end: Point },
    Span { start_x: i32, width: i32, y: i32 },
}

impl LaneGeometry {
    pub fn endpoints(&self) -> (Point, Point) {
        match *self {
            Self::Segment { start, end } => (start, end),
            Self::Span { start_x, width, y } => (Point::new(start_x, y), Point::new(start_x + width, y)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneBoundaryConfig {
    #[serde(flatten)]
    pub geometry: LaneGeometry,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<Rgb>,
    /// Expected traffic direction for this lane, if any
    #[serde(default)]
    pub flow: Option<crate::geometry::FlowDirection>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "lane_counter=info".to_string(),
        }
    }
}

// ============================================================================
// GEOMETRY PRIMITIVES
// ============================================================================

/// Integer pixel coordinate. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Display color, RGB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// `[x1, y1, x2, y2]` in frame pixels. Fractional detector output is
/// truncated toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Track position sample for this box.
    ///
    /// The vertical component averages `y2` with itself, i.e. it is the
    /// bottom edge rather than the box center. Direction and crossing
    /// geometry are calibrated against this point, so it stays as is.
    pub fn bottom_center(&self) -> Point {
        let x = (self.x1 as i64 + self.x2 as i64) / 2;
        let y = (self.y2 as i64 + self.y2 as i64) / 2;
        Point::new(x as i32, y as i32)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(b: [f32; 4]) -> Self {
        Self::new(b[0] as i32, b[1] as i32, b[2] as i32, b[3] as i32)
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

/// Object class reported by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClassLabel {
    Person,
    Bicycle,
    Car,
    Motorcycle,
    Bus,
    Train,
    Truck,
    /// Any label outside the known set, kept verbatim
    Other(String),
}

// Fixed overlay colors; every other class hashes into this palette.
const PALETTE: [u64; 3] = [(1 << 11) - 1, (1 << 15) - 1, (1 << 20) - 1];

impl ClassLabel {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "person" => Self::Person,
            "bicycle" => Self::Bicycle,
            "car" => Self::Car,
            "motorcycle" | "motorbike" => Self::Motorcycle,
            "bus" => Self::Bus,
            "train" => Self::Train,
            "truck" => Self::Truck,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// COCO class ids as emitted by YOLO-family detectors.
    pub fn from_coco_id(class_id: u32) -> Self {
        match class_id {
            0 => Self::Person,
            1 => Self::Bicycle,
            2 => Self::Car,
            3 => Self::Motorcycle,
            5 => Self::Bus,
            6 => Self::Train,
            7 => Self::Truck,
            other => Self::Other(format!("class_{}", other)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "person",
            Self::Bicycle => "bicycle",
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Truck => "truck",
            Self::Other(name) => name,
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            Self::Person => Rgb(85, 45, 255),
            Self::Car => Rgb(222, 82, 175),
            Self::Motorcycle => Rgb(0, 204, 255),
            Self::Bus => Rgb(0, 149, 255),
            other => {
                let h = fnv1a(other.as_str().as_bytes()) % 1024;
                let scale = h * h - h + 1;
                let channel = |p: u64| (p.wrapping_mul(scale) % 255) as u8;
                Rgb(channel(PALETTE[0]), channel(PALETTE[1]), channel(PALETTE[2]))
            }
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ *b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

impl From<String> for ClassLabel {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ClassLabel> for String {
    fn from(label: ClassLabel) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked detection for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Tracker identity; `None` while the tracker has not assigned one
    #[serde(default)]
    pub track_id: Option<u32>,
    pub bbox: BoundingBox,
    pub class_label: ClassLabel,
}

impl Detection {
    pub fn new(track_id: Option<u32>, bbox: BoundingBox, class_label: ClassLabel) -> Self {
        Self {
            track_id,
            bbox,
            class_label,
        }
    }

    /// Unidentified detections share identity 0.
    pub fn identity(&self) -> u32 {
        self.track_id.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bottom_center_uses_bottom_edge() {
        let bbox = BoundingBox::new(100, 200, 151, 300);
        assert_eq!(bbox.bottom_center(), Point::new(125, 300));
    }

    #[test]
    fn test_bottom_center_extreme_box() {
        let bbox: BoundingBox = [-3e9, 0.0, 3e9, 4e9].into();
        assert_eq!(bbox.x1, i32::MIN);
        assert_eq!(bbox.bottom_center(), Point::new(0, i32::MAX));

        let bbox = BoundingBox::new(i32::MAX - 1, 0, i32::MAX, i32::MAX);
        assert_eq!(bbox.bottom_center(), Point::new(i32::MAX - 1, i32::MAX));
    }

    #[test]
    fn test_class_label_parsing() {
        assert_eq!(ClassLabel::parse("Car"), ClassLabel::Car);
        assert_eq!(ClassLabel::parse("motorbike"), ClassLabel::Motorcycle);
        assert_eq!(ClassLabel::parse(" rickshaw "), ClassLabel::Other("rickshaw".into()));
        assert_eq!(ClassLabel::from_coco_id(7), ClassLabel::Truck);
        assert_eq!(ClassLabel::from_coco_id(4).as_str(), "class_4");
    }

    #[test]
    fn test_class_colors_are_deterministic() {
        assert_eq!(ClassLabel::Car.color(), Rgb(222, 82, 175));
        let a = ClassLabel::parse("rickshaw").color();
        let b = ClassLabel::parse("rickshaw").color();
        assert_eq!(a, b);
    }

    #[test]
    fn test_detection_deserializes_from_tracker_json() {
        let json = r#"{"track_id": null, "bbox": [10.7, 20.2, 30.9, 40.0], "class_label": "bus"}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.identity(), 0);
        assert_eq!(det.bbox, BoundingBox::new(10, 20, 30, 40));
        assert_eq!(det.class_label, ClassLabel::Bus);
    }

    #[test]
    fn test_lane_geometry_span_shorthand() {
        let lane: LaneBoundaryConfig =
            serde_yaml::from_str("start_x: 100\nwidth: 50\ny: 480\nflow: in\n").unwrap();
        assert!(lane.enabled);
        assert_eq!(
            lane.geometry.endpoints(),
            (Point::new(100, 480), Point::new(150, 480))
        );
    }
}
