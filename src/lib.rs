// src/lib.rs

pub mod config;
pub mod counting_ledger;
pub mod crossing_engine;
pub mod error;
pub mod event_log;
pub mod frame_source;
pub mod geometry;
pub mod lane_registry;
pub mod overlay;
pub mod pipeline;
pub mod session;
pub mod track_history;
pub mod types;

pub use counting_ledger::{CountingLedger, LedgerSummary};
pub use crossing_engine::{CrossingEngine, CrossingEvent, EngineConfig};
pub use error::{CountError, Result};
pub use frame_source::FrameSource;
pub use geometry::{classify_direction, estimate_speed, segment_crosses_lane, segments_intersect, FlowDirection};
pub use lane_registry::LaneRegistry;
pub use overlay::OverlaySnapshot;
pub use pipeline::FrameContext;
pub use session::CountingSession;
pub use track_history::TrackHistoryStore;
pub use types::{BoundingBox, ClassLabel, Config, Detection, Point};
