// src/pipeline/mod.rs

pub mod event_bus;
pub mod frame_context;
pub mod metrics;

pub use event_bus::{EventBus, SessionEvent};
pub use frame_context::FrameContext;
pub use metrics::{MetricsSummary, SessionMetrics};
