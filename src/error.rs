// src/error.rs

use crate::types::Point;
use thiserror::Error;

/// Errors raised by the counting engine and its configuration.
#[derive(Error, Debug)]
pub enum CountError {
    /// A lane boundary is not horizontal (within the configured tilt tolerance).
    #[error("invalid geometry for lane {lane}: {start} -> {end} is not horizontal")]
    InvalidGeometry { lane: usize, start: Point, end: Point },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("detection stream line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CountError>;
