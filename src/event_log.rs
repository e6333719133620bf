// src/event_log.rs
//
// Durable record of counted crossings: one human-readable line per event,
// appended at record time. The file is truncated when a session opens it.

use crate::crossing_engine::CrossingEvent;
use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct EventLog {
    writer: BufWriter<File>,
    path: PathBuf,
    lines_written: u64,
}

impl EventLog {
    /// Clears (or creates) the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        info!("💾 Crossing events will be written to: {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            lines_written: 0,
        })
    }

    /// Appends one line and flushes so the file is current after every event.
    pub fn append(&mut self, event: &CrossingEvent) -> Result<()> {
        writeln!(self.writer, "{}", format_line(event))?;
        self.writer.flush()?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

pub fn format_line(event: &CrossingEvent) -> String {
    format!(
        "Object ID: {}, Velocity: {} km/h, Direction: {}, Lane: {}, Label: {}",
        event.track_id, event.speed_kmh, event.direction, event.lane_index, event.class_label
    )
}
