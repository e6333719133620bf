// src/frame_source.rs
//
// Reads recorded tracker output: one FrameContext JSON object per line.
// Blank lines are skipped; a malformed line stops the stream with its line
// number.

use crate::error::{CountError, Result};
use crate::pipeline::FrameContext;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::info;

pub struct FrameSource<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
    frames_read: u64,
}

impl FrameSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("📂 Opening detection stream: {}", path.display());
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> FrameSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            frames_read: 0,
        }
    }

    /// Next frame, or `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<FrameContext>> {
        for line in self.lines.by_ref() {
            self.line_number += 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame: FrameContext = serde_json::from_str(trimmed).map_err(|source| CountError::Parse {
                line: self.line_number,
                source,
            })?;
            self.frames_read += 1;
            return Ok(Some(frame));
        }
        Ok(None)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl<R: BufRead> Iterator for FrameSource<R> {
    type Item = Result<FrameContext>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}
