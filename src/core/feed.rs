//! Report feed exported by the report store.
//!
//! The store appends one JSON record per line:
//!
//! ```text
//! {"op": "create", "report": { ...DisasterReport... }}
//! {"op": "update", "report": { ...DisasterReport... }}
//! {"op": "delete", "id": "..."}
//! ```
//!
//! `FeedTailer` follows the file and hands back complete lines only, so a record
//! that is still being written is picked up on a later read.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::model::{DisasterReport, ReportId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FeedRecord {
    Create { report: DisasterReport },
    Update { report: DisasterReport },
    Delete { id: ReportId },
}

/// Parse one feed line. Blank lines yield `None`.
pub fn parse_record(line: &str) -> Option<serde_json::Result<FeedRecord>> {
    let trimmed = line.trim().trim_start_matches('\u{feff}');
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

/// Lines returned by one `FeedTailer::read_new_lines` call.
#[derive(Debug, Default, PartialEq)]
pub struct FeedBatch {
    pub lines: Vec<String>,
    /// The file shrank, so `lines` were reread from the start of the feed.
    pub restarted: bool,
}

pub struct FeedTailer {
    file: File,
    position: u64,
    path: PathBuf,
}

impl FeedTailer {
    /// Open the feed and read it from the beginning.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_at(path, 0)
    }

    /// Open the feed and continue from a byte offset returned by `position`.
    pub fn open_at(path: impl AsRef<Path>, position: u64) -> io::Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)?;
        Ok(Self {
            file,
            position,
            path: path_ref.to_path_buf(),
        })
    }

    /// Open the feed and only follow records appended from now on.
    pub fn open_at_end(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut tailer = Self::open(path)?;
        tailer.position = tailer.file.metadata()?.len();
        Ok(tailer)
    }

    /// Complete lines appended since the last call. On error nothing is
    /// consumed and the next call reads the same lines again.
    pub fn read_new_lines(&mut self) -> io::Result<FeedBatch> {
        let mut batch = FeedBatch::default();
        let mut position = self.position;

        // Truncated or replaced by a shorter file: start over
        if self.file.metadata()?.len() < position {
            log::warn!("Feed {:?} shrank, rereading from start", self.path);
            position = 0;
            batch.restarted = true;
        }

        self.file.seek(SeekFrom::Start(position))?;
        let mut reader = BufReader::new(&self.file);
        let mut buffer = String::new();

        loop {
            buffer.clear();
            let bytes_read = reader.read_line(&mut buffer)?;
            if bytes_read == 0 || !buffer.ends_with('\n') {
                break;
            }
            position += bytes_read as u64;
            let line = buffer.trim_end_matches(&['\r', '\n'][..]).to_string();
            batch.lines.push(line);
        }

        self.position = position;
        Ok(batch)
    }

    /// Byte offset just past the last complete line handed out.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
