//! Recently played tracks.
//!
//! Newest first, one entry per source. The file rides along in the
//! cache root and is allowed to be stale or absent; losing it only
//! loses the resume positions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub source: PathBuf,
    /// Seconds into the track when playback left it.
    pub position: f64,
    pub duration: Option<f64>,
}

pub struct History {
    entries: Vec<HistoryEntry>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Remember where playback left `source`. Re-recording a source
    /// moves it to the front instead of duplicating it.
    pub fn record(&mut self, source: &Path, position: f64, duration: Option<f64>) {
        self.entries.retain(|e| e.source.as_path() != source);
        self.entries.insert(
            0,
            HistoryEntry {
                source: source.to_path_buf(),
                position,
                duration,
            },
        );
        self.entries.truncate(self.limit);
    }

    pub fn resume_position(&self, source: &Path) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.source.as_path() == source)
            .map(|e| e.position)
    }

    /// Read the history file. Absent or unreadable files start a fresh
    /// history rather than failing startup.
    pub fn load(path: &Path, limit: usize) -> Self {
        let mut history = Self::new(limit);
        if !path.exists() {
            return history;
        }
        match read_entries(path) {
            Ok(mut entries) => {
                entries.truncate(limit);
                history.entries = entries;
            }
            Err(e) => warn!("ignoring history at {}: {e}", path.display()),
        }
        history
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}
