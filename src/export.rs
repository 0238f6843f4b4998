//! Plain-text export of the session buffer
//!
//! An [`Export`] is just bytes plus a suggested filename; delivery is the
//! caller's concern. [`Export::write_to`] covers the common save-to-disk
//! case.

use crate::error::Result;
use crate::types::LogLine;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// A rendered transcript ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    /// Suggested filename: `<username>-logs-<UTC timestamp>.txt`
    pub filename: String,
    /// One line per chat message, buffer order, cosmetic notices excluded
    pub contents: String,
}

impl Export {
    /// Build an export from the session buffer.
    ///
    /// Only `LogLine::Entry` lines contribute; progress and sentinel
    /// notices never appear in the artifact. Returns `None` when the buffer
    /// holds no entries at all.
    pub fn build(username: &str, lines: &[LogLine]) -> Option<Self> {
        Self::build_at(username, lines, Utc::now())
    }

    fn build_at(username: &str, lines: &[LogLine], now: DateTime<Utc>) -> Option<Self> {
        let rendered = lines
            .iter()
            .filter(|line| !line.is_cosmetic())
            .map(LogLine::render)
            .collect::<Vec<_>>();
        if rendered.is_empty() {
            return None;
        }

        let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.3fZ");
        Some(Self {
            filename: format!("{username}-logs-{timestamp}.txt"),
            contents: rendered.join("\n"),
        })
    }

    /// Write the artifact into `dir` under its suggested filename and
    /// return the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.contents)?;
        tracing::info!(path = %path.display(), bytes = self.contents.len(), "Wrote log export");
        Ok(path)
    }
}
