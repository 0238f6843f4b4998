//! Session state owned by the pagination driver
//!
//! A [`ScrapeSession`] is created on `start`, mutated by each successful
//! page, and frozen in a terminal state. The line buffer is strictly
//! append-only for the session's lifetime; it is retained after termination
//! so exports keep working, and replaced only by the next `start`.

use crate::types::{Cursor, LogEntry, LogLine, SessionSnapshot, SessionState};
use chrono::NaiveDate;

/// Notice appended when the API answers 429
pub(crate) const RATE_LIMIT_NOTICE: &str = "You are being rate limited, try again later";

/// One complete run of the pagination driver for a username/end-date pair.
#[derive(Clone, Debug)]
pub struct ScrapeSession {
    username: String,
    end_date: NaiveDate,
    lines: Vec<LogLine>,
    entry_count: usize,
    cursor: Option<Cursor>,
    total_estimate: Option<u64>,
    progress: u8,
    state: SessionState,
}

impl ScrapeSession {
    /// Create a fresh running session with an empty buffer.
    pub fn new(username: impl Into<String>, end_date: NaiveDate) -> Self {
        Self {
            username: username.into(),
            end_date,
            lines: Vec::new(),
            entry_count: 0,
            cursor: None,
            total_estimate: None,
            progress: 0,
            state: SessionState::Running,
        }
    }

    /// Username this session scrapes
    pub fn username(&self) -> &str {
        &self.username
    }

    /// End-date cutoff, truncated to day
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of LogEntry records in the buffer (cosmetic lines excluded)
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Progress percentage, 0-100
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Cursor to resume pagination from, absent before the first page
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Total estimate reported by the API, once known
    pub fn total_estimate(&self) -> Option<u64> {
        self.total_estimate
    }

    /// The full line buffer, cosmetic notices included
    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Apply one successful page: append every entry in order, replace the
    /// cursor, record the total (first positive value wins), and recompute
    /// the progress estimate, capped at 99 until completion.
    pub fn apply_page(&mut self, messages: Vec<LogEntry>, total: u64, next_cursor: Option<Cursor>) {
        for entry in messages {
            self.lines.push(LogLine::Entry(entry));
            self.entry_count += 1;
        }
        self.cursor = next_cursor;

        if self.total_estimate.is_none() && total > 0 {
            self.total_estimate = Some(total);
        }

        if let Some(total) = self.total_estimate {
            let percent = (self.entry_count as u64)
                .saturating_mul(100)
                .checked_div(total)
                .unwrap_or(0);
            self.progress = percent.min(99) as u8;
        }
    }

    /// Append the transient progress line shown between pages.
    /// Excluded from exports.
    pub fn push_progress_notice(&mut self) {
        self.lines
            .push(LogLine::Notice(format!("{} logs scraped", self.entry_count)));
    }

    /// Terminal transition: history exhausted.
    pub fn complete(&mut self) {
        self.lines.push(LogLine::Notice(format!(
            "Scraping complete: {} logs retrieved",
            self.entry_count
        )));
        self.progress = 100;
        self.state = SessionState::Completed;
    }

    /// Terminal transition: the API rate-limited the caller.
    pub fn rate_limit(&mut self) {
        self.lines.push(LogLine::Notice(RATE_LIMIT_NOTICE.to_string()));
        self.state = SessionState::RateLimited;
    }

    /// Terminal transition: unrecoverable request or parse failure.
    pub fn fail(&mut self, detail: &str) {
        self.lines.push(LogLine::Notice(format!("Error: {detail}")));
        self.state = SessionState::Failed;
    }

    /// Terminal transition: cancelled by the caller. Already-fetched
    /// entries stay in the buffer and remain exportable.
    pub fn cancel(&mut self) {
        self.lines.push(LogLine::Notice(format!(
            "Scraping cancelled: {} logs retrieved",
            self.entry_count
        )));
        self.state = SessionState::Cancelled;
    }

    /// Read-only view for presentation layers.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.clone(),
            end_date: self.end_date,
            lines: self.lines.iter().map(LogLine::render).collect(),
            entry_count: self.entry_count,
            progress: self.progress,
            state: self.state,
            total_estimate: self.total_estimate,
        }
    }
}
