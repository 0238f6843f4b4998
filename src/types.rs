//! Core types for chatlog-dl

use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// One chat message as returned by the search API.
///
/// Immutable once fetched; buffer order is the order the API returned it in
/// (ascending by server-side cursor, not necessarily by timestamp).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Message timestamp, verbatim from the API
    pub ts: String,
    /// Message text
    pub text: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ts, self.text)
    }
}

/// Opaque pagination cursor (`searchAfter` in the response envelope).
///
/// The API emits it as a JSON number today, but the crate never parses or
/// reconstructs it: whatever scalar arrives is carried verbatim into the
/// next request's `search_after` query parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw cursor value
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CursorVisitor;

        impl Visitor<'_> for CursorVisitor {
            type Value = Cursor;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a string or number cursor token")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Cursor, E> {
                Ok(Cursor(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Cursor, E> {
                Ok(Cursor(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Cursor, E> {
                Ok(Cursor(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Cursor, E> {
                Ok(Cursor(v.to_string()))
            }
        }

        deserializer.deserialize_any(CursorVisitor)
    }
}

/// One line of the live session buffer.
///
/// Chat messages and cosmetic status notices share the live display, but
/// only `Entry` lines ever reach an export. Keeping the distinction in the
/// type (rather than matching on line text) is what guarantees that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogLine {
    /// A fetched chat message
    Entry(LogEntry),
    /// A cosmetic status line (progress count, rate-limit notice,
    /// completion summary) shown live but excluded from exports
    Notice(String),
}

impl LogLine {
    /// True for cosmetic status lines
    pub fn is_cosmetic(&self) -> bool {
        matches!(self, LogLine::Notice(_))
    }

    /// Render the line as it appears in the live log list
    pub fn render(&self) -> String {
        match self {
            LogLine::Entry(entry) => entry.to_string(),
            LogLine::Notice(text) => text.clone(),
        }
    }
}

/// Lifecycle state of a scrape session.
///
/// `Idle` exists only before the first `start`; every other non-`Running`
/// state is terminal for its session. A fresh `start` is permitted from
/// `Idle` or any terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session has run yet
    #[default]
    Idle,
    /// A session is actively paginating
    Running,
    /// The API was exhausted; the full history was retrieved
    Completed,
    /// The API answered 429; the session stopped without retrying
    RateLimited,
    /// A request or parse failure ended the session
    Failed,
    /// The caller cancelled the session mid-chain
    Cancelled,
}

impl SessionState {
    /// True while the driver task is paginating
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    /// True once the session has ended and a new one may start
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::RateLimited
                | SessionState::Failed
                | SessionState::Cancelled
        )
    }
}

/// Events broadcast to subscribers as a session progresses.
///
/// Sent on a `tokio::sync::broadcast` channel; lagging subscribers lose
/// events but never block the driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new session started
    Started {
        /// Username being scraped
        username: String,
    },

    /// One page was fetched and appended
    PageScraped {
        /// LogEntry count in the buffer so far
        entries: usize,
        /// Progress percentage (0-99 until completion)
        progress: u8,
    },

    /// The session completed; the full history is in the buffer
    Completed {
        /// Final LogEntry count
        entries: usize,
    },

    /// The session stopped because the API rate-limited the caller
    RateLimited,

    /// The session stopped on a request or parse failure
    Failed {
        /// Human-readable failure detail
        error: String,
    },

    /// The session was cancelled by the caller
    Cancelled {
        /// LogEntry count retained in the buffer
        entries: usize,
    },
}

/// Read-only view of the current session for presentation layers.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    /// Username the session is (or was) scraping
    pub username: String,
    /// End-date cutoff, truncated to day
    pub end_date: NaiveDate,
    /// Rendered log lines, cosmetic notices included
    pub lines: Vec<String>,
    /// Number of LogEntry records in the buffer (cosmetic lines excluded)
    pub entry_count: usize,
    /// Progress percentage, 0-100
    pub progress: u8,
    /// Current lifecycle state
    pub state: SessionState,
    /// Total estimate reported by the API, once known
    pub total_estimate: Option<u64>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_renders_timestamp_then_text() {
        let entry = LogEntry {
            ts: "2024-01-01T10:00:00Z".into(),
            text: "hello chat".into(),
        };
        assert_eq!(entry.to_string(), "2024-01-01T10:00:00Z hello chat");
    }

    #[test]
    fn cursor_deserializes_from_number() {
        let cursor: Cursor = serde_json::from_str("1700000000123").unwrap();
        assert_eq!(cursor.as_str(), "1700000000123");
    }

    #[test]
    fn cursor_deserializes_from_string() {
        let cursor: Cursor = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(cursor.as_str(), "abc123");
    }

    #[test]
    fn cursor_roundtrips_verbatim_into_display() {
        let cursor = Cursor::new("1700000000123");
        assert_eq!(cursor.to_string(), "1700000000123");
    }

    #[test]
    fn notice_lines_are_cosmetic_entry_lines_are_not() {
        let notice = LogLine::Notice("5 logs scraped".into());
        let entry = LogLine::Entry(LogEntry {
            ts: "t".into(),
            text: "x".into(),
        });

        assert!(notice.is_cosmetic());
        assert!(!entry.is_cosmetic());
    }

    #[test]
    fn terminal_states_are_exactly_the_four_end_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Running.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::RateLimited.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
    }

    #[test]
    fn only_running_reports_is_running() {
        assert!(SessionState::Running.is_running());
        assert!(!SessionState::Idle.is_running());
        assert!(!SessionState::Completed.is_running());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::PageScraped {
            entries: 42,
            progress: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "page_scraped");
        assert_eq!(json["entries"], 42);
    }
}
