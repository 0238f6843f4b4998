//! Error types for chatlog-dl
//!
//! Every failure the scraper can hit maps to one variant here. The driver
//! converts fetch/parse errors into a terminal session state plus a
//! human-readable log line; only input and configuration errors are returned
//! directly to the caller.

use thiserror::Error;

/// Result type alias for chatlog-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chatlog-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_base_url")
        key: Option<String>,
    },

    /// Invalid caller input, rejected before a session is created
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The remote API answered HTTP 429; the session must stop, not retry
    #[error("rate limited by the search API")]
    RateLimited,

    /// The remote API answered a non-2xx, non-429 status
    #[error("search request failed with HTTP status {status}")]
    RequestFailed {
        /// The HTTP status code returned by the API
        status: u16,
    },

    /// The response body did not match the expected search envelope
    #[error("failed to parse search response: {0}")]
    ParseFailed(String),

    /// Transport-level error (connection, timeout, TLS)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (export writing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that terminate a running session when they occur
    /// inside the fetch chain. Input and configuration errors never reach
    /// the chain, so they are not terminal in this sense.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::Config { .. } | Error::InvalidInput(_))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_distinct_from_request_failed() {
        let rate_limited = Error::RateLimited;
        let failed = Error::RequestFailed { status: 500 };

        assert!(matches!(rate_limited, Error::RateLimited));
        assert!(matches!(failed, Error::RequestFailed { status: 500 }));
    }

    #[test]
    fn request_failed_display_includes_status() {
        let err = Error::RequestFailed { status: 503 };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn parse_failed_display_includes_detail() {
        let err = Error::ParseFailed("missing field `data`".into());
        assert!(err.to_string().contains("missing field `data`"));
    }

    #[test]
    fn config_error_display_includes_message() {
        let err = Error::Config {
            message: "invalid URL".into(),
            key: Some("api_base_url".into()),
        };
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::other("disk fail");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn chain_errors_are_terminal_input_errors_are_not() {
        assert!(Error::RateLimited.is_terminal());
        assert!(Error::RequestFailed { status: 500 }.is_terminal());
        assert!(Error::ParseFailed("bad".into()).is_terminal());
        assert!(!Error::InvalidInput("empty username".into()).is_terminal());
        assert!(
            !Error::Config {
                message: "bad".into(),
                key: None,
            }
            .is_terminal()
        );
    }
}
