//! Configuration for chatlog-dl

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scraper configuration
///
/// Works out of the box with `Config::default()`, which targets the public
/// rustlesearch API and its Destinygg channel index. Call [`Config::validate`]
/// after constructing one by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the search API (default: "https://api-v2.rustlesearch.dev")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Channel whose logs are searched (default: "Destinygg")
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Lower bound of the search window (default: 2010-01-01, predates the
    /// channel's oldest logs so the window is effectively unbounded below)
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Fixed delay between page requests (default: 300 ms)
    ///
    /// A deliberate throttle; dropping it tends to flip every run into the
    /// rate-limited terminal state.
    #[serde(default = "default_page_delay", with = "duration_millis")]
    pub page_delay: Duration,

    /// Per-request HTTP timeout (default: 30 s)
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,

    /// Capacity of the broadcast event channel (default: 1000)
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

fn default_api_base_url() -> String {
    "https://api-v2.rustlesearch.dev".to_string()
}

fn default_channel() -> String {
    "Destinygg".to_string()
}

fn default_start_date() -> NaiveDate {
    // Guaranteed-valid constant date
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
}

fn default_page_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_event_buffer_size() -> usize {
    1000
}

/// Serialize durations as integer milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            channel: default_channel(),
            start_date: default_start_date(),
            page_delay: default_page_delay(),
            request_timeout: default_request_timeout(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl Config {
    /// Validate the configuration, returning a [`Error::Config`] naming the
    /// offending key on failure.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_base_url).map_err(|e| Error::Config {
            message: format!("invalid API base URL: {e}"),
            key: Some("api_base_url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported URL scheme: {}", parsed.scheme()),
                key: Some("api_base_url".to_string()),
            });
        }

        if self.channel.trim().is_empty() {
            return Err(Error::Config {
                message: "channel must not be empty".to_string(),
                key: Some("channel".to_string()),
            });
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config {
                message: "event buffer size must be at least 1".to_string(),
                key: Some("event_buffer_size".to_string()),
            });
        }

        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn default_targets_rustlesearch() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "https://api-v2.rustlesearch.dev");
        assert_eq!(config.channel, "Destinygg");
        assert_eq!(config.start_date.to_string(), "2010-01-01");
        assert_eq!(config.page_delay, Duration::from_millis(300));
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(k), .. } if k == "api_base_url"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let config = Config {
            api_base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_channel_is_rejected() {
        let config = Config {
            channel: "  ".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(k), .. } if k == "channel"));
    }

    #[test]
    fn zero_event_buffer_is_rejected() {
        let config = Config {
            event_buffer_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.api_base_url, config.api_base_url);
        assert_eq!(back.page_delay, config.page_delay);
    }
}
