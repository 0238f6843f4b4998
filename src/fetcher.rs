//! Single-page fetching against the search API
//!
//! [`HttpPageFetcher`] performs exactly one read-only request per call and
//! never touches session state; the pagination driver owns all of that. The
//! [`PageFetch`] trait is the seam that lets driver tests inject scripted
//! pages instead of a live server.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Cursor, LogEntry};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

/// One parsed page of search results
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// Messages on this page, in API order
    pub messages: Vec<LogEntry>,
    /// Total match count reported by the API (0 when unreported)
    pub total: u64,
    /// Continuation token carried by the trailing message, if any.
    /// Absent means the API has reached the end of the history.
    pub next_cursor: Option<Cursor>,
}

/// Fetches one page of results for (username, end-date, cursor).
///
/// Implementations must be side-effect free beyond the network call itself.
#[async_trait]
pub trait PageFetch: Send + Sync {
    /// Fetch a single page. `cursor` is absent for the first page.
    async fn fetch_page(
        &self,
        username: &str,
        end_date: NaiveDate,
        cursor: Option<&Cursor>,
    ) -> Result<Page>;
}

/// Raw response envelope: `{ "data": { "messages": [...], "total": n } }`
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    data: SearchData,
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(default)]
    messages: Option<Vec<RawMessage>>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    ts: String,
    text: String,
    #[serde(rename = "searchAfter", default)]
    search_after: Option<Cursor>,
}

/// HTTP implementation of [`PageFetch`] backed by a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    search_url: url::Url,
    channel: String,
    start_date: NaiveDate,
}

impl HttpPageFetcher {
    /// Build a fetcher from the given configuration.
    ///
    /// Validates the base URL and constructs the HTTP client with the
    /// configured request timeout.
    pub fn new(config: &Config) -> Result<Self> {
        let base = url::Url::parse(&config.api_base_url).map_err(|e| Error::Config {
            message: format!("invalid API base URL: {e}"),
            key: Some("api_base_url".to_string()),
        })?;
        let search_url = base.join("anon/search").map_err(|e| Error::Config {
            message: format!("cannot derive search endpoint: {e}"),
            key: Some("api_base_url".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            search_url,
            channel: config.channel.clone(),
            start_date: config.start_date,
        })
    }
}

#[async_trait]
impl PageFetch for HttpPageFetcher {
    async fn fetch_page(
        &self,
        username: &str,
        end_date: NaiveDate,
        cursor: Option<&Cursor>,
    ) -> Result<Page> {
        let search_after = cursor.map_or_else(|| "0".to_string(), ToString::to_string);

        let response = self
            .client
            .get(self.search_url.clone())
            .query(&[
                ("start_date", self.start_date.to_string().as_str()),
                ("end_date", end_date.to_string().as_str()),
                ("channel", self.channel.as_str()),
                ("username", username),
                ("search_after", search_after.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let envelope: SearchEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::ParseFailed(e.to_string()))?;

        let raw = envelope.data.messages.unwrap_or_default();
        let total = envelope.data.total.unwrap_or(0);
        let next_cursor = raw.last().and_then(|m| m.search_after.clone());
        let messages = raw
            .into_iter()
            .map(|m| LogEntry {
                ts: m.ts,
                text: m.text,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            username,
            page_len = messages.len(),
            total,
            has_next = next_cursor.is_some(),
            "Fetched search page"
        );

        Ok(Page {
            messages,
            total,
            next_cursor,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> HttpPageFetcher {
        let config = Config {
            api_base_url: server.uri(),
            ..Default::default()
        };
        HttpPageFetcher::new(&config).unwrap()
    }

    fn end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn parses_messages_total_and_trailing_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"messages":[
                    {"ts":"2024-01-01T10:00:00Z","text":"first","searchAfter":1700000000001},
                    {"ts":"2024-01-01T10:01:00Z","text":"second","searchAfter":1700000000002}
                ],"total":5}}"#,
            ))
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap();

        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].text, "first");
        assert_eq!(page.total, 5);
        assert_eq!(page.next_cursor, Some(Cursor::new("1700000000002")));
    }

    #[tokio::test]
    async fn first_page_sends_search_after_zero_and_fixed_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .and(query_param("search_after", "0"))
            .and(query_param("start_date", "2010-01-01"))
            .and(query_param("end_date", "2024-06-01"))
            .and(query_param("channel", "Destinygg"))
            .and(query_param("username", "alice"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"data":{"messages":[],"total":0}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap();
        assert!(page.messages.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn later_pages_send_the_cursor_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .and(query_param("search_after", "1700000000042"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"data":{"messages":[]}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cursor = Cursor::new("1700000000042");
        fetcher_for(&server)
            .fetch_page("alice", end_date(), Some(&cursor))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited));
    }

    #[tokio::test]
    async fn non_success_status_maps_to_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestFailed { status: 503 }));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_parse_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParseFailed(_)));
    }

    #[tokio::test]
    async fn missing_messages_and_total_default_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":{}}"#))
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.total, 0);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn page_with_data_but_no_trailing_cursor_has_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anon/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"messages":[{"ts":"t1","text":"last words"}],"total":3}}"#,
            ))
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page("alice", end_date(), None)
            .await
            .unwrap();
        assert_eq!(page.messages.len(), 1);
        assert!(page.next_cursor.is_none());
    }
}
