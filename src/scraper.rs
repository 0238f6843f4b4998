//! Pagination driver — the scrape session state machine
//!
//! [`LogScraper`] owns the session and drives the page fetcher in a single
//! spawned task: fetch, decide, throttle, repeat. Requests are strictly
//! sequential because each page's cursor comes from the previous response;
//! running two pages concurrently would corrupt the chain, so the loop is
//! the concurrency model, not a limitation of it.
//!
//! The handle is cheap to clone (all fields Arc-wrapped) and every state
//! transition is broadcast to subscribers.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::Export;
use crate::fetcher::{HttpPageFetcher, PageFetch};
use crate::session::ScrapeSession;
use crate::types::{Event, SessionSnapshot, SessionState};
use chrono::DateTime;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

/// Drives the paginated scrape for one username at a time.
///
/// At most one session is `Running` per scraper instance (clones share the
/// same session, so they share the guard; independently constructed
/// scrapers each enforce their own). A `start` call while one is running
/// is an idempotent no-op. Terminal sessions keep their buffer so it can
/// still be exported.
#[derive(Clone)]
pub struct LogScraper {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetch>,
    session: Arc<Mutex<Option<ScrapeSession>>>,
    cancel: Arc<Mutex<CancellationToken>>,
    event_tx: broadcast::Sender<Event>,
}

impl LogScraper {
    /// Create a scraper talking to the live search API.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpPageFetcher::new(&config)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a scraper with a custom page fetcher.
    ///
    /// This is the seam used by tests and by consumers that front the API
    /// with their own transport.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetch>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(config.event_buffer_size);
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            session: Arc::new(Mutex::new(None)),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            event_tx,
        })
    }

    /// Subscribe to session events.
    ///
    /// Lagging subscribers lose events; the driver never blocks on them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Start scraping `username` up to `end_timestamp` (Unix seconds,
    /// truncated to day).
    ///
    /// Returns `Ok(true)` when a new session was started, `Ok(false)` when
    /// one is already running (the running session is left untouched).
    /// Empty usernames and out-of-range timestamps are rejected before any
    /// session is created.
    pub async fn start(&self, username: &str, end_timestamp: i64) -> Result<bool> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".into()));
        }
        let end_date = DateTime::from_timestamp(end_timestamp, 0)
            .ok_or_else(|| Error::InvalidInput(format!("end timestamp out of range: {end_timestamp}")))?
            .date_naive();

        let token = CancellationToken::new();
        {
            let mut session = self.session.lock().await;
            if session.as_ref().is_some_and(|s| s.state().is_running()) {
                tracing::warn!(username, "Ignoring start: a session is already running");
                return Ok(false);
            }

            *session = Some(ScrapeSession::new(username, end_date));
            // The Running state and the live token must become visible
            // together: install the token before releasing the session
            // lock. cancel() takes the same locks in the same order.
            *self.cancel.lock().await = token.clone();
        }

        tracing::info!(username, %end_date, "Starting scrape session");
        let _ = self.event_tx.send(Event::Started {
            username: username.to_string(),
        });

        let driver = self.clone();
        tokio::spawn(driver.run(token));
        Ok(true)
    }

    /// Cancel the running session, if any.
    ///
    /// Returns `true` when a running session was signalled. The terminal
    /// transition happens on the driver task; already-fetched entries stay
    /// in the buffer.
    pub async fn cancel(&self) -> bool {
        // Hold the session lock across the token trip so the token
        // cancelled is the one belonging to the session observed as
        // Running. Lock order matches start(): session, then token.
        let session = self.session.lock().await;
        let running = session.as_ref().is_some_and(|s| s.state().is_running());
        if running {
            self.cancel.lock().await.cancel();
        }
        running
    }

    /// Current lifecycle state (`Idle` before the first start).
    pub async fn state(&self) -> SessionState {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(SessionState::Idle, ScrapeSession::state)
    }

    /// True while a session is paginating.
    pub async fn is_running(&self) -> bool {
        self.state().await.is_running()
    }

    /// Progress percentage, 0-100.
    pub async fn progress(&self) -> u8 {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(0, ScrapeSession::progress)
    }

    /// Rendered log lines for live display, cosmetic notices included.
    pub async fn logs(&self) -> Vec<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or_else(Vec::new, |s| s.lines().iter().map(|l| l.render()).collect())
    }

    /// Read-only view of the current session, `None` before the first start.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.session.lock().await.as_ref().map(ScrapeSession::snapshot)
    }

    /// Build a plain-text export of the current buffer.
    ///
    /// Returns `None` when no entries have been fetched. Callers are
    /// expected to export only after the session has terminated; the
    /// builder itself just reads whatever buffer exists.
    pub async fn export(&self) -> Option<Export> {
        let session = self.session.lock().await;
        session
            .as_ref()
            .and_then(|s| Export::build(s.username(), s.lines()))
    }

    /// The sequential fetch-then-decide loop. One instance per session.
    async fn run(self, cancel: CancellationToken) {
        let mut pages = 0_usize;
        loop {
            let (username, end_date, cursor) = {
                let session = self.session.lock().await;
                let Some(session) = session.as_ref() else {
                    return;
                };
                (
                    session.username().to_string(),
                    session.end_date(),
                    session.cursor().cloned(),
                )
            };

            let fetched = tokio::select! {
                () = cancel.cancelled() => {
                    self.finish_cancelled().await;
                    return;
                }
                result = self.fetcher.fetch_page(&username, end_date, cursor.as_ref()) => result,
            };

            match fetched {
                Err(Error::RateLimited) => {
                    let mut session = self.session.lock().await;
                    if let Some(session) = session.as_mut() {
                        session.rate_limit();
                    }
                    drop(session);
                    tracing::warn!(username, pages, "Scrape stopped: rate limited");
                    let _ = self.event_tx.send(Event::RateLimited);
                    return;
                }
                Err(err) => {
                    let detail = err.to_string();
                    let mut session = self.session.lock().await;
                    if let Some(session) = session.as_mut() {
                        session.fail(&detail);
                    }
                    drop(session);
                    tracing::error!(username, pages, error = %detail, "Scrape failed");
                    let _ = self.event_tx.send(Event::Failed { error: detail });
                    return;
                }
                Ok(page) => {
                    pages += 1;
                    let empty = page.messages.is_empty();
                    let exhausted = empty || page.next_cursor.is_none();

                    let mut session = self.session.lock().await;
                    let Some(session) = session.as_mut() else {
                        return;
                    };
                    session.apply_page(page.messages, page.total, page.next_cursor);

                    if exhausted {
                        session.complete();
                        let entries = session.entry_count();
                        tracing::info!(username, pages, entries, "Scrape complete");
                        let _ = self.event_tx.send(Event::Completed { entries });
                        return;
                    }

                    session.push_progress_notice();
                    let _ = self.event_tx.send(Event::PageScraped {
                        entries: session.entry_count(),
                        progress: session.progress(),
                    });
                }
            }

            // Throttle between causally-chained requests; skipping it tends
            // to turn the whole run into a 429.
            tokio::select! {
                () = cancel.cancelled() => {
                    self.finish_cancelled().await;
                    return;
                }
                () = tokio::time::sleep(self.config.page_delay) => {}
            }
        }
    }

    async fn finish_cancelled(&self) {
        let mut session = self.session.lock().await;
        let Some(session) = session.as_mut() else {
            return;
        };
        if !session.state().is_running() {
            return;
        }
        session.cancel();
        let entries = session.entry_count();
        tracing::info!(username = session.username(), entries, "Scrape cancelled");
        let _ = self.event_tx.send(Event::Cancelled { entries });
    }
}
