//! # chatlog-dl
//!
//! Backend library for scraping a user's complete chat history from the
//! rustlesearch paginated search API and exporting it as a plain-text
//! transcript.
//!
//! ## Design Philosophy
//!
//! chatlog-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sequential by contract** - Pages are causally chained through an
//!   opaque cursor, so requests never overlap within a session
//! - **Event-driven** - Consumers subscribe to session events or poll
//!   snapshot getters, whichever fits their UI
//! - **Sensible defaults** - `Config::default()` targets the public API
//!
//! ## Quick Start
//!
//! ```no_run
//! use chatlog_dl::{Config, Event, LogScraper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scraper = LogScraper::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = scraper.subscribe();
//!     scraper.start("alice", 1_717_200_000).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!         if matches!(
//!             event,
//!             Event::Completed { .. } | Event::RateLimited | Event::Failed { .. }
//!         ) {
//!             break;
//!         }
//!     }
//!
//!     if let Some(export) = scraper.export().await {
//!         export.write_to(std::path::Path::new("."))?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Plain-text export of the session buffer
pub mod export;
/// Single-page fetching against the search API
pub mod fetcher;
/// Pagination driver state machine
pub mod scraper;
/// Session state owned by the pagination driver
pub mod session;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use export::Export;
pub use fetcher::{HttpPageFetcher, Page, PageFetch};
pub use scraper::LogScraper;
pub use session::ScrapeSession;
pub use types::{Cursor, Event, LogEntry, LogLine, SessionSnapshot, SessionState};
