//! Collaborator traits consumed by the pipeline core.
//!
//! Implementations live in `storage` (Redis) and `adapters` (GitHub,
//! model APIs, calendar, scraping); handlers receive trait objects so tests
//! can substitute doubles.

use async_trait::async_trait;
use chrono::NaiveDate;
use errors::DigestResult;

use crate::types::{CalendarEvent, Page, RecentNotes};

/// Keyed, TTL-bounded hash store used as the fan-in rendezvous buffer.
///
/// Fields are written by independent summarizer invocations and read back in
/// bulk by the aggregator. Writers never conflict (each item owns one field)
/// and rewriting a field on redelivery is harmless.
#[async_trait]
pub trait PartialResultStore: Send + Sync {
    /// Upsert one field at `key`, then reset the key's TTL to the retention
    /// window. Refreshing on every write keeps the rendezvous open while
    /// items are still arriving.
    async fn write_field(&self, key: &str, field: &str, value: &str) -> DigestResult<()>;

    /// Full field/value listing at `key`; absent or expired keys yield an
    /// empty listing.
    async fn read_all(&self, key: &str) -> DigestResult<Vec<(String, String)>>;
}

/// Note-storage backend: source of recent material, sink for the digest.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn recent_notes(&self) -> DigestResult<RecentNotes>;

    /// Create or update `filename` (optionally under `folder`) with the
    /// rendered digest.
    async fn put_document(
        &self,
        filename: &str,
        folder: Option<&str>,
        content: &str,
    ) -> DigestResult<()>;
}

/// Opaque completion API used for per-item summaries and final synthesis.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one user prompt, return the first text segment of the response
    /// trimmed. An empty response is `DigestError::EmptyModelResponse`.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> DigestResult<String>;
}

/// Model-based filter that discards generic/redirect/shortened links.
#[async_trait]
pub trait UrlClassifier: Send + Sync {
    async fn useful_urls(&self, urls: &[String]) -> DigestResult<Vec<String>>;
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn days_events(&self, date: NaiveDate) -> DigestResult<Vec<CalendarEvent>>;
}

/// Fetches a URL and reduces it to title + readable text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> DigestResult<Page>;
}
