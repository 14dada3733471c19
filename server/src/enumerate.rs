//! Batch enumeration and fan-out.
//!
//! One run produces one rendezvous key set, one message per work item, and
//! exactly one aggregation message enqueued last on the same queue. The
//! "runs last" property is the queue's ordering, not a barrier.

use std::sync::LazyLock;

use dispatch::PublishOptions;
use dn_core::types::{DiffMessage, NoteMessage, QueueKeys, UrlMessage, routes};
use errors::DigestResult;
use regex::Regex;
use tracing::{debug, info};

use crate::app::AppState;
use crate::telemetry;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"')\]]+"#).unwrap());

#[derive(Debug, Default)]
pub struct EnumerationSummary {
    pub notes: usize,
    pub diffs: usize,
    pub urls: usize,
}

/// Every URL substring in free-form note text, duplicates kept; the
/// classifier decides what is worth scraping.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', '!', '?']).to_string())
        .collect()
}

pub async fn run(state: &AppState) -> DigestResult<EnumerationSummary> {
    let recent = state.notes.recent_notes().await?;

    let mut urls = Vec::new();
    for file in &recent.files {
        urls.extend(extract_urls(&file.body));
    }
    for diff in &recent.diffs {
        urls.extend(extract_urls(&diff.diff));
    }
    debug!(candidates = urls.len(), "urls extracted");

    let useful_urls = if urls.is_empty() {
        Vec::new()
    } else {
        state.classifier.useful_urls(&urls).await?
    };

    let keys = QueueKeys::generate(
        &state.config.dispatch.queue,
        chrono::Utc::now().date_naive(),
    );
    info!(
        notes_key = %keys.notes_key,
        urls_key = %keys.urls_key,
        "fanning out enumeration run"
    );
    let queue = PublishOptions::queue(&state.config.dispatch.queue);

    let mut summary = EnumerationSummary::default();
    for note in recent.files {
        let message = NoteMessage {
            note,
            keys: keys.clone(),
        };
        state
            .publisher
            .publish(routes::NOTE_SUMMARIZE, &message, &queue)
            .await?;
        telemetry::record_dispatch(routes::NOTE_SUMMARIZE);
        summary.notes += 1;
    }
    for diff in recent.diffs {
        let message = DiffMessage {
            diff,
            keys: keys.clone(),
        };
        state
            .publisher
            .publish(routes::DIFF_SUMMARIZE, &message, &queue)
            .await?;
        telemetry::record_dispatch(routes::DIFF_SUMMARIZE);
        summary.diffs += 1;
    }
    for url in useful_urls {
        let message = UrlMessage {
            url,
            keys: keys.clone(),
        };
        state
            .publisher
            .publish(routes::URL_SCRAPE, &message, &queue)
            .await?;
        telemetry::record_dispatch(routes::URL_SCRAPE);
        summary.urls += 1;
    }

    // Enqueued last on the same queue so it drains after the fan-out batch.
    state
        .publisher
        .publish(routes::DAILY_SUMMARIZE, &keys, &queue)
        .await?;
    telemetry::record_dispatch(routes::DAILY_SUMMARIZE);

    Ok(summary)
}
