//! URL variant of the per-item summarizer: fetches the page first, stores a
//! `{title, summary}` structure instead of plain text.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use dn_core::types::{UrlMessage, UrlSummary, routes};
use tracing::info;

use crate::app::AppState;
use crate::errors::ApiResult;
use crate::routes::signature_header;
use crate::{prompts, telemetry};

const SUMMARY_MAX_TOKENS: u32 = 1000;

pub async fn scrape_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, &'static str)> {
    let message: UrlMessage = state
        .receiver
        .verified_json(&body, signature_header(&headers))?;
    telemetry::record_message(routes::URL_SCRAPE);
    info!(url = %message.url, "scraping url");

    let page = state.fetcher.fetch(&message.url).await?;
    let summary = state
        .model
        .complete(
            &prompts::url_summary(&page.title, &page.text),
            SUMMARY_MAX_TOKENS,
        )
        .await?;

    let stored = UrlSummary {
        title: page.title,
        summary,
    };
    state
        .store
        .write_field(
            &message.keys.urls_key,
            &message.url,
            &serde_json::to_string(&stored).map_err(errors::DigestError::Serialization)?,
        )
        .await?;

    Ok((StatusCode::OK, "ok"))
}
