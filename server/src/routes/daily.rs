//! Entry trigger (GET) and final aggregation (POST) for the daily run.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use dn_core::types::{QueueKeys, routes};
use tracing::info;

use crate::aggregate::{self, AggregationOutcome};
use crate::app::AppState;
use crate::enumerate;
use crate::errors::ApiResult;
use crate::routes::signature_header;
use crate::telemetry;

/// Cron-style entry point: enumerate recent material and fan it out.
///
/// Unauthorized callers get 401; a deployment without summarization
/// configured gets a deliberate no-op 200.
pub async fn trigger_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, &'static str)> {
    let authorized = state.config.dev_mode
        || headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", state.config.cron_secret));
    if !authorized {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    if !state.config.enumeration_enabled() {
        info!("daily summaries not configured, skipping run");
        return Ok((StatusCode::OK, "Daily summary not configured"));
    }

    let summary = enumerate::run(&state).await?;
    info!(
        notes = summary.notes,
        diffs = summary.diffs,
        urls = summary.urls,
        "fan-out complete"
    );
    Ok((StatusCode::OK, "ok"))
}

/// Fan-in: runs last on the shared queue and assembles whatever partial
/// results have arrived by now.
pub async fn aggregate_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, &'static str)> {
    let keys: QueueKeys = state
        .receiver
        .verified_json(&body, signature_header(&headers))?;
    telemetry::record_message(routes::DAILY_SUMMARIZE);

    match aggregate::run(&state, &keys).await? {
        AggregationOutcome::NoNotes => Ok((StatusCode::OK, "No notes found")),
        AggregationOutcome::Written { filename } => {
            info!(filename = %filename, "daily digest written");
            Ok((StatusCode::OK, "ok"))
        }
    }
}
