//! Per-item summarizers for notes and diffs.
//!
//! Each invocation handles exactly one verified work item and writes one
//! field into the rendezvous hash; redelivery just rewrites the same field.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use dn_core::types::{DiffMessage, NoteMessage, routes};
use tracing::info;

use crate::app::AppState;
use crate::errors::ApiResult;
use crate::routes::signature_header;
use crate::{prompts, telemetry};

const SUMMARY_MAX_TOKENS: u32 = 1000;

pub async fn summarize_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, &'static str)> {
    let message: NoteMessage = state
        .receiver
        .verified_json(&body, signature_header(&headers))?;
    telemetry::record_message(routes::NOTE_SUMMARIZE);
    info!(filename = %message.note.filename, "summarizing note");

    let summary = state
        .model
        .complete(&prompts::note_summary(&message.note.body), SUMMARY_MAX_TOKENS)
        .await?;
    state
        .store
        .write_field(&message.keys.notes_key, &message.note.filename, &summary)
        .await?;

    Ok((StatusCode::OK, "ok"))
}

pub async fn summarize_diff(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, &'static str)> {
    let message: DiffMessage = state
        .receiver
        .verified_json(&body, signature_header(&headers))?;
    telemetry::record_message(routes::DIFF_SUMMARIZE);
    info!(filename = %message.diff.filename, "summarizing diff");

    let summary = state
        .model
        .complete(&prompts::diff_summary(&message.diff.diff), SUMMARY_MAX_TOKENS)
        .await?;
    state
        .store
        .write_field(&message.keys.notes_key, &message.diff.filename, &summary)
        .await?;

    Ok((StatusCode::OK, "ok"))
}
