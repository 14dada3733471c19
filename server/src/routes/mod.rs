pub mod daily;
pub mod notes;
pub mod urls;

use axum::http::HeaderMap;

pub async fn health() -> &'static str {
    "OK"
}

/// Signature header attached by the delivery provider. Missing header is an
/// empty string, which the receiver rejects.
pub(crate) fn signature_header(headers: &HeaderMap) -> &str {
    headers
        .get("Upstash-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
