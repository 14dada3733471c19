//! Boundary between pipeline errors and HTTP responses.
//!
//! Handler errors are logged here and collapsed into a status code; callers
//! are always the delivery provider, which retries on 5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use errors::DigestError;
use tracing::error;

pub struct ApiError(pub DigestError);

impl From<DigestError> for ApiError {
    fn from(err: DigestError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            DigestError::InvalidSignature => StatusCode::UNAUTHORIZED,
            DigestError::DispatchFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        error!(error = %self.0, status = %status, "request failed");
        crate::telemetry::record_error(status.as_u16());
        (status, format!("Error processing request: {}", self.0)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
