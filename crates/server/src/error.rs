//! HTTP rendering of [`namewatch_core::Error`].

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use namewatch_core::Error;
use serde_json::json;

/// Error returned by handlers and middleware; renders as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::ResolutionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::UnparseableResponse(_)
            | Error::ChannelAuth(_)
            | Error::ChannelRateLimited(_)
            | Error::Channel(_)
            | Error::HttpError(_) => StatusCode::BAD_GATEWAY,
            Error::StoreUnavailable(_) | Error::MigrationFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            if self.0.is_retryable() {
                tracing::warn!(status = status.as_u16(), error = %self.0, "lookup failed, retry may succeed");
            } else {
                tracing::error!(status = status.as_u16(), error = %self.0, "lookup failed");
            }
        }

        let mut response = (status, Json(json!({ "error": self.0.to_string() }))).into_response();

        if let Error::RateLimited { retry_after_secs } = self.0 {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_str(&retry_after_secs.to_string()).unwrap_or_else(|_| HeaderValue::from_static("60")),
            );
        }

        response
    }
}
