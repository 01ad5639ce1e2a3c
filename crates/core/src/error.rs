//! Unified error types for namewatch.
//!
//! Every variant renders with a stable code prefix so log lines and HTTP
//! error bodies can be matched on without parsing free text.

use std::sync::Arc;

use tokio_rusqlite::rusqlite;

/// Unified error types for the namewatch service.
///
/// The type is `Clone` so one resolution outcome can be handed to every
/// request waiting on it; heavy sources are held behind `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Admission denied for the calling client.
    #[error("RATE_LIMITED: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The upstream never rendered a usable reply within the bound.
    #[error("RESOLUTION_TIMEOUT: {0}")]
    ResolutionTimeout(String),

    /// The upstream replied in neither recognized shape.
    #[error("UNPARSEABLE_RESPONSE: {0}")]
    UnparseableResponse(String),

    /// The persistent store could not be reached or rejected an operation.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(Arc<tokio_rusqlite::Error>),

    /// Migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// The external channel rejected our credentials.
    #[error("CHANNEL_AUTH_ERROR: {0}")]
    ChannelAuth(String),

    /// The external channel throttled us.
    #[error("CHANNEL_RATE_LIMITED: {0}")]
    ChannelRateLimited(String),

    /// Transport failure talking to the external channel.
    #[error("CHANNEL_ERROR: {0}")]
    Channel(String),

    /// Non-success HTTP status from the external channel.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Invariant violation inside the service.
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. }
                | Error::ResolutionTimeout(_)
                | Error::StoreUnavailable(_)
                | Error::ChannelRateLimited(_)
                | Error::Channel(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => {
                Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::ConnectionClosed))
            }
            tokio_rusqlite::Error::Close(c) => Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::Close(c))),
            _ => Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::ConnectionClosed)),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::StoreUnavailable(Arc::new(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::Error(err)))
    }
}
