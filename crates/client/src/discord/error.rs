//! Discord API client error types.

use std::sync::Arc;

use namewatch_core::Error;

/// Errors from the Discord REST client.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    /// Bot token not configured.
    #[error("missing bot token")]
    MissingToken,

    /// Destination channel not configured.
    #[error("missing channel id")]
    MissingChannel,

    /// Authentication failed (invalid token or missing channel permissions).
    #[error("authentication failed: HTTP {status}")]
    AuthError { status: u16 },

    /// Rate limited by Discord.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DiscordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { DiscordError::Timeout } else { DiscordError::Network(Arc::new(err)) }
    }
}

impl From<DiscordError> for Error {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::MissingToken | DiscordError::AuthError { .. } => Error::ChannelAuth(err.to_string()),
            DiscordError::RateLimited => Error::ChannelRateLimited(err.to_string()),
            DiscordError::HttpError { status } => Error::HttpError(format!("HTTP {status}")),
            DiscordError::MissingChannel
            | DiscordError::Timeout
            | DiscordError::Network(_)
            | DiscordError::Parse(_) => Error::Channel(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiscordError::MissingToken;
        assert!(err.to_string().contains("token"));

        let err = DiscordError::HttpError { status: 502 };
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_into_core_error() {
        assert!(matches!(Error::from(DiscordError::AuthError { status: 401 }), Error::ChannelAuth(_)));
        assert!(matches!(Error::from(DiscordError::RateLimited), Error::ChannelRateLimited(_)));
        assert!(matches!(Error::from(DiscordError::Timeout), Error::Channel(_)));
        assert!(matches!(Error::from(DiscordError::HttpError { status: 500 }), Error::HttpError(msg) if msg == "HTTP 500"));
    }
}
