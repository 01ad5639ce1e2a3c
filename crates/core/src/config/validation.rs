//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("failed to write configuration: {0}")]
    Write(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Longest accepted cache TTL.
const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `resolve_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `poll_interval_ms` is 0 or not below `resolve_timeout_ms`
    /// - `cache_ttl_secs`, `rate_limit_requests`, `rate_limit_window_secs`
    ///   or `sweep_interval_secs` is 0
    /// - `cache_ttl_secs` exceeds one year
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolve_timeout_ms < 100 {
            return Err(invalid("resolve_timeout_ms", "must be at least 100ms"));
        }
        if self.resolve_timeout_ms > 300_000 {
            return Err(invalid("resolve_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than 0"));
        }
        if self.poll_interval_ms >= self.resolve_timeout_ms {
            return Err(invalid("poll_interval_ms", "must be shorter than resolve_timeout_ms"));
        }

        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(invalid("cache_ttl_secs", "must not exceed one year (31536000s)"));
        }

        if self.rate_limit_requests == 0 {
            return Err(invalid("rate_limit_requests", "must be greater than 0"));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(invalid("rate_limit_window_secs", "must be greater than 0"));
        }

        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.discord_api_base.starts_with("https://") {
            tracing::warn!(
                discord_api_base = %self.discord_api_base,
                "discord_api_base is not HTTPS; the bot token will be sent in clear text"
            );
        }

        Ok(())
    }
}
