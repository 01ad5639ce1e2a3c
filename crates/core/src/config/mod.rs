//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (NAMEWATCH_*)
//! 2. TOML config file (`--config`, `NAMEWATCH_CONFIG_FILE`, or `namewatch.toml`)
//! 3. Built-in defaults
//!
//! A missing config file is not an error: [`AppConfig::ensure_file`] writes a
//! placeholder for the operator to fill in.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_FILE_ENV: &str = "NAMEWATCH_CONFIG_FILE";

/// Config file used when neither `--config` nor the environment names one.
pub const DEFAULT_CONFIG_FILE: &str = "namewatch.toml";

/// Placeholder written for the bot token on first run.
pub const TOKEN_PLACEHOLDER: &str = "DISCORD BOT TOKEN";

/// Placeholder written for the channel id on first run.
pub const CHANNEL_PLACEHOLDER: &str = "DISCORD CHANNEL ID";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (NAMEWATCH_*)
/// 2. TOML config file
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via NAMEWATCH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Bot token used to authenticate against the Discord API.
    ///
    /// Set via NAMEWATCH_DISCORD_TOKEN environment variable.
    #[serde(default)]
    pub discord_token: Option<String>,

    /// Channel that receives name queries.
    ///
    /// Set via NAMEWATCH_CHANNEL_ID environment variable.
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Discord REST API base URL.
    #[serde(default = "default_discord_api_base")]
    pub discord_api_base: String,

    /// Address the web API listens on.
    ///
    /// Set via NAMEWATCH_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// User-Agent string for outbound HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Lifetime of entries without an availability instant, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upper bound on one external resolution, in milliseconds.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,

    /// Delay between polls for the rendered reply, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Requests a client may burst before being limited.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Seconds for one request slot to replenish.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Identify clients by `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket peer. Only enable behind a reverse proxy that overwrites them.
    ///
    /// Set via NAMEWATCH_TRUST_FORWARDED_HEADERS environment variable.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./namewatch.sqlite")
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".into()
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 80))
}

fn default_user_agent() -> String {
    concat!("namewatch/", env!("CARGO_PKG_VERSION")).into()
}

fn default_cache_ttl_secs() -> u64 {
    crate::record::DEFAULT_CACHE_TTL_SECS
}

fn default_resolve_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_rate_limit_requests() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            discord_token: None,
            channel_id: None,
            discord_api_base: default_discord_api_base(),
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            cache_ttl_secs: default_cache_ttl_secs(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            trust_forwarded_headers: false,
        }
    }
}

/// Outcome of [`AppConfig::ensure_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFile {
    /// The file already existed and was left alone.
    Existing,
    /// No file existed; a placeholder was written.
    Created,
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// The config as written on first run, credentials set to placeholders.
    pub fn placeholder() -> Self {
        Self {
            discord_token: Some(TOKEN_PLACEHOLDER.into()),
            channel_id: Some(CHANNEL_PLACEHOLDER.into()),
            ..Default::default()
        }
    }

    /// Pick the config file: explicit path, then `NAMEWATCH_CONFIG_FILE`, then the default.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Make sure a config file exists at `path`, writing a placeholder if not.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` if the placeholder cannot be serialized or written.
    pub fn ensure_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        if path.exists() {
            return Ok(ConfigFile::Existing);
        }

        let body =
            toml::to_string_pretty(&Self::placeholder()).map_err(|e| ConfigError::Write(e.to_string()))?;
        std::fs::write(path, body).map_err(|e| ConfigError::Write(format!("{}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), "wrote placeholder configuration");
        Ok(ConfigFile::Created)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `NAMEWATCH_`
    /// 2. TOML file at `path` (skipped if it does not exist)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be parsed
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(
                Env::prefixed("NAMEWATCH_")
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Credentials for the external channel: `(token, channel_id)`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if either value is absent, empty, or
    /// still the first-run placeholder.
    pub fn require_channel(&self) -> Result<(&str, &str), ConfigError> {
        let token = filled(self.discord_token.as_deref(), TOKEN_PLACEHOLDER).ok_or_else(|| ConfigError::Missing {
            field: "discord_token".into(),
            hint: "Set discord_token in the config file or NAMEWATCH_DISCORD_TOKEN".into(),
        })?;
        let channel = filled(self.channel_id.as_deref(), CHANNEL_PLACEHOLDER).ok_or_else(|| ConfigError::Missing {
            field: "channel_id".into(),
            hint: "Set channel_id in the config file or NAMEWATCH_CHANNEL_ID".into(),
        })?;
        Ok((token, channel))
    }
}

fn filled<'a>(value: Option<&'a str>, placeholder: &str) -> Option<&'a str> {
    value.map(str::trim).filter(|v| !v.is_empty() && *v != placeholder)
}
