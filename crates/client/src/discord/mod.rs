//! Discord REST channel.
//!
//! Queries are posted as plain messages into a channel where a link-preview
//! bot renders them into an embed. The embed is attached asynchronously, so
//! the message is re-read by id until its first embed appears.
//!
//! ### Endpoints
//!
//! - **Post**: `POST {base}/channels/{channel_id}/messages` with `{"content": query}`
//! - **Re-read**: `GET {base}/channels/{channel_id}/messages/{message_id}`
//! - **Authentication**: `Authorization: Bot <token>` header.
//! - **Errors**: 401/403 auth, 429 rate limited, other non-success statuses
//!   surface as HTTP errors.

pub mod error;
pub mod response;

pub use error::DiscordError;
pub use response::{DiscordMessage, Embed};

use async_trait::async_trait;
use namewatch_core::Error;
use reqwest::{RequestBuilder, header};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::channel::{Channel, Reply};

/// Default base URL for the Discord REST API.
const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "namewatch/0.1";

/// Discord client configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token, without the `Bot ` prefix.
    pub token: String,
    /// Channel that receives queries.
    pub channel_id: String,
    /// Base URL (default: https://discord.com/api/v10).
    pub base_url: String,
    /// Per-request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string.
    pub user_agent: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Discord REST client bound to one channel.
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    http: reqwest::Client,
    config: Arc<DiscordConfig>,
}

impl DiscordChannel {
    /// Create a new client with the given configuration.
    pub fn new(config: DiscordConfig) -> Result<Self, DiscordError> {
        if config.token.trim().is_empty() {
            return Err(DiscordError::MissingToken);
        }
        if config.channel_id.trim().is_empty() {
            return Err(DiscordError::MissingChannel);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DiscordError::Network(Arc::new(e)))?;

        Ok(Self { http, config: Arc::new(config) })
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.config.base_url.trim_end_matches('/'), self.config.channel_id)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<DiscordMessage, DiscordError> {
        let start = Instant::now();

        let http_response = request
            .header(header::AUTHORIZATION, format!("Bot {}", self.config.token))
            .header(header::USER_AGENT, &self.config.user_agent)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(status = %status, elapsed_ms = start.elapsed().as_millis() as u64, "Discord API response");

        if status == 401 || status == 403 {
            return Err(DiscordError::AuthError { status: status.as_u16() });
        }

        if status == 429 {
            return Err(DiscordError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(DiscordError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| DiscordError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    async fn send_query(&self, query: &str) -> Result<Reply, Error> {
        tracing::debug!(query, "posting query to Discord channel");
        let request = self
            .http
            .post(self.messages_url())
            .json(&serde_json::json!({ "content": query }));
        Ok(self.execute(request).await?.into())
    }

    async fn fetch_reply(&self, message_id: &str) -> Result<Reply, Error> {
        let request = self.http.get(format!("{}/{}", self.messages_url(), message_id));
        Ok(self.execute(request).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> DiscordConfig {
        DiscordConfig {
            token: "secret".into(),
            channel_id: "555".into(),
            base_url: server.uri(),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_new_missing_token() {
        let config = DiscordConfig { channel_id: "1".into(), ..Default::default() };
        assert!(matches!(DiscordChannel::new(config), Err(DiscordError::MissingToken)));
    }

    #[test]
    fn test_client_new_missing_channel() {
        let config = DiscordConfig { token: "t".into(), ..Default::default() };
        assert!(matches!(DiscordChannel::new(config), Err(DiscordError::MissingChannel)));
    }

    #[test]
    fn test_messages_url_trims_slash() {
        let config = DiscordConfig {
            token: "t".into(),
            channel_id: "42".into(),
            base_url: "https://example.test/api/".into(),
            ..Default::default()
        };
        let channel = DiscordChannel::new(config).unwrap();
        assert_eq!(channel.messages_url(), "https://example.test/api/channels/42/messages");
    }

    #[tokio::test]
    async fn test_send_query_posts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/555/messages"))
            .and(header_eq("authorization", "Bot secret"))
            .and(body_json(serde_json::json!({ "content": "https://namemc.com/name/foo" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "900", "embeds": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(config_for(&server)).unwrap();
        let reply = channel.send_query("https://namemc.com/name/foo").await.unwrap();

        assert_eq!(reply, Reply { message_id: "900".into(), content: None });
    }

    #[tokio::test]
    async fn test_fetch_reply_reads_embed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/555/messages/900"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "900",
                "embeds": [{ "description": "Searches: 42 / month" }]
            })))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(config_for(&server)).unwrap();
        let reply = channel.fetch_reply("900").await.unwrap();

        assert_eq!(reply.content.as_deref(), Some("Searches: 42 / month"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/555/messages/401"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/555/messages/429"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/555/messages/500"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(config_for(&server)).unwrap();

        assert!(matches!(channel.fetch_reply("401").await, Err(Error::ChannelAuth(_))));
        assert!(matches!(channel.fetch_reply("429").await, Err(Error::ChannelRateLimited(_))));
        assert!(matches!(channel.fetch_reply("500").await, Err(Error::HttpError(_))));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/555/messages/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(config_for(&server)).unwrap();
        assert!(matches!(channel.fetch_reply("1").await, Err(Error::Channel(_))));
    }
}
