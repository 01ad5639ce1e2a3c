//! External resolution: query the channel, wait for the rendered reply, parse it.
//!
//! The whole exchange (post, every re-poll, parse) runs under one deadline.
//! An unrendered reply is "not ready yet", never an empty answer.

pub mod parse;

pub use parse::{ReplyShape, SHAPES, parse_description};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use namewatch_core::{Error, ResolvedRecord};

use crate::channel::Channel;

/// Default bound on one resolution.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between re-polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default query prefix; the name is appended.
const DEFAULT_QUERY_PREFIX: &str = "https://namemc.com/name/";

/// Turns a name into a [`ResolvedRecord`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<ResolvedRecord, Error>;
}

/// Resolver tuning.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Deadline for the whole exchange.
    pub timeout: Duration,
    /// Delay between re-polls of an unrendered reply.
    pub poll_interval: Duration,
    /// Text posted before the name.
    pub query_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            query_prefix: DEFAULT_QUERY_PREFIX.to_string(),
        }
    }
}

/// [`NameResolver`] backed by an asynchronous [`Channel`].
#[derive(Clone)]
pub struct ChannelResolver {
    channel: Arc<dyn Channel>,
    config: ResolverConfig,
}

impl ChannelResolver {
    pub fn new(channel: Arc<dyn Channel>, config: ResolverConfig) -> Self {
        Self { channel, config }
    }

    pub fn query_for(&self, name: &str) -> String {
        format!("{}{}", self.config.query_prefix, name)
    }

    /// Post once, then re-poll until the reply is rendered.
    async fn await_rendered(&self, name: &str) -> Result<String, Error> {
        let mut reply = self.channel.send_query(&self.query_for(name)).await?;
        let mut polls = 0u32;

        while !reply.is_rendered() {
            tokio::time::sleep(self.config.poll_interval).await;
            polls += 1;

            match self.channel.fetch_reply(&reply.message_id).await {
                Ok(next) => reply = next,
                Err(Error::ChannelRateLimited(msg)) => {
                    tracing::warn!(name, polls, error = %msg, "channel throttled re-poll, backing off");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(name, polls, "reply rendered");
        Ok(reply.content.unwrap_or_default())
    }
}

#[async_trait]
impl NameResolver for ChannelResolver {
    async fn resolve(&self, name: &str) -> Result<ResolvedRecord, Error> {
        let name = name.to_lowercase();
        let start = Instant::now();

        let description = tokio::time::timeout(self.config.timeout, self.await_rendered(&name))
            .await
            .map_err(|_| {
                tracing::warn!(name = %name, timeout_ms = self.config.timeout.as_millis() as u64, "resolution timed out");
                Error::ResolutionTimeout(format!("no rendered reply for {name} within {:?}", self.config.timeout))
            })??;

        let record = parse_description(&description)?;
        tracing::debug!(
            name = %name,
            search_count = %record.search_count,
            available_at = ?record.availability_time,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "resolved name"
        );
        Ok(record)
    }
}
