//! Asynchronous external channel abstraction.
//!
//! A channel accepts a free-text query and later exposes the reply's rendered
//! content block. The block may be empty when the query is first accepted and
//! filled in by the upstream some time afterwards.

use async_trait::async_trait;
use namewatch_core::Error;

/// Snapshot of a posted query and its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Identifier used to re-poll the same message.
    pub message_id: String,
    /// Description text of the rendered content block; `None` while the
    /// upstream has not rendered it yet.
    pub content: Option<String>,
}

impl Reply {
    pub fn is_rendered(&self) -> bool {
        self.content.is_some()
    }
}

/// Transport seam for the external information source.
///
/// Implementations are supplied already authenticated and connected.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Post a query; the returned reply may not be rendered yet.
    async fn send_query(&self, query: &str) -> Result<Reply, Error>;

    /// Re-read a previously posted query.
    async fn fetch_reply(&self, message_id: &str) -> Result<Reply, Error>;
}
