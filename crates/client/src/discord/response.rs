//! Discord message payloads.

use serde::Deserialize;

use crate::channel::Reply;

/// The subset of a Discord message object we read.
#[derive(Debug, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

/// A rich embed attached to a message.
#[derive(Debug, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub description: Option<String>,
}

impl From<DiscordMessage> for Reply {
    /// The first embed's description is the reply. No embed, or one whose
    /// description is still blank, means not rendered yet.
    fn from(message: DiscordMessage) -> Self {
        let content = message
            .embeds
            .into_iter()
            .next()
            .and_then(|embed| embed.description)
            .filter(|description| !description.trim().is_empty());
        Reply { message_id: message.id, content }
    }
}
