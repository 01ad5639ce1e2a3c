//! Client code for namewatch.
//!
//! This crate provides the asynchronous channel abstraction, the Discord
//! REST channel, and the resolver that turns a channel reply into a record.

pub mod channel;
pub mod discord;
pub mod resolve;

pub use channel::{Channel, Reply};
pub use discord::{DiscordChannel, DiscordConfig, DiscordError};
pub use resolve::{ChannelResolver, NameResolver, ResolverConfig, parse_description};
