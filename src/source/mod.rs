// src/source/mod.rs
pub mod rss;

pub use rss::RssSourceReader;

use anyhow::Result;
use async_trait::async_trait;

use crate::profile::BotProfile;

/// A single link+date pair pulled from a bot's source, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
    pub raw_link: String,
    /// Published timestamp as the feed provided it (RFC 2822 for RSS).
    pub published_at: String,
    pub bot_id: String,
}

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch the current candidate list for a bot. A failure here
    /// short-circuits the whole run.
    async fn fetch(&self, profile: &BotProfile) -> Result<Vec<Candidate>>;
    fn name(&self) -> &'static str;
}
