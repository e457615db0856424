// src/notify/mod.rs
pub mod discord;

pub use discord::DiscordNotifier;

use anyhow::Result;
use async_trait::async_trait;

/// Published-article announcement sent to the chat channel.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub bot_name: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub image_url: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort: a failure here never rolls back persistence.
    async fn notify(&self, event: &NotificationEvent) -> Result<()>;
}
