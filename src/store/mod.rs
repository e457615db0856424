// src/store/mod.rs
//! Outcome store: accepted articles and rejected ("unwanted") articles.
//!
//! The pipeline only writes and does narrow reads (existence check, recent
//! window). Schema/migration concerns live with the store implementation,
//! not here.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::report::RejectReason;

/// An accepted, persisted article. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub url: String,
    pub used_keywords: Vec<String>,
    pub bot_id: String,
    pub created_at: DateTime<Utc>,
}

/// A rejected candidate with its rejection reason.
#[derive(Debug, Clone, Serialize)]
pub struct UnwantedArticle {
    pub title: String,
    pub content: String,
    pub reason: RejectReason,
    pub url: String,
    pub date: String,
    pub bot_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an accepted article; id/created_at are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub url: String,
    pub used_keywords: Vec<String>,
    pub bot_id: String,
}

/// Insert payload for a rejected candidate.
#[derive(Debug, Clone)]
pub struct NewUnwanted {
    pub title: String,
    pub content: String,
    pub reason: RejectReason,
    pub url: String,
    pub date: String,
    pub bot_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The (bot, url) pair already has an accepted article. Raised at write
    /// time so racing workers resolve to exactly one row.
    #[error("article already exists for this bot: {url}")]
    Constraint { url: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait OutcomeStore: Send + Sync {
    async fn save_article(&self, article: NewArticle) -> Result<i64, StoreError>;

    async fn save_unwanted(&self, unwanted: NewUnwanted) -> Result<i64, StoreError>;

    /// Whether this URL was already processed (accepted or rejected) for the
    /// bot. URL comparison is case-insensitive.
    async fn exists(&self, url: &str, bot_id: &str) -> Result<bool, StoreError>;

    /// The bot's most recently accepted articles, newest first.
    async fn recent_articles(&self, bot_id: &str, limit: usize) -> Result<Vec<Article>, StoreError>;
}
