// src/store/memory.rs
//! In-memory outcome store with a write-time unique check on (bot, url).

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{Article, NewArticle, NewUnwanted, OutcomeStore, StoreError, UnwantedArticle};

#[derive(Debug, Default)]
struct Inner {
    articles: Vec<Article>,
    unwanted: Vec<UnwantedArticle>,
    next_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all accepted articles (test/debug helper).
    pub fn articles(&self) -> Vec<Article> {
        self.inner.lock().expect("store mutex poisoned").articles.clone()
    }

    /// Snapshot of all rejected articles (test/debug helper).
    pub fn unwanted(&self) -> Vec<UnwantedArticle> {
        self.inner.lock().expect("store mutex poisoned").unwanted.clone()
    }
}

#[async_trait]
impl OutcomeStore for MemoryStore {
    async fn save_article(&self, article: NewArticle) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let clash = inner.articles.iter().any(|a| {
            a.bot_id == article.bot_id && a.url.eq_ignore_ascii_case(&article.url)
        });
        if clash {
            return Err(StoreError::Constraint { url: article.url });
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.articles.push(Article {
            id,
            title: article.title,
            content: article.content,
            url: article.url,
            used_keywords: article.used_keywords,
            bot_id: article.bot_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn save_unwanted(&self, unwanted: NewUnwanted) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.unwanted.push(UnwantedArticle {
            title: unwanted.title,
            content: unwanted.content,
            reason: unwanted.reason,
            url: unwanted.url,
            date: unwanted.date,
            bot_id: unwanted.bot_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn exists(&self, url: &str, bot_id: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let hit = inner
            .articles
            .iter()
            .any(|a| a.bot_id == bot_id && a.url.eq_ignore_ascii_case(url))
            || inner
                .unwanted
                .iter()
                .any(|u| u.bot_id == bot_id && u.url.eq_ignore_ascii_case(url));
        Ok(hit)
    }

    async fn recent_articles(&self, bot_id: &str, limit: usize) -> Result<Vec<Article>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        // Insertion order is creation order; newest first.
        let mut recent: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| a.bot_id == bot_id)
            .cloned()
            .collect();
        recent.reverse();
        recent.truncate(limit);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::report::RejectReason;

    fn article(bot: &str, url: &str, title: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            content: format!("content of {title}"),
            url: url.to_string(),
            used_keywords: vec!["kw".into()],
            bot_id: bot.to_string(),
        }
    }

    #[tokio::test]
    async fn exists_is_case_insensitive_across_both_tables() {
        let store = MemoryStore::new();
        store
            .save_article(article("tech", "https://News.Example/A", "a"))
            .await
            .unwrap();
        store
            .save_unwanted(NewUnwanted {
                title: String::new(),
                content: String::new(),
                reason: RejectReason::Blacklist,
                url: "https://news.example/b".into(),
                date: "now".into(),
                bot_id: "tech".into(),
            })
            .await
            .unwrap();

        assert!(store.exists("https://news.example/a", "tech").await.unwrap());
        assert!(store.exists("HTTPS://NEWS.EXAMPLE/B", "tech").await.unwrap());
        assert!(!store.exists("https://news.example/a", "sports").await.unwrap());
        assert!(!store.exists("https://news.example/c", "tech").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_save_hits_the_constraint() {
        let store = MemoryStore::new();
        store
            .save_article(article("tech", "https://news.example/a", "first"))
            .await
            .unwrap();
        let err = store
            .save_article(article("tech", "HTTPS://NEWS.EXAMPLE/A", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        assert_eq!(store.articles().len(), 1);

        // Same URL for a different bot is a different row.
        store
            .save_article(article("sports", "https://news.example/a", "third"))
            .await
            .unwrap();
        assert_eq!(store.articles().len(), 2);
    }

    #[tokio::test]
    async fn recent_articles_returns_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .save_article(article("tech", &format!("https://news.example/{i}"), &format!("t{i}")))
                .await
                .unwrap();
        }
        let recent = store.recent_articles("tech", 3).await.unwrap();
        let titles: Vec<&str> = recent.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["t4", "t3", "t2"]);
    }
}
