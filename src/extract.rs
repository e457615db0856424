// src/extract.rs
//! Content extraction: canonical URL -> title + body text.
//!
//! The heuristics are deliberately plain (title tag, tag-stripped body).
//! An empty body is a failed extraction, never an empty success.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

/// Title and body text of an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent>;
}

pub struct HttpContentExtractor {
    client: reqwest::Client,
    max_body_chars: usize,
}

impl HttpContentExtractor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newsbot-pipeline/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            client,
            max_body_chars: 20_000,
        }
    }
}

impl Default for HttpContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for HttpContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        let html = self
            .client
            .get(url)
            .send()
            .await
            .context("article http get()")?
            .error_for_status()
            .context("article non-2xx")?
            .text()
            .await
            .context("article http .text()")?;

        let title = extract_title(&html).unwrap_or_default();
        let mut body = html_to_text(&html);
        if body.chars().count() > self.max_body_chars {
            body = body.chars().take(self.max_body_chars).collect();
        }
        if body.is_empty() {
            bail!("extracted body is empty for {url}");
        }
        Ok(ExtractedContent { title, body })
    }
}

/// `og:title` if present, else the `<title>` tag.
pub fn extract_title(html: &str) -> Option<String> {
    static RE_OG: OnceCell<Regex> = OnceCell::new();
    let re_og = RE_OG.get_or_init(|| {
        Regex::new(r#"(?is)<meta[^>]+property\s*=\s*["']og:title["'][^>]+content\s*=\s*["']([^"']+)["']"#)
            .expect("og:title regex")
    });
    static RE_TITLE: OnceCell<Regex> = OnceCell::new();
    let re_title =
        RE_TITLE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

    let raw = re_og
        .captures(html)
        .or_else(|| re_title.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())?;
    let title = collapse_whitespace(&html_escape::decode_html_entities(raw));
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Strip scripts/styles and tags, decode entities, collapse whitespace.
pub fn html_to_text(html: &str) -> String {
    static RE_DROP: OnceCell<Regex> = OnceCell::new();
    let re_drop = RE_DROP.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript|head)\b.*?</(script|style|noscript|head)>")
            .expect("drop-block regex")
    });
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));

    let without_blocks = re_drop.replace_all(html, " ");
    let without_tags = re_tags.replace_all(&without_blocks, " ");
    let decoded = html_escape::decode_html_entities(&without_tags).to_string();
    collapse_whitespace(&decoded)
}

fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}
