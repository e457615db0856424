// src/resolve.rs
//! Link normalization: redirector resolution and exclusion rules.
//!
//! Feed links are often redirect wrappers (Google News article links, feed
//! proxies). The resolver turns them into the final article URL; the
//! exclusion rules then reject known non-article paths and social/video
//! platforms.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Hosts whose links are redirect wrappers rather than article URLs.
const REDIRECTOR_HOSTS: &[&str] = &[
    "news.google.com",
    "feedproxy.google.com",
    "feeds.feedburner.com",
    "t.co",
];

static SOCIAL_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|\.)(facebook\.com|twitter\.com|x\.com|instagram\.com|tiktok\.com|youtube\.com|youtu\.be|t\.me|telegram\.org|whatsapp\.com|wa\.me)$",
    )
    .expect("social host regex")
});

#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolve a raw feed link to its canonical article URL.
    /// `Ok(None)` means the link did not resolve to any URL.
    async fn resolve(&self, raw_link: &str) -> Result<Option<String>>;
}

/// Resolver that follows HTTP redirects for known redirector hosts and
/// passes direct article links through untouched.
pub struct HttpLinkResolver {
    client: reqwest::Client,
}

impl HttpLinkResolver {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newsbot-pipeline/0.1")
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

impl Default for HttpLinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkResolver for HttpLinkResolver {
    async fn resolve(&self, raw_link: &str) -> Result<Option<String>> {
        let Ok(parsed) = Url::parse(raw_link.trim()) else {
            return Ok(None);
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return Ok(None);
        }

        let is_redirector = parsed
            .host_str()
            .is_some_and(|h| REDIRECTOR_HOSTS.iter().any(|r| h.eq_ignore_ascii_case(r)));
        if !is_redirector {
            return Ok(Some(parsed.to_string()));
        }

        // Follow the wrapper to its final location; the response URL after
        // redirects is the canonical article URL.
        let resp = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .context("resolving redirector link")?;
        let final_url = resp.url().clone();
        if final_url.host_str() == parsed.host_str() {
            // Never left the redirector; nothing to canonicalize to.
            return Ok(None);
        }
        Ok(Some(final_url.to_string()))
    }
}

/// URL exclusion check: configured substring terms plus a social/video
/// platform host pattern, both applied to the lower-cased URL.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    terms: Vec<String>,
}

impl ExclusionRules {
    pub fn new(terms: Vec<String>) -> Self {
        let terms = terms
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn is_excluded(&self, canonical_url: &str) -> bool {
        let lower = canonical_url.to_lowercase();
        if self.terms.iter().any(|t| lower.contains(t.as_str())) {
            return true;
        }
        match Url::parse(&lower) {
            Ok(u) => u.host_str().is_some_and(|h| SOCIAL_HOST_RE.is_match(h)),
            Err(_) => false,
        }
    }
}
