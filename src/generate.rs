// src/generate.rs
//! Downstream generation collaborators: summarization/rewrite, image
//! generation, and object storage. The pipeline only cares about their
//! narrow contracts; prompt wording and storage layout stay here.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::profile::BotProfile;

/// A rewritten title+body pair produced by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait Analyst: Send + Sync {
    async fn summarize(&self, title: &str, body: &str, profile: &BotProfile) -> Result<Rewrite>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an illustration for the article. Returns a transient image
    /// reference (URL) owned by the generation provider.
    async fn generate(&self, body: &str, profile: &BotProfile) -> Result<String>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Re-home a transient image reference to durable storage and return the
    /// public URL.
    async fn upload(&self, image_ref: &str) -> Result<String>;
}

fn openai_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("newsbot-pipeline/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("reqwest client")
}

/// OpenAI Chat Completions-backed rewrite. Requires `OPENAI_API_KEY`.
pub struct OpenAiAnalyst {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiAnalyst {
    pub fn new(model_override: Option<&str>) -> Self {
        Self {
            http: openai_client(30),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}
#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Analyst for OpenAiAnalyst {
    async fn summarize(&self, title: &str, body: &str, profile: &BotProfile) -> Result<Rewrite> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }
        let system = format!(
            "You are the editor of '{}', a topical news channel. Rewrite the \
             article below as a short original piece. Reply with the new \
             headline on the first line, then a blank line, then the body.",
            profile.name
        );
        let user = format!("Headline: {title}\n\n{body}");
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let resp: ChatResponse = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("chat post")?
            .error_for_status()
            .context("chat non-2xx")?
            .json()
            .await
            .context("chat decode")?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat response contained no choices"))?;
        parse_rewrite(&content, title)
    }
}

/// First non-empty line is the headline, the rest is the body. Falls back to
/// the original title if the model returned a single block.
pub fn parse_rewrite(content: &str, fallback_title: &str) -> Result<Rewrite> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        bail!("rewrite response was empty");
    }
    let mut lines = trimmed.lines();
    let title = lines
        .next()
        .map(|l| l.trim().trim_matches('#').trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    if body.is_empty() {
        // Single-block reply: keep it as the body under the original title.
        return Ok(Rewrite {
            title: fallback_title.to_string(),
            body: trimmed.to_string(),
        });
    }
    Ok(Rewrite { title, body })
}

/// OpenAI Images-backed generator. Returns the provider-hosted image URL.
pub struct OpenAiImageGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiImageGenerator {
    pub fn new(model_override: Option<&str>) -> Self {
        Self {
            http: openai_client(60),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: model_override.unwrap_or("dall-e-3").to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageRow>,
}
#[derive(Deserialize)]
struct ImageRow {
    url: Option<String>,
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, body: &str, profile: &BotProfile) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }
        let excerpt: String = body.chars().take(600).collect();
        let prompt = format!(
            "Editorial illustration for a '{}' news story: {excerpt}",
            profile.name
        );
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });

        let resp: ImageResponse = self
            .http
            .post("https://api.openai.com/v1/images/generations")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("image post")?
            .error_for_status()
            .context("image non-2xx")?
            .json()
            .await
            .context("image decode")?;

        resp.data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| anyhow!("image response contained no url"))
    }
}

/// HTTP-PUT bucket storage: downloads the transient image and re-uploads it
/// under a digest key. Configured via `BUCKET_PUT_URL` / `BUCKET_PUBLIC_URL`.
pub struct HttpBucketStorage {
    http: reqwest::Client,
    put_base: String,
    public_base: String,
}

impl HttpBucketStorage {
    pub fn new(put_base: String, public_base: String) -> Self {
        Self {
            http: openai_client(30),
            put_base: put_base.trim_end_matches('/').to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let put_base = std::env::var("BUCKET_PUT_URL").ok()?;
        let public_base = std::env::var("BUCKET_PUBLIC_URL").ok()?;
        Some(Self::new(put_base, public_base))
    }
}

#[async_trait]
impl ObjectStorage for HttpBucketStorage {
    async fn upload(&self, image_ref: &str) -> Result<String> {
        let bytes = self
            .http
            .get(image_ref)
            .send()
            .await
            .context("image download")?
            .error_for_status()
            .context("image download non-2xx")?
            .bytes()
            .await
            .context("image download body")?;

        let key = format!("{}.png", digest_key(image_ref));
        self.http
            .put(format!("{}/{key}", self.put_base))
            .body(bytes)
            .send()
            .await
            .context("image upload put")?
            .error_for_status()
            .context("image upload non-2xx")?;
        Ok(format!("{}/{key}", self.public_base))
    }
}

/// No-bucket mode: the transient provider URL is used as-is.
pub struct PassthroughStorage;

#[async_trait]
impl ObjectStorage for PassthroughStorage {
    async fn upload(&self, image_ref: &str) -> Result<String> {
        tracing::debug!("object storage disabled; using transient image url");
        Ok(image_ref.to_string())
    }
}

fn digest_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
