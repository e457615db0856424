// src/similarity.rs
//! Semantic similarity of two text blobs via embeddings + cosine.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Max characters per embedding input; keeps requests under model limits.
const MAX_EMBED_CHARS: usize = 8_000;

#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    /// Score semantic similarity of two text blobs. Result is in [-1, 1].
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f32>;
}

/// OpenAI embeddings-backed scorer. Requires `OPENAI_API_KEY`.
pub struct OpenAiEmbeddingScorer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingScorer {
    /// `model_override`: defaults to text-embedding-3-small.
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("newsbot-pipeline/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("text-embedding-3-small").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }
        let input: String = text.chars().take(MAX_EMBED_CHARS).collect();
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingRow>,
        }
        #[derive(Deserialize)]
        struct EmbeddingRow {
            embedding: Vec<f32>,
        }

        let resp: EmbeddingResponse = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("embeddings post")?
            .error_for_status()
            .context("embeddings non-2xx")?
            .json()
            .await
            .context("embeddings decode")?;

        let Some(row) = resp.data.into_iter().next() else {
            bail!("embeddings response contained no vectors");
        };
        Ok(row.embedding)
    }
}

#[async_trait]
impl SimilarityScorer for OpenAiEmbeddingScorer {
    async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f32> {
        let a = self.embed(text_a).await?;
        let b = self.embed(text_b).await?;
        Ok(cosine_similarity(&a, &b))
    }
}

/// Cosine similarity for f32 embedding vectors. Zero-norm inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
