// src/pipeline/dedup.rs
//! Fifth gate: embedding-based near-duplicate check against the bot's
//! recent accepted articles.

use anyhow::Result;

use crate::similarity::SimilarityScorer;
use crate::store::Article;

#[derive(Debug, Clone, PartialEq)]
pub struct DedupVerdict {
    pub is_similar: bool,
    pub score: Option<f32>,
}

/// Compare the candidate body against recent articles in recency order and
/// short-circuit on the first score at or above the threshold. First-hit,
/// not max-over-all: later articles are never compared once a hit is found.
///
/// A scorer failure propagates; silently skipping a comparison could let a
/// true duplicate through.
pub async fn check_semantic_duplicate(
    scorer: &dyn SimilarityScorer,
    recent: &[Article],
    threshold: f32,
    candidate_body: &str,
) -> Result<DedupVerdict> {
    for article in recent {
        let score = scorer.similarity(candidate_body, &article.content).await?;
        if score >= threshold {
            return Ok(DedupVerdict {
                is_similar: true,
                score: Some(score),
            });
        }
    }
    Ok(DedupVerdict {
        is_similar: false,
        score: None,
    })
}
