// tests/common/mod.rs
//! Mock collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use newsbot_pipeline::extract::{ContentExtractor, ExtractedContent};
use newsbot_pipeline::generate::{Analyst, ImageGenerator, ObjectStorage, Rewrite};
use newsbot_pipeline::notify::{NotificationEvent, Notifier};
use newsbot_pipeline::profile::{BotProfile, PipelineSettings};
use newsbot_pipeline::resolve::LinkResolver;
use newsbot_pipeline::similarity::SimilarityScorer;
use newsbot_pipeline::source::{Candidate, SourceReader};
use newsbot_pipeline::store::MemoryStore;
use newsbot_pipeline::PipelineDeps;

pub fn profile(id: &str, keywords: &[&str], blacklist: &[&str]) -> BotProfile {
    BotProfile {
        id: id.to_string(),
        name: id.to_string(),
        source_url: format!("https://feeds.example/{id}"),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
        similarity_threshold: 0.9,
        recency_window_hours: 24,
        recent_window_size: 10,
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        max_concurrency: 8,
        excluded_url_terms: vec!["/live/".to_string()],
    }
}

/// RFC 2822 timestamp `hours` from now (negative = past).
pub fn published_in_hours(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours)).to_rfc2822()
}

pub fn candidate(bot: &str, link: &str, hours: i64) -> Candidate {
    Candidate {
        raw_link: link.to_string(),
        published_at: published_in_hours(hours),
        bot_id: bot.to_string(),
    }
}

/* ---- source ---- */

pub struct StaticSource(pub Vec<Candidate>);

#[async_trait]
impl SourceReader for StaticSource {
    async fn fetch(&self, _profile: &BotProfile) -> Result<Vec<Candidate>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct FailingSource;

#[async_trait]
impl SourceReader for FailingSource {
    async fn fetch(&self, _profile: &BotProfile) -> Result<Vec<Candidate>> {
        Err(anyhow!("feed unreachable"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/* ---- resolver ---- */

/// Passes every link through unchanged.
pub struct IdentityResolver;

#[async_trait]
impl LinkResolver for IdentityResolver {
    async fn resolve(&self, raw_link: &str) -> Result<Option<String>> {
        Ok(Some(raw_link.to_string()))
    }
}

/// Resolves nothing (every link is `invalid_url`).
pub struct NoneResolver;

#[async_trait]
impl LinkResolver for NoneResolver {
    async fn resolve(&self, _raw_link: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/* ---- extractor ---- */

/// Returns the same title/body for every URL; URLs containing `fail_marker`
/// fail extraction instead.
pub struct FixedExtractor {
    pub title: String,
    pub body: String,
    pub fail_marker: Option<String>,
}

impl FixedExtractor {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            fail_marker: None,
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }
}

#[async_trait]
impl ContentExtractor for FixedExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        if let Some(marker) = &self.fail_marker {
            if url.contains(marker.as_str()) {
                return Err(anyhow!("extraction blew up for {url}"));
            }
        }
        Ok(ExtractedContent {
            title: self.title.clone(),
            body: self.body.clone(),
        })
    }
}

/* ---- similarity ---- */

/// Replays a fixed score sequence and counts calls.
pub struct ScriptedScorer {
    scores: Mutex<Vec<f32>>,
    pub calls: AtomicUsize,
}

impl ScriptedScorer {
    pub fn new(scores: &[f32]) -> Self {
        let mut s = scores.to_vec();
        s.reverse(); // pop() returns them in original order
        Self {
            scores: Mutex::new(s),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilarityScorer for ScriptedScorer {
    async fn similarity(&self, _a: &str, _b: &str) -> Result<f32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut scores = self.scores.lock().expect("scores mutex poisoned");
        scores.pop().ok_or_else(|| anyhow!("scorer script exhausted"))
    }
}

/// Always scores 0.0 (nothing is ever similar).
pub struct NeverSimilar;

#[async_trait]
impl SimilarityScorer for NeverSimilar {
    async fn similarity(&self, _a: &str, _b: &str) -> Result<f32> {
        Ok(0.0)
    }
}

/* ---- generation ---- */

pub struct EchoAnalyst;

#[async_trait]
impl Analyst for EchoAnalyst {
    async fn summarize(&self, title: &str, body: &str, profile: &BotProfile) -> Result<Rewrite> {
        Ok(Rewrite {
            title: format!("[{}] {title}", profile.name),
            body: body.to_string(),
        })
    }
}

pub struct FailingAnalyst;

#[async_trait]
impl Analyst for FailingAnalyst {
    async fn summarize(&self, _title: &str, _body: &str, _profile: &BotProfile) -> Result<Rewrite> {
        Err(anyhow!("model is down"))
    }
}

pub struct StubImager;

#[async_trait]
impl ImageGenerator for StubImager {
    async fn generate(&self, _body: &str, _profile: &BotProfile) -> Result<String> {
        Ok("https://img.example/generated.png".to_string())
    }
}

pub struct StubStorage;

#[async_trait]
impl ObjectStorage for StubStorage {
    async fn upload(&self, image_ref: &str) -> Result<String> {
        Ok(image_ref.to_string())
    }
}

/* ---- notifier ---- */

/// Records every event; never fails.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(event.clone());
        Ok(())
    }
}

/* ---- deps bundle ---- */

/// Deps with benign defaults; tests swap in what they need.
pub fn default_deps(source: Arc<dyn SourceReader>, store: Arc<MemoryStore>) -> PipelineDeps {
    PipelineDeps {
        source,
        resolver: Arc::new(IdentityResolver),
        extractor: Arc::new(FixedExtractor::new("Title", "body text")),
        scorer: Arc::new(NeverSimilar),
        analyst: Arc::new(EchoAnalyst),
        imager: Arc::new(StubImager),
        storage: Arc::new(StubStorage),
        store,
        notifier: Arc::new(RecordingNotifier::default()),
    }
}
