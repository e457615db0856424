// src/pipeline/mod.rs
//! The run orchestrator: drives candidates through the gate sequence with
//! bounded concurrency, isolates per-candidate failures, and aggregates one
//! `RunMetrics` per run.

pub mod dedup;
pub mod link;
pub mod recency;
pub mod relevance;
pub mod report;

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::extract::ContentExtractor;
use crate::generate::{Analyst, ImageGenerator, ObjectStorage};
use crate::notify::{NotificationEvent, Notifier};
use crate::profile::{BotProfile, PipelineSettings};
use crate::resolve::{ExclusionRules, LinkResolver};
use crate::similarity::SimilarityScorer;
use crate::source::{Candidate, SourceReader};
use crate::store::{NewArticle, NewUnwanted, OutcomeStore, StoreError};

use link::LinkDecision;
use report::{CandidateOutcome, ErrorKind, RejectReason, RunMetrics, RunReport};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_candidates_total",
            "Candidates pulled from bot sources."
        );
        describe_counter!("pipeline_saved_total", "Articles accepted and persisted.");
        describe_counter!(
            "pipeline_filtered_total",
            "Candidates rejected by a gate, labeled by reason."
        );
        describe_counter!(
            "pipeline_errors_total",
            "Candidates dropped on collaborator failure, labeled by kind."
        );
        describe_histogram!("pipeline_run_ms", "Wall time of one bot run in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when a run last finished.");
    });
}

/// All collaborators the orchestrator needs, injected at construction.
#[derive(Clone)]
pub struct PipelineDeps {
    pub source: Arc<dyn SourceReader>,
    pub resolver: Arc<dyn LinkResolver>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub scorer: Arc<dyn SimilarityScorer>,
    pub analyst: Arc<dyn Analyst>,
    pub imager: Arc<dyn ImageGenerator>,
    pub storage: Arc<dyn ObjectStorage>,
    pub store: Arc<dyn OutcomeStore>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Pipeline {
    deps: PipelineDeps,
    rules: ExclusionRules,
    max_concurrency: usize,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, settings: &PipelineSettings) -> Self {
        Self {
            deps,
            rules: ExclusionRules::new(settings.excluded_url_terms.clone()),
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    /// One full pass over the bot's current candidate list.
    ///
    /// Individual rejections are normal outcomes; the run only fails when
    /// the source read itself fails or yields nothing.
    pub async fn run_bot(&self, profile: &BotProfile) -> RunReport {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let candidates = match self.deps.source.fetch(profile).await {
            Ok(c) => c,
            Err(e) => {
                warn!(bot = %profile.id, error = ?e, "source read failed");
                let mut metrics = RunMetrics::new(0);
                metrics.record_error(ErrorKind::UrlProcessing);
                return self.finish_run(
                    RunReport::failure(&profile.id, "source read failed", metrics),
                    t0,
                );
            }
        };
        if candidates.is_empty() {
            return self.finish_run(
                RunReport::failure(&profile.id, "source returned no candidates", RunMetrics::new(0)),
                t0,
            );
        }

        let mut metrics = RunMetrics::new(candidates.len() as u64);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();
        for candidate in candidates {
            let semaphore = Arc::clone(&semaphore);
            let deps = self.deps.clone();
            let profile = profile.clone();
            let rules = self.rules.clone();
            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                process_candidate(&deps, &profile, &rules, candidate).await
            });
        }

        // Workers are independent; merge their outcomes once they all join.
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => metrics.record(&outcome),
                Err(e) => {
                    warn!(bot = %profile.id, error = ?e, "pipeline worker panicked");
                    metrics.record(&CandidateOutcome::Failed(ErrorKind::Unexpected));
                }
            }
        }
        metrics.finish();

        let message = format!(
            "saved {} of {} candidates ({} filtered, {} errors)",
            metrics.saved,
            metrics.total_found,
            metrics.filtered.values().sum::<u64>(),
            metrics.errors.values().sum::<u64>(),
        );
        info!(bot = %profile.id, %message, "run complete");
        self.finish_run(
            RunReport {
                bot_id: profile.id.clone(),
                success: true,
                message,
                metrics,
            },
            t0,
        )
    }

    /// Telemetry at the single aggregation point, never from workers.
    fn finish_run(&self, report: RunReport, t0: std::time::Instant) -> RunReport {
        let m = &report.metrics;
        counter!("pipeline_candidates_total").increment(m.total_found);
        counter!("pipeline_saved_total").increment(m.saved);
        for (reason, n) in &m.filtered {
            counter!("pipeline_filtered_total", "reason" => reason.as_str()).increment(*n);
        }
        for (kind, n) in &m.errors {
            counter!("pipeline_errors_total", "kind" => kind.as_str()).increment(*n);
        }
        histogram!("pipeline_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("pipeline_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
        report
    }
}

/// Drive one candidate through the gate sequence to its terminal state.
/// Rejections route to the store as unwanted records; collaborator failures
/// drop the candidate with an error kind and never touch sibling candidates.
async fn process_candidate(
    deps: &PipelineDeps,
    profile: &BotProfile,
    rules: &ExclusionRules,
    candidate: Candidate,
) -> CandidateOutcome {
    let link_id = anon_hash(&candidate.raw_link);

    // Gate 1: link normalization + exclusion.
    let canonical = match link::normalize_link(deps.resolver.as_ref(), rules, &candidate.raw_link)
        .await
    {
        Ok(LinkDecision::Canonical(url)) => url,
        Ok(LinkDecision::Rejected(reason)) => {
            debug!(%link_id, %reason, "link rejected");
            return reject(deps, profile, &candidate, candidate.raw_link.clone(), None, reason)
                .await;
        }
        Err(e) => {
            warn!(%link_id, error = ?e, "link resolution failed");
            return CandidateOutcome::Failed(ErrorKind::UrlProcessing);
        }
    };

    // Gate 2: recency.
    let published = match recency::parse_published_unix(&candidate.published_at) {
        Ok(ts) => ts,
        Err(e) => {
            warn!(%link_id, error = ?e, "published date did not parse");
            return CandidateOutcome::Failed(ErrorKind::DateParse);
        }
    };
    if !recency::is_recent(published, Utc::now().timestamp(), profile.recency_window_hours) {
        debug!(%link_id, "outside freshness window");
        return reject(deps, profile, &candidate, canonical, None, RejectReason::DateNotRecent)
            .await;
    }

    // Gate 3: already processed for this bot?
    match deps.store.exists(&canonical, &profile.id).await {
        Ok(true) => {
            debug!(%link_id, "already processed");
            return reject(deps, profile, &candidate, canonical, None, RejectReason::Duplicate)
                .await;
        }
        Ok(false) => {}
        Err(e) => {
            warn!(%link_id, error = ?e, "duplicate check failed");
            return CandidateOutcome::Failed(ErrorKind::DatabaseSave);
        }
    }

    // Content extraction (external collaborator).
    let content = match deps.extractor.extract(&canonical).await {
        Ok(c) => c,
        Err(e) => {
            warn!(%link_id, error = ?e, "content extraction failed");
            return CandidateOutcome::Failed(ErrorKind::ContentExtraction);
        }
    };

    // Gate 4: keyword relevance with blacklist precedence.
    let text = format!("{} {}", content.title, content.body);
    let matches = relevance::match_terms(&text, &profile.keywords, &profile.blacklist);
    if let Some(reason) = relevance::relevance_decision(&matches) {
        debug!(%link_id, %reason, blacklist = ?matches.blacklist, "relevance rejected");
        return reject(deps, profile, &candidate, canonical, Some(&content), reason).await;
    }

    // Gate 5: semantic near-duplicate of a recent accepted article?
    let recent = match deps
        .store
        .recent_articles(&profile.id, profile.recent_window_size)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(%link_id, error = ?e, "recent-articles read failed");
            return CandidateOutcome::Failed(ErrorKind::DatabaseSave);
        }
    };
    match dedup::check_semantic_duplicate(
        deps.scorer.as_ref(),
        &recent,
        profile.similarity_threshold,
        &content.body,
    )
    .await
    {
        Ok(verdict) if verdict.is_similar => {
            debug!(%link_id, score = ?verdict.score, "similar to a recent article");
            return reject(
                deps,
                profile,
                &candidate,
                canonical,
                Some(&content),
                RejectReason::SimilarContent,
            )
            .await;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(%link_id, error = ?e, "similarity check failed");
            return CandidateOutcome::Failed(ErrorKind::Unexpected);
        }
    }

    // All gates passed: generation collaborators, then persistence.
    let rewrite = match deps.analyst.summarize(&content.title, &content.body, profile).await {
        Ok(r) => r,
        Err(e) => {
            warn!(%link_id, error = ?e, "summarization failed");
            return CandidateOutcome::Failed(ErrorKind::AnalysisGeneration);
        }
    };
    let image_url = match deps.imager.generate(&rewrite.body, profile).await {
        Ok(image_ref) => match deps.storage.upload(&image_ref).await {
            Ok(url) => url,
            Err(e) => {
                warn!(%link_id, error = ?e, "image upload failed");
                return CandidateOutcome::Failed(ErrorKind::ImageGeneration);
            }
        },
        Err(e) => {
            warn!(%link_id, error = ?e, "image generation failed");
            return CandidateOutcome::Failed(ErrorKind::ImageGeneration);
        }
    };

    match deps
        .store
        .save_article(NewArticle {
            title: rewrite.title.clone(),
            content: rewrite.body.clone(),
            url: canonical.clone(),
            used_keywords: matches.keywords.clone(),
            bot_id: profile.id.clone(),
        })
        .await
    {
        Ok(id) => {
            info!(%link_id, article_id = id, "article saved");
        }
        Err(StoreError::Constraint { url }) => {
            // A sibling worker won the race on this URL.
            debug!(%link_id, url = %anon_hash(&url), "lost save race");
            return CandidateOutcome::Failed(ErrorKind::DatabaseSave);
        }
        Err(e) => {
            warn!(%link_id, error = ?e, "article save failed");
            return CandidateOutcome::Failed(ErrorKind::DatabaseSave);
        }
    }

    // Best-effort announcement; failure never rolls back persistence.
    let event = NotificationEvent {
        bot_name: profile.name.clone(),
        title: rewrite.title,
        url: canonical,
        summary: rewrite.body,
        image_url: Some(image_url),
    };
    if let Err(e) = deps.notifier.notify(&event).await {
        warn!(%link_id, error = ?e, "notification failed");
    }

    CandidateOutcome::Saved
}

/// Persist the unwanted record for a gate rejection. The reason stays the
/// outcome; only a failing store write escalates to an error.
async fn reject(
    deps: &PipelineDeps,
    profile: &BotProfile,
    candidate: &Candidate,
    url: String,
    content: Option<&crate::extract::ExtractedContent>,
    reason: RejectReason,
) -> CandidateOutcome {
    let unwanted = NewUnwanted {
        title: content.map(|c| c.title.clone()).unwrap_or_default(),
        content: content.map(|c| c.body.clone()).unwrap_or_default(),
        reason,
        url,
        date: candidate.published_at.clone(),
        bot_id: profile.id.clone(),
    };
    match deps.store.save_unwanted(unwanted).await {
        Ok(_) => CandidateOutcome::Rejected(reason),
        Err(e) => {
            warn!(error = ?e, "unwanted save failed");
            CandidateOutcome::Failed(ErrorKind::DatabaseSave)
        }
    }
}

/// Short stable id for URLs in logs; raw URLs stay out of the log stream.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
