// src/pipeline/report.rs
//! Rejection/error vocabularies and the per-run metrics record.
//!
//! Rejections are expected, policy-driven outcomes and always end up as an
//! `UnwantedArticle` row. Errors are collaborator failures and are recorded
//! only here, in the run's error bucket.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a candidate was rejected by a gate. Fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidUrl,
    FilteredOut,
    Duplicate,
    DateNotRecent,
    Blacklist,
    NoKeywords,
    SimilarContent,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidUrl => "invalid_url",
            RejectReason::FilteredOut => "filtered_out",
            RejectReason::Duplicate => "duplicate",
            RejectReason::DateNotRecent => "date_not_recent",
            RejectReason::Blacklist => "blacklist",
            RejectReason::NoKeywords => "no_keywords",
            RejectReason::SimilarContent => "similar_content",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of collaborator failure dropped a candidate. Fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UrlProcessing,
    ContentExtraction,
    DateParse,
    AnalysisGeneration,
    ImageGeneration,
    DatabaseSave,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UrlProcessing => "url_processing",
            ErrorKind::ContentExtraction => "content_extraction",
            ErrorKind::DateParse => "date_parse",
            ErrorKind::AnalysisGeneration => "analysis_generation",
            ErrorKind::ImageGeneration => "image_generation",
            ErrorKind::DatabaseSave => "database_save",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one candidate within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Saved,
    Rejected(RejectReason),
    Failed(ErrorKind),
}

/// Aggregated outcome counters for one pipeline run.
///
/// Workers never touch this directly; each worker returns its
/// `CandidateOutcome` and the orchestrator merges them after all workers
/// have joined.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    pub total_found: u64,
    pub processed: u64,
    pub saved: u64,
    pub filtered: BTreeMap<RejectReason, u64>,
    pub errors: BTreeMap<ErrorKind, u64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunMetrics {
    pub fn new(total_found: u64) -> Self {
        Self {
            total_found,
            processed: 0,
            saved: 0,
            filtered: BTreeMap::new(),
            errors: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: &CandidateOutcome) {
        self.processed += 1;
        match outcome {
            CandidateOutcome::Saved => self.saved += 1,
            CandidateOutcome::Rejected(reason) => {
                *self.filtered.entry(*reason).or_insert(0) += 1;
            }
            CandidateOutcome::Failed(kind) => {
                *self.errors.entry(*kind).or_insert(0) += 1;
            }
        }
    }

    /// Record a failure that is not tied to a processed candidate
    /// (e.g. the source read itself).
    pub fn record_error(&mut self, kind: ErrorKind) {
        *self.errors.entry(kind).or_insert(0) += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn filtered_count(&self, reason: RejectReason) -> u64 {
        self.filtered.get(&reason).copied().unwrap_or(0)
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }
}

/// User-visible outcome of one run: success flag, human-readable message,
/// and the full metrics breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub bot_id: String,
    pub success: bool,
    pub message: String,
    pub metrics: RunMetrics,
}

impl RunReport {
    pub fn failure(bot_id: &str, message: impl Into<String>, mut metrics: RunMetrics) -> Self {
        metrics.finish();
        Self {
            bot_id: bot_id.to_string(),
            success: false,
            message: message.into(),
            metrics,
        }
    }
}
