// tests/pipeline_e2e.rs
//! End-to-end happy path: one fresh on-topic candidate flows through every
//! gate, gets generated, persisted, and announced.

mod common;

use std::sync::Arc;

use common::*;
use newsbot_pipeline::{Pipeline, RejectReason};

#[tokio::test]
async fn single_on_topic_candidate_is_saved() {
    let bot = profile("zoo", &["zebra"], &[]);
    let store = Arc::new(newsbot_pipeline::MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let mut deps = default_deps(
        Arc::new(StaticSource(vec![candidate("zoo", "https://news.example/a", 0)])),
        Arc::clone(&store),
    );
    deps.extractor = Arc::new(FixedExtractor::new("X", "contains keyword ZEBRA"));
    deps.notifier = notifier.clone();

    let pipeline = Pipeline::new(deps, &settings());
    let report = pipeline.run_bot(&bot).await;

    assert!(report.success);
    assert_eq!(report.metrics.total_found, 1);
    assert_eq!(report.metrics.processed, 1);
    assert_eq!(report.metrics.saved, 1);
    assert!(report.metrics.filtered.is_empty());
    assert!(report.metrics.errors.is_empty());

    let articles = store.articles();
    assert_eq!(articles.len(), 1);
    let article = &articles[0];
    assert_eq!(article.bot_id, "zoo");
    assert_eq!(article.url, "https://news.example/a");
    assert_eq!(article.used_keywords, vec!["zebra"]);
    // The analyst's rewrite is what gets persisted.
    assert_eq!(article.title, "[zoo] X");

    assert!(store.unwanted().is_empty());

    let events = notifier.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].url, "https://news.example/a");
    assert_eq!(events[0].image_url.as_deref(), Some("https://img.example/generated.png"));
}

#[tokio::test]
async fn excluded_and_unresolvable_links_become_unwanted_records() {
    let bot = profile("zoo", &["zebra"], &[]);
    let store = Arc::new(newsbot_pipeline::MemoryStore::new());

    // /live/ matches the settings' excluded term.
    let mut deps = default_deps(
        Arc::new(StaticSource(vec![
            candidate("zoo", "https://news.example/live/blog", 0),
            candidate("zoo", "https://news.example/ok", 0),
        ])),
        Arc::clone(&store),
    );
    deps.extractor = Arc::new(FixedExtractor::new("X", "zebra content"));

    let pipeline = Pipeline::new(deps, &settings());
    let report = pipeline.run_bot(&bot).await;

    assert!(report.success);
    assert_eq!(report.metrics.saved, 1);
    assert_eq!(report.metrics.filtered_count(RejectReason::FilteredOut), 1);

    let unwanted = store.unwanted();
    assert_eq!(unwanted.len(), 1);
    assert_eq!(unwanted[0].reason, RejectReason::FilteredOut);
    assert_eq!(unwanted[0].url, "https://news.example/live/blog");
}

#[tokio::test]
async fn unresolvable_links_are_invalid_url() {
    let bot = profile("zoo", &["zebra"], &[]);
    let store = Arc::new(newsbot_pipeline::MemoryStore::new());

    let mut deps = default_deps(
        Arc::new(StaticSource(vec![candidate("zoo", "gibberish", 0)])),
        Arc::clone(&store),
    );
    deps.resolver = Arc::new(NoneResolver);

    let pipeline = Pipeline::new(deps, &settings());
    let report = pipeline.run_bot(&bot).await;

    assert!(report.success);
    assert_eq!(report.metrics.saved, 0);
    assert_eq!(report.metrics.filtered_count(RejectReason::InvalidUrl), 1);
    assert_eq!(store.unwanted().len(), 1);
}

#[tokio::test]
async fn source_failure_short_circuits_the_run() {
    let bot = profile("zoo", &["zebra"], &[]);
    let store = Arc::new(newsbot_pipeline::MemoryStore::new());
    let deps = default_deps(Arc::new(FailingSource), Arc::clone(&store));

    let pipeline = Pipeline::new(deps, &settings());
    let report = pipeline.run_bot(&bot).await;

    assert!(!report.success);
    assert_eq!(
        report.metrics.error_count(newsbot_pipeline::ErrorKind::UrlProcessing),
        1
    );
    assert_eq!(report.metrics.processed, 0);
}

#[tokio::test]
async fn empty_source_is_not_a_successful_run() {
    let bot = profile("zoo", &["zebra"], &[]);
    let store = Arc::new(newsbot_pipeline::MemoryStore::new());
    let deps = default_deps(Arc::new(StaticSource(Vec::new())), Arc::clone(&store));

    let pipeline = Pipeline::new(deps, &settings());
    let report = pipeline.run_bot(&bot).await;

    assert!(!report.success);
    assert_eq!(report.metrics.total_found, 0);
    assert!(report.metrics.errors.is_empty());
}
