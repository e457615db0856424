//! Newsbot Pipeline — Binary Entrypoint
//! Boots the Axum HTTP surface (run trigger, bot listing, metrics) and wires
//! the pipeline's collaborators from configuration and environment.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsbot_pipeline::api::{self, AppState};
use newsbot_pipeline::extract::HttpContentExtractor;
use newsbot_pipeline::generate::{
    HttpBucketStorage, ObjectStorage, OpenAiAnalyst, OpenAiImageGenerator, PassthroughStorage,
};
use newsbot_pipeline::metrics::Metrics;
use newsbot_pipeline::notify::DiscordNotifier;
use newsbot_pipeline::resolve::HttpLinkResolver;
use newsbot_pipeline::similarity::OpenAiEmbeddingScorer;
use newsbot_pipeline::source::RssSourceReader;
use newsbot_pipeline::store::MemoryStore;
use newsbot_pipeline::{BotsConfig, Pipeline, PipelineDeps};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PIPELINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PIPELINE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsbot_pipeline=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = Arc::new(BotsConfig::load_default().expect("Failed to load bots config"));

    let storage: Arc<dyn ObjectStorage> = match HttpBucketStorage::from_env() {
        Some(bucket) => Arc::new(bucket),
        None => Arc::new(PassthroughStorage),
    };
    let deps = PipelineDeps {
        source: Arc::new(RssSourceReader::over_http()),
        resolver: Arc::new(HttpLinkResolver::new()),
        extractor: Arc::new(HttpContentExtractor::new()),
        scorer: Arc::new(OpenAiEmbeddingScorer::new(None)),
        analyst: Arc::new(OpenAiAnalyst::new(None)),
        imager: Arc::new(OpenAiImageGenerator::new(None)),
        storage,
        store: Arc::new(MemoryStore::new()),
        notifier: Arc::new(DiscordNotifier::from_env()),
    };
    let pipeline = Arc::new(Pipeline::new(deps, &config.settings));

    let metrics = Metrics::init(config.settings.max_concurrency);

    let state = AppState::new(config, pipeline);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
