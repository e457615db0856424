use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::pipeline::report::RunReport;
use crate::pipeline::Pipeline;
use crate::profile::BotsConfig;

#[derive(Clone)]
pub struct AppState {
    config: Arc<BotsConfig>,
    pipeline: Arc<Pipeline>,
    last_reports: Arc<RwLock<HashMap<String, RunReport>>>,
}

impl AppState {
    pub fn new(config: Arc<BotsConfig>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            last_reports: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/bots", get(list_bots))
        .route("/run/{bot_id}", post(run_bot))
        .route("/debug/last-report", get(debug_last_report))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct BotSummary {
    id: String,
    name: String,
    source_url: String,
    keywords: usize,
    blacklist: usize,
    similarity_threshold: f32,
}

async fn list_bots(State(state): State<AppState>) -> Json<Vec<BotSummary>> {
    let out = state
        .config
        .bots
        .iter()
        .map(|b| BotSummary {
            id: b.id.clone(),
            name: b.name.clone(),
            source_url: b.source_url.clone(),
            keywords: b.keywords.len(),
            blacklist: b.blacklist.len(),
            similarity_threshold: b.similarity_threshold,
        })
        .collect();
    Json(out)
}

async fn run_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Result<Json<RunReport>, (StatusCode, String)> {
    let Some(profile) = state.config.bot(&bot_id).cloned() else {
        return Err((StatusCode::NOT_FOUND, format!("unknown bot '{bot_id}'")));
    };

    let report = state.pipeline.run_bot(&profile).await;
    state
        .last_reports
        .write()
        .expect("reports rwlock poisoned")
        .insert(bot_id, report.clone());
    Ok(Json(report))
}

async fn debug_last_report(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Option<RunReport>> {
    let bot = q.get("bot").cloned().unwrap_or_default();
    let report = state
        .last_reports
        .read()
        .expect("reports rwlock poisoned")
        .get(&bot)
        .cloned();
    Json(report)
}
