use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::SolverConfig;
use crate::data::{Assignment, GenerationRun, GenerationResult};
use crate::error::StoreError;
use crate::solver;
use crate::store::{Dataset, MemoryStore, TimetableStore};

pub struct AppState {
    store: Arc<MemoryStore>,
    /// One in-flight solve at a time; the clear-then-insert step assumes
    /// exclusivity over the assignment set.
    solve_gate: Mutex<()>,
}

pub fn router(store: Arc<MemoryStore>) -> Router {
    let state = Arc::new(AppState {
        store,
        solve_gate: Mutex::new(()),
    });
    Router::new()
        .route("/v1/timetable/generate", post(generate))
        .route("/v1/timetable", get(timetable))
        .route("/v1/generations", get(generations))
        .route("/v1/dataset", put(put_dataset))
        .with_state(state)
}

/// Runs one generation. The body is an optional partial [`SolverConfig`];
/// the response is always the structured result, success or failure.
async fn generate(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SolverConfig>>,
) -> Json<GenerationResult> {
    let Json(config) = body.unwrap_or_else(|| Json(SolverConfig::default()));
    let _gate = state.solve_gate.lock().await;
    let store = Arc::clone(&state.store);
    let solve =
        tokio::task::spawn_blocking(move || solver::generate_timetable(store.as_ref(), &config));
    match solve.await {
        Ok(result) => Json(result),
        Err(err) => Json(GenerationResult::Failed {
            solver_status: "error".to_string(),
            error: format!("solver task failed: {err}"),
            solve_time: None,
        }),
    }
}

async fn timetable(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Assignment>>, (StatusCode, String)> {
    state.store.list_assignments().map(Json).map_err(internal)
}

async fn generations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GenerationRun>>, (StatusCode, String)> {
    state
        .store
        .list_generation_runs()
        .map(Json)
        .map_err(internal)
}

/// Bulk-replaces the entity dataset. Per-entity CRUD stays with the
/// excluded persistence layer; this is the data-provider plumbing the
/// in-memory store needs.
async fn put_dataset(
    State(state): State<Arc<AppState>>,
    Json(dataset): Json<Dataset>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .replace_dataset(dataset)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(internal)
}

fn internal(err: StoreError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub async fn run_server(store: MemoryStore) {
    let app = router(Arc::new(store));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();

    info!("server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
