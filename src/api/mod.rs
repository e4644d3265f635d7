use crate::coordinator::Coordinator;
use crate::scenario::{ScenarioError, ScenarioRunner};
use axum::{
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

pub mod websocket;
#[cfg(test)]
mod tests;

pub use websocket::ws_handler;

/// Shared application state for the HTTP/WS surface
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub scenario: Arc<ScenarioRunner>,
    pub bus: crate::bus::EventBus,
}

/// GET / - service descriptor
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": "URSA",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "cameras": state.coordinator.cameras().len(),
        "description": "Neighborhood watch detection network",
    }))
}

/// GET /api/cameras - camera registry
async fn get_cameras(State(state): State<AppState>) -> impl IntoResponse {
    let cameras = state.coordinator.cameras();
    Json(json!({
        "cameras": cameras,
        "count": cameras.len(),
    }))
}

/// GET /api/threats - active threats
async fn get_threats(State(state): State<AppState>) -> impl IntoResponse {
    let threats = state.coordinator.store().active_threats();
    Json(json!({
        "threats": threats,
        "count": threats.len(),
    }))
}

/// GET /api/patterns - active correlation patterns
async fn get_patterns(State(state): State<AppState>) -> impl IntoResponse {
    let patterns = state.coordinator.active_patterns();
    Json(json!({
        "patterns": patterns,
        "count": patterns.len(),
    }))
}

#[derive(Deserialize)]
struct StartQuery {
    #[serde(default = "default_scenario")]
    name: String,
}

fn default_scenario() -> String {
    "car_prowler".to_string()
}

/// POST /api/scenarios/start - start a demo scenario
async fn start_scenario(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> impl IntoResponse {
    match state.scenario.start(&query.name) {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({ "status": "started", "scenario": query.name })),
        ),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "already_running", "scenario": state.scenario.current() })),
        ),
        Err(ScenarioError::Unknown(name)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": format!("unknown scenario '{}'", name) })),
        ),
    }
}

/// POST /api/scenarios/stop - stop the running scenario
async fn stop_scenario(State(state): State<AppState>) -> impl IntoResponse {
    if state.scenario.stop() {
        Json(json!({ "status": "stopped" }))
    } else {
        Json(json!({ "status": "idle" }))
    }
}

/// Build the full router with CORS for the demo UI origins.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/", get(root))
        .route("/api/cameras", get(get_cameras))
        .route("/api/threats", get(get_threats))
        .route("/api/patterns", get(get_patterns))
        .route("/api/scenarios/start", post(start_scenario))
        .route("/api/scenarios/stop", post(stop_scenario))
        .route("/api/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}
