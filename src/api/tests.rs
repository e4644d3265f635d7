use super::*;
use crate::bus::EventBus;
use crate::camera::{ActivityType, CameraConfig, Detection, MovementPattern};
use crate::config::UrsaConfig;
use crate::coordinator::CorrelationConfig;
use crate::dispatch::{DispatchConfig, DispatchManager, SimulatedTelephony};
use crate::threat::{AnalyzerConfig, ThreatStore};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use std::time::Duration;
use tower::ServiceExt;

fn test_app() -> (Router, AppState) {
    let config = UrsaConfig::default();
    let store = std::sync::Arc::new(ThreatStore::new());
    let bus = EventBus::new(256);
    let sink = Arc::new(SimulatedTelephony);
    let dispatch = Arc::new(DispatchManager::new(
        store.clone(),
        sink.clone(),
        sink,
        config.community.clone(),
        config.cameras.clone(),
        bus.clone(),
        DispatchConfig::default(),
    ));
    let coordinator = Arc::new(Coordinator::new(
        config.cameras.clone(),
        store,
        dispatch,
        bus.clone(),
        AnalyzerConfig::default(),
        CorrelationConfig::default(),
    ));

    let (tx, _rx) = tokio::sync::mpsc::channel(64);
    let scenario = Arc::new(ScenarioRunner::new(
        Arc::clone(&coordinator),
        bus.clone(),
        CameraConfig::default(),
        tx,
        Duration::from_millis(2),
    ));

    let state = AppState {
        coordinator,
        scenario,
        bus,
    };
    let app = create_router(state.clone(), &config.api.allowed_origins);
    (app, state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn root_reports_service_status() {
    let (app, _state) = test_app();
    let (status, body) = get_json(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "URSA");
    assert_eq!(body["status"], "operational");
    assert_eq!(body["cameras"], 5);
}

#[tokio::test]
async fn cameras_endpoint_lists_registry() {
    let (app, _state) = test_app();
    let (status, body) = get_json(app, "/api/cameras").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 5);
    assert_eq!(body["cameras"][0]["id"], "cam_001");
}

#[tokio::test]
async fn threats_endpoint_reflects_store() {
    let (app, state) = test_app();

    let (_, body) = get_json(app.clone(), "/api/threats").await;
    assert_eq!(body["count"], 0);

    let camera = state.coordinator.cameras()[0].clone();
    state.coordinator.ingest(Detection {
        camera_id: camera.id.clone(),
        activity: ActivityType::CarProwling,
        confidence: 0.8,
        location: camera.location(),
        timestamp: Utc::now(),
        behavior: MovementPattern::SlowDeliberate,
    });

    let (_, body) = get_json(app, "/api/threats").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["threats"][0]["type"], "car_prowling");
    assert_eq!(body["threats"][0]["status"], "active");
}

#[tokio::test]
async fn patterns_endpoint_starts_empty() {
    let (app, _state) = test_app();
    let (status, body) = get_json(app, "/api/patterns").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn unknown_scenario_returns_not_found() {
    let (app, _state) = test_app();
    let (status, body) = post_json(app, "/api/scenarios/start?name=heist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn scenario_lifecycle_over_http() {
    let (app, state) = test_app();

    let (status, body) = post_json(app.clone(), "/api/scenarios/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert_eq!(body["scenario"], "car_prowler");

    let (status, body) = post_json(app.clone(), "/api/scenarios/start").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "already_running");

    let (_, body) = post_json(app.clone(), "/api/scenarios/stop").await;
    assert_eq!(body["status"], "stopped");
    assert!(!state.scenario.is_running());

    let (_, body) = post_json(app, "/api/scenarios/stop").await;
    assert_eq!(body["status"], "idle");
}
