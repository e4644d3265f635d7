use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use ursa::api::{create_router, AppState};
use ursa::bus::EventBus;
use ursa::config::{load_config, UrsaConfig};
use ursa::coordinator::Coordinator;
use ursa::dispatch::{DispatchManager, SimulatedTelephony};
use ursa::scenario::ScenarioRunner;
use ursa::threat::ThreatStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ursa=info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => UrsaConfig::default(),
    };

    info!(
        cameras = config.cameras.len(),
        community_members = config.community.len(),
        "Ursa starting..."
    );

    let bus = EventBus::new(config.runtime.bus_capacity);
    let store = Arc::new(ThreatStore::new());

    // No telephony transport is wired in this build; calls and SMS go to
    // the simulated sink, which logs what an operator would hear.
    let telephony = Arc::new(SimulatedTelephony);
    let dispatch = Arc::new(DispatchManager::new(
        store.clone(),
        telephony.clone(),
        telephony,
        config.community.clone(),
        config.cameras.clone(),
        bus.clone(),
        config.dispatch.clone(),
    ));

    let coordinator = Arc::new(Coordinator::new(
        config.cameras.clone(),
        store,
        dispatch,
        bus.clone(),
        config.analyzer.clone(),
        config.correlation.clone(),
    ));

    let (detections_tx, detections_rx) =
        tokio::sync::mpsc::channel(config.runtime.detection_channel_capacity);
    tokio::spawn(Arc::clone(&coordinator).run(detections_rx));

    let scenario = Arc::new(ScenarioRunner::new(
        Arc::clone(&coordinator),
        bus.clone(),
        config.camera.clone(),
        detections_tx,
        Duration::from_millis(config.runtime.tick_ms),
    ));

    let state = AppState {
        coordinator,
        scenario,
        bus,
    };
    let app = create_router(state, &config.api.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.api.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.api.bind_addr))?;
    info!(addr = %config.api.bind_addr, "API listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
