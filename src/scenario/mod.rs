use crate::bus::{EventBus, WatchEvent};
use crate::camera::{CameraAgent, CameraConfig, Detection};
use crate::coordinator::Coordinator;
use crate::observation::{spawn_source, DetectedObject, PhaseSpec, SyntheticSource};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;

#[cfg(test)]
mod tests;

/// Errors starting a scenario
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioError {
    Unknown(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Unknown(name) => write!(f, "unknown scenario '{}'", name),
        }
    }
}

impl std::error::Error for ScenarioError {}

struct RunningScenario {
    name: String,
    shutdown: watch::Sender<bool>,
}

/// Drives scripted demo scenarios: spawns a synthetic source and an agent
/// per camera, stops them via a shared shutdown signal, and resolves all
/// active threats on stop without aborting outstanding dispatch work.
pub struct ScenarioRunner {
    coordinator: Arc<Coordinator>,
    bus: EventBus,
    camera_config: CameraConfig,
    detections_tx: mpsc::Sender<Detection>,
    tick: Duration,
    state: Mutex<Option<RunningScenario>>,
}

impl ScenarioRunner {
    pub fn new(
        coordinator: Arc<Coordinator>,
        bus: EventBus,
        camera_config: CameraConfig,
        detections_tx: mpsc::Sender<Detection>,
        tick: Duration,
    ) -> Self {
        Self {
            coordinator,
            bus,
            camera_config,
            detections_tx,
            tick,
            state: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_some()
    }

    pub fn current(&self) -> Option<String> {
        self.lock_state().as_ref().map(|r| r.name.clone())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<RunningScenario>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start a named scenario. Returns Ok(false) if one is already running.
    pub fn start(&self, name: &str) -> Result<bool, ScenarioError> {
        let script = match name {
            "car_prowler" => car_prowler_script(),
            "wildfire_watch" => wildfire_watch_script(),
            other => return Err(ScenarioError::Unknown(other.to_string())),
        };

        let mut state = self.lock_state();
        if state.is_some() {
            return Ok(false);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        for camera in self.coordinator.cameras() {
            let phases = script
                .get(camera.id.as_str())
                .cloned()
                .unwrap_or_else(|| vec![PhaseSpec::calm(script_ticks(&script))]);

            let (bundle_tx, bundle_rx) = mpsc::channel(32);
            spawn_source(
                SyntheticSource::new(camera.id.clone(), phases),
                self.tick,
                bundle_tx,
                shutdown_rx.clone(),
            );

            let agent = CameraAgent::new(
                camera.clone(),
                self.camera_config.clone(),
                self.bus.clone(),
                self.detections_tx.clone(),
            );
            tokio::spawn(agent.run(bundle_rx, shutdown_rx.clone()));
        }

        info!(scenario = %name, "Scenario started");
        self.bus.publish(WatchEvent::ScenarioStarted {
            scenario: name.to_string(),
        });
        *state = Some(RunningScenario {
            name: name.to_string(),
            shutdown: shutdown_tx,
        });
        Ok(true)
    }

    /// Stop the running scenario: halt tick generation, resolve all active
    /// threats. In-flight dispatch calls complete or fail on their own.
    pub fn stop(&self) -> bool {
        let running = match self.lock_state().take() {
            Some(r) => r,
            None => return false,
        };

        let _ = running.shutdown.send(true);
        self.coordinator.resolve_all();

        info!(scenario = %running.name, "Scenario stopped");
        self.bus.publish(WatchEvent::ScenarioStopped {
            scenario: running.name,
        });
        true
    }
}

type Script = HashMap<&'static str, Vec<PhaseSpec>>;

fn script_ticks(script: &Script) -> u32 {
    script
        .values()
        .map(|phases| phases.iter().map(|p| p.ticks).sum())
        .max()
        .unwrap_or(0)
}

/// A prowler working parked cars: detected near a vehicle at cam_001, then
/// cam_002, then cam_003, each pass a little more blatant.
fn car_prowler_script() -> Script {
    let mut script = Script::new();
    script.insert(
        "cam_001",
        vec![
            PhaseSpec::calm(6),
            prowl_phase(20, 0.65),
            PhaseSpec::calm(34),
        ],
    );
    script.insert(
        "cam_002",
        vec![
            PhaseSpec::calm(22),
            prowl_phase(20, 0.70),
            PhaseSpec::calm(18),
        ],
    );
    script.insert(
        "cam_003",
        vec![PhaseSpec::calm(38), prowl_phase(20, 0.75), PhaseSpec::calm(2)],
    );
    script
}

fn prowl_phase(ticks: u32, persistence: f64) -> PhaseSpec {
    PhaseSpec {
        ticks,
        edge_density: 0.13,
        intensity_stddev: 45.0,
        motion_consistency: 0.45,
        motion_speed: 0.05,
        persistence_ratio: persistence,
        objects: Some(vec![
            DetectedObject {
                class: "person".to_string(),
                confidence: 0.88,
                bbox: [290.0, 260.0, 310.0, 340.0],
            },
            DetectedObject {
                class: "car".to_string(),
                confidence: 0.92,
                bbox: [320.0, 250.0, 450.0, 330.0],
            },
        ]),
        jitter: 0.01,
    }
}

/// Smoke spreading into view of cam_004.
fn wildfire_watch_script() -> Script {
    let mut script = Script::new();
    script.insert(
        "cam_004",
        vec![
            PhaseSpec::calm(6),
            PhaseSpec {
                ticks: 24,
                edge_density: 0.30,
                intensity_stddev: 70.0,
                motion_consistency: 0.50,
                motion_speed: 0.12,
                persistence_ratio: 0.80,
                objects: Some(vec![DetectedObject {
                    class: "smoke".to_string(),
                    confidence: 0.85,
                    bbox: [0.0, 0.0, 400.0, 300.0],
                }]),
                jitter: 0.01,
            },
        ],
    );
    script
}
