// End-to-end pipeline tests: synthetic sources -> camera agents ->
// coordinator -> analyzer -> dispatch, observed through the store and bus.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ursa::bus::EventBus;
use ursa::camera::{ActivityType, CameraAgent, CameraConfig};
use ursa::config::UrsaConfig;
use ursa::coordinator::{Coordinator, CorrelationConfig};
use ursa::dispatch::{
    CallOutcome, DispatchConfig, DispatchManager, EmergencyCallSink, NotificationSink, SendOutcome,
};
use ursa::observation::{spawn_source, PhaseSpec, SyntheticSource};
use ursa::threat::{AnalyzerConfig, DispatchStatus, ThreatStore};

/// Sink that counts invocations per destination.
struct RecordingSink {
    calls: AtomicUsize,
    messages: AtomicUsize,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            messages: AtomicUsize::new(0),
        })
    }
}

impl EmergencyCallSink for RecordingSink {
    fn place_call<'a>(&'a self, _to: &'a str, _message: &'a str) -> BoxFuture<'a, CallOutcome> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CallOutcome {
                status: DispatchStatus::Queued,
                call_id: Some("itest-call".to_string()),
            }
        }
        .boxed()
    }
}

impl NotificationSink for RecordingSink {
    fn send_message<'a>(&'a self, _to: &'a str, _message: &'a str) -> BoxFuture<'a, SendOutcome> {
        async move {
            self.messages.fetch_add(1, Ordering::SeqCst);
            SendOutcome {
                status: DispatchStatus::Sent,
            }
        }
        .boxed()
    }
}

struct Stack {
    coordinator: Arc<Coordinator>,
    store: Arc<ThreatStore>,
    bus: EventBus,
    sink: Arc<RecordingSink>,
    detections_tx: tokio::sync::mpsc::Sender<ursa::camera::Detection>,
}

fn build_stack() -> Stack {
    let config = UrsaConfig::default();
    let store = Arc::new(ThreatStore::new());
    let bus = EventBus::new(1024);
    let sink = RecordingSink::new();
    let dispatch = Arc::new(DispatchManager::new(
        store.clone(),
        sink.clone(),
        sink.clone(),
        config.community.clone(),
        config.cameras.clone(),
        bus.clone(),
        DispatchConfig::default(),
    ));
    let coordinator = Arc::new(Coordinator::new(
        config.cameras.clone(),
        store.clone(),
        dispatch,
        bus.clone(),
        AnalyzerConfig::default(),
        CorrelationConfig::default(),
    ));

    let (tx, rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(Arc::clone(&coordinator).run(rx));

    Stack {
        coordinator,
        store,
        bus,
        sink,
        detections_tx: tx,
    }
}

/// A phase whose motion-only profile reads as deliberate prowling. The
/// object detector is down the whole time (objects = None).
fn detector_down_prowl(ticks: u32) -> PhaseSpec {
    PhaseSpec {
        ticks,
        edge_density: 0.14,
        intensity_stddev: 45.0,
        motion_consistency: 0.45,
        motion_speed: 0.05,
        persistence_ratio: 0.75,
        objects: None,
        jitter: 0.0,
    }
}

#[tokio::test]
async fn detector_outage_still_produces_threats() {
    let stack = build_stack();
    let cameras = stack.coordinator.cameras().to_vec();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // One camera, object detector unavailable for the entire run
    let camera = cameras[0].clone();
    let (bundle_tx, bundle_rx) = tokio::sync::mpsc::channel(32);
    spawn_source(
        SyntheticSource::new(camera.id.clone(), vec![detector_down_prowl(20)]),
        Duration::from_millis(2),
        bundle_tx,
        shutdown_rx.clone(),
    );
    let agent = CameraAgent::new(
        camera,
        CameraConfig::default(),
        stack.bus.clone(),
        stack.detections_tx.clone(),
    );
    tokio::spawn(agent.run(bundle_rx, shutdown_rx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let _ = shutdown_tx.send(true);

    // Motion-only scoring produced detections, and dedup collapsed them
    // into a single active threat for (cam_001, car_prowling)
    let active = stack.store.active_threats();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].activity, ActivityType::CarProwling);
    assert_eq!(active[0].camera_id, "cam_001");
}

#[tokio::test]
async fn cross_camera_run_correlates_and_dispatches_once_per_threat() {
    let stack = build_stack();
    let cameras = stack.coordinator.cameras().to_vec();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Staggered prowler pass over three cameras, fast ticks
    let stagger: HashMap<&str, u32> =
        [("cam_001", 0), ("cam_002", 25), ("cam_003", 50)].into();
    for camera in &cameras[..3] {
        let lead = stagger[camera.id.as_str()];
        let mut phases = Vec::new();
        if lead > 0 {
            phases.push(PhaseSpec::calm(lead));
        }
        phases.push(detector_down_prowl(25));

        let (bundle_tx, bundle_rx) = tokio::sync::mpsc::channel(32);
        spawn_source(
            SyntheticSource::new(camera.id.clone(), phases),
            Duration::from_millis(2),
            bundle_tx,
            shutdown_rx.clone(),
        );
        let agent = CameraAgent::new(
            camera.clone(),
            CameraConfig::default(),
            stack.bus.clone(),
            stack.detections_tx.clone(),
        );
        tokio::spawn(agent.run(bundle_rx, shutdown_rx.clone()));
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Dedup invariant: at most one active threat per (camera, activity)
    let active = stack.store.active_threats();
    assert!(!active.is_empty());
    let mut keys: Vec<(String, &'static str)> = active
        .iter()
        .map(|t| (t.camera_id.clone(), t.activity.label()))
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), active.len(), "duplicate active threat keys");

    // A cross-camera pattern formed
    let patterns = stack.coordinator.active_patterns();
    assert!(!patterns.is_empty());
    let multi_camera = patterns.iter().any(|p| {
        let mut cams: Vec<&str> = p.occurrences.iter().map(|o| o.camera_id.as_str()).collect();
        cams.dedup();
        cams.len() >= 2
    });
    assert!(multi_camera, "expected a pattern spanning cameras");

    // Idempotent dispatch: every attempted call maps to exactly one threat
    let attempted: usize = stack
        .store
        .all_threats()
        .iter()
        .filter(|t| t.dispatch.emergency_call.attempted)
        .count();
    assert_eq!(stack.sink.calls.load(Ordering::SeqCst), attempted);

    // Community fan-out reached the registered member (within 50 units)
    assert!(stack.sink.messages.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn scenario_stop_resolves_but_does_not_unrecord_dispatch() {
    let stack = build_stack();
    let camera = stack.coordinator.cameras()[0].clone();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let (bundle_tx, bundle_rx) = tokio::sync::mpsc::channel(32);
    spawn_source(
        SyntheticSource::new(camera.id.clone(), vec![detector_down_prowl(15)]),
        Duration::from_millis(2),
        bundle_tx,
        shutdown_rx.clone(),
    );
    let agent = CameraAgent::new(
        camera,
        CameraConfig::default(),
        stack.bus.clone(),
        stack.detections_tx.clone(),
    );
    tokio::spawn(agent.run(bundle_rx, shutdown_rx));

    tokio::time::sleep(Duration::from_millis(250)).await;
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls_before = stack.sink.calls.load(Ordering::SeqCst);
    stack.coordinator.resolve_all();

    assert!(stack.store.active_threats().is_empty());
    // Resolution does not retract or re-fire dispatch
    assert_eq!(stack.sink.calls.load(Ordering::SeqCst), calls_before);
    let record = &stack.store.all_threats()[0];
    if record.dispatch.emergency_call.attempted {
        assert!(record.dispatch.emergency_call.status.is_some());
    }
}

#[test]
fn config_file_loads_from_disk() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[runtime]
tick_ms = 50

[dispatch]
notification_radius = 10.0

[[community]]
contact_id = "c9"
name = "Edge Dweller"
lat = 37.7
lng = -122.4
"#
    )
    .unwrap();

    let config = ursa::config::load_config(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.runtime.tick_ms, 50);
    assert_eq!(config.dispatch.notification_radius, 10.0);
    assert_eq!(config.community.len(), 1);
    assert_eq!(config.community[0].contact_id, "c9");
    // Unspecified sections keep their defaults
    assert_eq!(config.cameras.len(), 5);
    assert_eq!(config.camera.thresholds.wildfire, 0.60);
}
