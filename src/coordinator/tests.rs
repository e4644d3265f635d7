use super::*;
use crate::bus::EventBus;
use crate::camera::{ActivityType, Detection, MovementPattern};
use crate::dispatch::{DispatchConfig, DispatchManager, SimulatedTelephony};
use crate::threat::ThreatSeverity;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

fn demo_cameras() -> Vec<Camera> {
    [
        ("cam_001", 37.7749, -122.4194, "123 Oak St"),
        ("cam_002", 37.7755, -122.4200, "456 Pine Ave"),
        ("cam_003", 37.7761, -122.4206, "789 Elm Dr"),
        ("cam_004", 37.7743, -122.4188, "321 Maple Ln"),
        ("cam_005", 37.7757, -122.4192, "654 Cedar Rd"),
    ]
    .iter()
    .map(|(id, lat, lng, address)| Camera {
        id: id.to_string(),
        lat: *lat,
        lng: *lng,
        address: address.to_string(),
    })
    .collect()
}

fn detection_at(
    camera: &Camera,
    activity: ActivityType,
    confidence: f64,
    timestamp: DateTime<Utc>,
) -> Detection {
    Detection {
        camera_id: camera.id.clone(),
        activity,
        confidence,
        location: camera.location(),
        timestamp,
        behavior: MovementPattern::SlowDeliberate,
    }
}

fn test_coordinator() -> (Arc<Coordinator>, Arc<ThreatStore>, EventBus) {
    let cameras = demo_cameras();
    let store = Arc::new(ThreatStore::new());
    let bus = EventBus::new(256);
    let sink = Arc::new(SimulatedTelephony);
    let dispatch = Arc::new(DispatchManager::new(
        store.clone(),
        sink.clone(),
        sink,
        Vec::new(),
        cameras.clone(),
        bus.clone(),
        DispatchConfig::default(),
    ));
    let coordinator = Arc::new(Coordinator::new(
        cameras,
        store.clone(),
        dispatch,
        bus.clone(),
        AnalyzerConfig::default(),
        CorrelationConfig::default(),
    ));
    (coordinator, store, bus)
}

#[tokio::test]
async fn duplicate_detections_merge_into_one_threat() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.75, now));
    coordinator.ingest(detection_at(
        &cameras[0],
        ActivityType::CarProwling,
        0.82,
        now + Duration::seconds(5),
    ));

    let active = store.active_threats();
    assert_eq!(active.len(), 1);

    // Last writer wins on confidence/timestamp
    let threat = &active[0];
    assert_eq!(threat.camera_id, "cam_001");
    assert!((threat.confidence - 0.82).abs() < 1e-9);
    assert_eq!(threat.timestamp, now + Duration::seconds(5));
}

#[tokio::test]
async fn different_cameras_escalate_separately() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.8, now));
    coordinator.ingest(detection_at(&cameras[1], ActivityType::CarProwling, 0.8, now));

    assert_eq!(store.active_threats().len(), 2);
}

#[tokio::test]
async fn different_activities_escalate_separately() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.8, now));
    coordinator.ingest(detection_at(&cameras[0], ActivityType::Loitering, 0.8, now));

    assert_eq!(store.active_threats().len(), 2);
}

#[tokio::test]
async fn stale_threat_is_retired_and_replaced() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.8, now));
    let first_id = store.active_threats()[0].id;

    // Past the cooldown window: the old threat no longer absorbs detections
    coordinator.ingest(detection_at(
        &cameras[0],
        ActivityType::CarProwling,
        0.85,
        now + Duration::seconds(300),
    ));

    let active = store.active_threats();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id, first_id);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn threat_severity_comes_from_the_analyzer() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();

    coordinator.ingest(detection_at(
        &cameras[0],
        ActivityType::CarProwling,
        0.85,
        Utc::now(),
    ));

    let threat = &store.active_threats()[0];
    assert_eq!(threat.details.severity, ThreatSeverity::High);
}

#[tokio::test]
async fn pattern_created_on_second_matching_detection() {
    let (coordinator, _store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.75, now));
    assert!(coordinator.active_patterns().is_empty());

    coordinator.ingest(detection_at(
        &cameras[1],
        ActivityType::CarProwling,
        0.82,
        now + Duration::seconds(10),
    ));

    let patterns = coordinator.active_patterns();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].occurrence_count, 2);
}

#[tokio::test]
async fn prediction_extrapolates_travel_direction() {
    let (coordinator, _store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    // cam_001 -> cam_002 -> cam_003 lie on a straight line northwest
    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.75, now));
    coordinator.ingest(detection_at(
        &cameras[1],
        ActivityType::CarProwling,
        0.82,
        now + Duration::seconds(8),
    ));

    let patterns = coordinator.active_patterns();
    let predicted = patterns[0].predicted_next.as_ref().unwrap();
    assert_eq!(predicted.camera_id, "cam_003");
    assert!((predicted.confidence - 0.7).abs() < 1e-9);

    // A third confirming occurrence raises prediction confidence
    coordinator.ingest(detection_at(
        &cameras[2],
        ActivityType::CarProwling,
        0.88,
        now + Duration::seconds(15),
    ));

    let patterns = coordinator.active_patterns();
    let predicted = patterns[0].predicted_next.as_ref().unwrap();
    assert!(predicted.confidence > 0.7);
    assert!((predicted.confidence - 0.8).abs() < 1e-9);
    assert!(!["cam_001", "cam_002", "cam_003"].contains(&predicted.camera_id.as_str()));
}

#[tokio::test]
async fn detections_outside_window_do_not_correlate() {
    let (coordinator, _store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.75, now));
    // 90s later: past the 60s correlation window
    coordinator.ingest(detection_at(
        &cameras[1],
        ActivityType::CarProwling,
        0.82,
        now + Duration::seconds(90),
    ));

    assert!(coordinator.active_patterns().is_empty());
}

#[tokio::test]
async fn inactive_patterns_expire() {
    let (coordinator, _store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let now = Utc::now();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.75, now));
    coordinator.ingest(detection_at(
        &cameras[1],
        ActivityType::CarProwling,
        0.82,
        now + Duration::seconds(10),
    ));
    assert_eq!(coordinator.active_patterns().len(), 1);

    // An unrelated detection far past the inactivity timeout sweeps it out
    coordinator.ingest(detection_at(
        &cameras[3],
        ActivityType::Loitering,
        0.7,
        now + Duration::seconds(400),
    ));

    assert!(coordinator.active_patterns().is_empty());
}

#[tokio::test]
async fn non_eligible_detections_are_not_promoted() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::None, 0.9, Utc::now()));
    assert!(store.active_threats().is_empty());
}

#[tokio::test]
async fn resolve_all_clears_active_set() {
    let (coordinator, store, bus) = test_coordinator();
    let cameras = demo_cameras();
    let mut rx = bus.subscribe();

    coordinator.ingest(detection_at(&cameras[0], ActivityType::CarProwling, 0.8, Utc::now()));
    coordinator.resolve_all();

    assert!(store.active_threats().is_empty());

    // A ThreatUpdated event announced the resolution
    let mut saw_resolution = false;
    while let Ok(event) = rx.try_recv() {
        if let crate::bus::WatchEvent::ThreatUpdated(t) = event {
            if t.status == crate::threat::ThreatStatus::Resolved {
                saw_resolution = true;
            }
        }
    }
    assert!(saw_resolution);
}

#[tokio::test]
async fn run_consumes_the_detection_channel() {
    let (coordinator, store, _bus) = test_coordinator();
    let cameras = demo_cameras();
    let (tx, rx) = tokio::sync::mpsc::channel(16);

    let handle = tokio::spawn(Arc::clone(&coordinator).run(rx));

    tx.send(detection_at(&cameras[0], ActivityType::CarProwling, 0.8, Utc::now()))
        .await
        .unwrap();
    drop(tx);
    handle.await.unwrap();

    assert_eq!(store.active_threats().len(), 1);
}
