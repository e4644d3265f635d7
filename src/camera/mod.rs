use crate::bus::{EventBus, WatchEvent};
use crate::geo::{Camera, GeoPoint};
use crate::observation::ObservationBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub mod classify;
pub mod scoring;

pub use classify::{ClassifyConfig, MovementConfig};
pub use scoring::{ObjectSignals, ScoringConfig, SuspicionScore};

/// Categorical motion signature, derived per tick from the agent's rolling
/// motion window. Exactly one value per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Static,
    SlowDeliberate,
    Moderate,
    FastMovement,
    Erratic,
}

/// Closed set of activity classifications a camera can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    SuspiciousMovement,
    CarProwling,
    Loitering,
    Wildlife,
    Wildfire,
    LostPet,
    None,
}

impl ActivityType {
    pub fn is_dispatch_eligible(&self) -> bool {
        !matches!(self, ActivityType::None)
    }

    /// Wire/registry label (snake_case, matches the serde encoding)
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::SuspiciousMovement => "suspicious_movement",
            ActivityType::CarProwling => "car_prowling",
            ActivityType::Loitering => "loitering",
            ActivityType::Wildlife => "wildlife",
            ActivityType::Wildfire => "wildfire",
            ActivityType::LostPet => "lost_pet",
            ActivityType::None => "none",
        }
    }

    /// Human-readable form for call/SMS templates
    pub fn human(&self) -> String {
        self.label().replace('_', " ")
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An immutable detection emitted when a camera's suspicion score crosses
/// the activity threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub camera_id: String,

    #[serde(rename = "activity_type")]
    pub activity: ActivityType,

    pub confidence: f64,
    pub location: GeoPoint,
    pub timestamp: DateTime<Utc>,

    /// Movement pattern at emission time
    pub behavior: MovementPattern,
}

/// Append-only observability record describing why a detection fired.
/// Output-only; never read back by the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReasoningLogEntry {
    pub timestamp: DateTime<Utc>,
    pub camera_id: String,
    pub step: String,
    pub reasoning: String,
    pub evidence: Vec<String>,
    pub conclusion: String,
}

/// Per-activity detection thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_threshold")]
    pub suspicious_movement: f64,
    #[serde(default = "default_threshold")]
    pub car_prowling: f64,
    #[serde(default = "default_threshold")]
    pub loitering: f64,
    #[serde(default = "default_threshold")]
    pub wildlife: f64,
    #[serde(default = "default_threshold")]
    pub wildfire: f64,
    #[serde(default = "default_threshold")]
    pub lost_pet: f64,
}

fn default_threshold() -> f64 {
    0.60
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            suspicious_movement: default_threshold(),
            car_prowling: default_threshold(),
            loitering: default_threshold(),
            wildlife: default_threshold(),
            wildfire: default_threshold(),
            lost_pet: default_threshold(),
        }
    }
}

impl ThresholdConfig {
    pub fn for_activity(&self, activity: ActivityType) -> f64 {
        match activity {
            ActivityType::SuspiciousMovement => self.suspicious_movement,
            ActivityType::CarProwling => self.car_prowling,
            ActivityType::Loitering => self.loitering,
            ActivityType::Wildlife => self.wildlife,
            ActivityType::Wildfire => self.wildfire,
            ActivityType::LostPet => self.lost_pet,
            ActivityType::None => f64::INFINITY,
        }
    }
}

/// Camera agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Rolling motion window length in ticks
    #[serde(default = "default_motion_window")]
    pub motion_window: usize,
    /// Person-position history length in ticks (loitering detection)
    #[serde(default = "default_object_window")]
    pub object_window: usize,
    /// Bounded per-camera detection log capacity
    #[serde(default = "default_detection_log_cap")]
    pub detection_log_cap: usize,
    /// Bounded reasoning log capacity
    #[serde(default = "default_reasoning_log_cap")]
    pub reasoning_log_cap: usize,
    /// Cap applied to emitted confidence
    #[serde(default = "default_confidence_cap")]
    pub confidence_cap: f64,
}

fn default_motion_window() -> usize {
    30
}

fn default_object_window() -> usize {
    10
}

fn default_detection_log_cap() -> usize {
    50
}

fn default_reasoning_log_cap() -> usize {
    100
}

fn default_confidence_cap() -> f64 {
    0.95
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            movement: MovementConfig::default(),
            classify: ClassifyConfig::default(),
            thresholds: ThresholdConfig::default(),
            motion_window: default_motion_window(),
            object_window: default_object_window(),
            detection_log_cap: default_detection_log_cap(),
            reasoning_log_cap: default_reasoning_log_cap(),
            confidence_cap: default_confidence_cap(),
        }
    }
}

/// One camera's agent: turns a stream of observation bundles into
/// zero-or-more detections per tick.
pub struct CameraAgent {
    camera: Camera,
    config: CameraConfig,

    /// Rolling edge-density samples, oldest first
    motion_window: VecDeque<f64>,

    /// Per-tick person box centers, oldest first
    person_history: VecDeque<Vec<(f64, f64)>>,

    /// Bounded detection log (owner of emitted detections)
    detections: VecDeque<Detection>,

    /// Bounded reasoning log
    reasoning: VecDeque<ReasoningLogEntry>,

    bus: EventBus,
    detections_tx: mpsc::Sender<Detection>,
}

impl CameraAgent {
    pub fn new(
        camera: Camera,
        config: CameraConfig,
        bus: EventBus,
        detections_tx: mpsc::Sender<Detection>,
    ) -> Self {
        Self {
            camera,
            config,
            motion_window: VecDeque::new(),
            person_history: VecDeque::new(),
            detections: VecDeque::new(),
            reasoning: VecDeque::new(),
            bus,
            detections_tx,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera.id
    }

    pub fn recent_detections(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    pub fn reasoning_log(&self) -> impl Iterator<Item = &ReasoningLogEntry> {
        self.reasoning.iter()
    }

    /// Process one tick's bundle. Malformed bundles are logged and skipped;
    /// the agent keeps ticking.
    pub fn process_bundle(&mut self, bundle: &ObservationBundle) -> Option<Detection> {
        if let Err(e) = bundle.validate() {
            warn!(camera_id = %self.camera.id, error = %e, "Rejected malformed bundle");
            return None;
        }

        self.push_windows(bundle);

        let pattern = classify::movement_pattern(&self.motion_window, &self.config.movement);
        let signals = scoring::analyze_objects(
            bundle.detected_objects.as_deref(),
            &self.person_history,
            &self.config.scoring,
        );
        let score = scoring::suspicion_score(bundle, pattern, &signals, &self.config.scoring);

        let activity =
            classify::classify_activity(bundle, pattern, &signals, &self.config.classify);

        if activity == ActivityType::None {
            return None;
        }

        let threshold = self.config.thresholds.for_activity(activity);
        if score.value < threshold {
            debug!(
                camera_id = %self.camera.id,
                activity = %activity,
                score = score.value,
                threshold,
                "Below activity threshold, no detection"
            );
            return None;
        }

        let detection = Detection {
            camera_id: self.camera.id.clone(),
            activity,
            confidence: score.value.min(self.config.confidence_cap),
            location: self.camera.location(),
            timestamp: bundle.timestamp,
            behavior: pattern,
        };

        self.append_detection(detection.clone());
        self.log_reasoning(&detection, &score);

        info!(
            camera_id = %self.camera.id,
            activity = %activity,
            confidence = detection.confidence,
            "Detection emitted"
        );
        self.bus.publish(WatchEvent::Detection(detection.clone()));

        Some(detection)
    }

    fn push_windows(&mut self, bundle: &ObservationBundle) {
        self.motion_window.push_back(bundle.edge_density);
        while self.motion_window.len() > self.config.motion_window {
            self.motion_window.pop_front();
        }

        let centers: Vec<(f64, f64)> = bundle
            .detected_objects
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|o| o.is_person() && o.confidence > self.config.scoring.object_confidence_min)
            .map(|o| o.center())
            .collect();
        self.person_history.push_back(centers);
        while self.person_history.len() > self.config.object_window {
            self.person_history.pop_front();
        }
    }

    fn append_detection(&mut self, detection: Detection) {
        self.detections.push_back(detection);
        while self.detections.len() > self.config.detection_log_cap {
            self.detections.pop_front();
        }
    }

    fn log_reasoning(&mut self, detection: &Detection, score: &SuspicionScore) {
        let mut evidence: Vec<String> = score
            .factors
            .iter()
            .map(|(name, delta)| format!("{}: {:+.2}", name, delta))
            .collect();
        evidence.push(format!(
            "Motion detected at {:.4}, {:.4}",
            detection.location.lat, detection.location.lng
        ));
        evidence.push(format!("Behavior pattern matches: {:?}", detection.behavior));

        let entry = ReasoningLogEntry {
            timestamp: Utc::now(),
            camera_id: self.camera.id.clone(),
            step: "detection".to_string(),
            reasoning: format!(
                "Detected {} with {:.0}% confidence",
                detection.activity.human(),
                detection.confidence * 100.0
            ),
            evidence,
            conclusion: format!("Threat identified: {}", detection.activity),
        };

        self.reasoning.push_back(entry.clone());
        while self.reasoning.len() > self.config.reasoning_log_cap {
            self.reasoning.pop_front();
        }

        self.bus.publish(WatchEvent::Reasoning(entry));
    }

    /// Agent task: consume bundles until the source closes or shutdown is
    /// signaled, forwarding detections to the coordinator.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<ObservationBundle>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(camera_id = %self.camera.id, "Camera agent started");
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let bundle = match maybe {
                        Some(b) => b,
                        None => break,
                    };
                    if let Some(detection) = self.process_bundle(&bundle) {
                        if self.detections_tx.send(detection).await.is_err() {
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(camera_id = %self.camera.id, "Camera agent stopped");
    }
}
