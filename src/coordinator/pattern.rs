use crate::camera::{ActivityType, Detection, MovementPattern};
use crate::geo::{self, Camera, GeoPoint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// What makes two detections "the same behavior" for correlation purposes.
/// Activity alone would correlate a loiterer with a prowler; movement alone
/// would correlate wildlife with people.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviorSignature {
    pub activity: ActivityType,
    pub movement: MovementPattern,
}

impl BehaviorSignature {
    pub fn of(detection: &Detection) -> Self {
        Self {
            activity: detection.activity,
            movement: detection.behavior,
        }
    }
}

/// Where the pattern is expected to show up next.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredictedNext {
    pub camera_id: String,
    pub location: GeoPoint,
    pub confidence: f64,
    pub reasoning: String,
}

/// A correlated multi-camera sequence of detections sharing a behavior
/// signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pattern {
    pub id: Uuid,
    pub signature: BehaviorSignature,
    pub occurrences: Vec<Detection>,
    pub occurrence_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub predicted_next: Option<PredictedNext>,
}

/// Correlation and promotion timing knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationConfig {
    /// A detection joins a pattern seen within this many seconds
    #[serde(default = "default_correlation_window_secs")]
    pub correlation_window_secs: i64,
    /// Patterns with no match for this long are expired
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: i64,
    /// An active threat older than this no longer absorbs new detections
    #[serde(default = "default_threat_cooldown_secs")]
    pub threat_cooldown_secs: i64,
    /// Bounded per-pattern occurrence history
    #[serde(default = "default_occurrence_cap")]
    pub occurrence_cap: usize,

    // Prediction confidence: base + step per occurrence, capped
    #[serde(default = "default_prediction_base")]
    pub prediction_base: f64,
    #[serde(default = "default_prediction_step")]
    pub prediction_step: f64,
    #[serde(default = "default_prediction_cap")]
    pub prediction_cap: f64,
}

fn default_correlation_window_secs() -> i64 {
    60
}
fn default_inactivity_timeout_secs() -> i64 {
    300
}
fn default_threat_cooldown_secs() -> i64 {
    120
}
fn default_occurrence_cap() -> usize {
    25
}
fn default_prediction_base() -> f64 {
    0.5
}
fn default_prediction_step() -> f64 {
    0.1
}
fn default_prediction_cap() -> f64 {
    0.9
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            correlation_window_secs: default_correlation_window_secs(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            threat_cooldown_secs: default_threat_cooldown_secs(),
            occurrence_cap: default_occurrence_cap(),
            prediction_base: default_prediction_base(),
            prediction_step: default_prediction_step(),
            prediction_cap: default_prediction_cap(),
        }
    }
}

/// Owns the active pattern set plus the pending first-detection slots.
/// Single-writer: only the coordinator's ingest task calls `observe`.
pub struct PatternTracker {
    patterns: Vec<Pattern>,
    pending: HashMap<BehaviorSignature, Detection>,
    config: CorrelationConfig,
}

impl PatternTracker {
    pub fn new(config: CorrelationConfig) -> Self {
        Self {
            patterns: Vec::new(),
            pending: HashMap::new(),
            config,
        }
    }

    pub fn active_patterns(&self) -> Vec<Pattern> {
        self.patterns.clone()
    }

    /// Feed one detection through correlation. Returns a snapshot of the
    /// pattern it joined or created; `None` while the first detection of a
    /// signature waits in its pending slot.
    pub fn observe(&mut self, detection: &Detection, cameras: &[Camera]) -> Option<Pattern> {
        let now = detection.timestamp;
        self.expire(now);

        let signature = BehaviorSignature::of(detection);
        let window = Duration::seconds(self.config.correlation_window_secs);

        // Join an existing pattern seen within the window
        if let Some(pattern) = self.patterns.iter_mut().find(|p| {
            p.signature == signature && now.signed_duration_since(p.last_seen_at) <= window
        }) {
            pattern.occurrences.push(detection.clone());
            while pattern.occurrences.len() > self.config.occurrence_cap {
                pattern.occurrences.remove(0);
            }
            pattern.occurrence_count += 1;
            pattern.last_seen_at = now;
            pattern.predicted_next = predict(pattern, cameras, &self.config);
            return Some(pattern.clone());
        }

        // Pair with a pending unmatched detection to create a pattern
        if let Some(first) = self.pending.remove(&signature) {
            if now.signed_duration_since(first.timestamp) <= window {
                let mut pattern = Pattern {
                    id: Uuid::new_v4(),
                    signature,
                    occurrences: vec![first, detection.clone()],
                    occurrence_count: 2,
                    created_at: now,
                    last_seen_at: now,
                    predicted_next: None,
                };
                pattern.predicted_next = predict(&pattern, cameras, &self.config);
                self.patterns.push(pattern.clone());
                return Some(pattern);
            }
            // Pending entry aged out; this detection takes its place
        }

        self.pending.insert(signature, detection.clone());
        None
    }

    /// Drop patterns past the inactivity timeout and stale pending slots.
    fn expire(&mut self, now: DateTime<Utc>) {
        let timeout = Duration::seconds(self.config.inactivity_timeout_secs);
        self.patterns
            .retain(|p| now.signed_duration_since(p.last_seen_at) <= timeout);

        let window = Duration::seconds(self.config.correlation_window_secs);
        self.pending
            .retain(|_, d| now.signed_duration_since(d.timestamp) <= window);
    }
}

/// Extrapolate the travel vector from the two most recent occurrences and
/// pick the nearest not-yet-visited camera to the projected point.
/// Confidence grows with occurrence count, capped.
fn predict(
    pattern: &Pattern,
    cameras: &[Camera],
    config: &CorrelationConfig,
) -> Option<PredictedNext> {
    if pattern.occurrence_count < 2 || pattern.occurrences.len() < 2 {
        return None;
    }

    let last = &pattern.occurrences[pattern.occurrences.len() - 1];
    let prev = &pattern.occurrences[pattern.occurrences.len() - 2];

    let projected = GeoPoint::new(
        last.location.lat + (last.location.lat - prev.location.lat),
        last.location.lng + (last.location.lng - prev.location.lng),
    );

    let visited: Vec<&str> = pattern
        .occurrences
        .iter()
        .map(|o| o.camera_id.as_str())
        .collect();

    let target = geo::nearest_camera(cameras, projected, |id| visited.contains(&id))?;

    let confidence = (config.prediction_base
        + config.prediction_step * pattern.occurrence_count as f64)
        .min(config.prediction_cap);

    Some(PredictedNext {
        camera_id: target.id.clone(),
        location: target.location(),
        confidence,
        reasoning: format!(
            "Pattern detected: {} similar incidents",
            pattern.occurrence_count
        ),
    })
}
