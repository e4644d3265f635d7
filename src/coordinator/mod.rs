use crate::bus::{EventBus, WatchEvent};
use crate::camera::Detection;
use crate::dispatch::DispatchManager;
use crate::geo::Camera;
use crate::threat::{
    analyze, AnalyzerConfig, Threat, ThreatDetails, ThreatKey, ThreatStatus, ThreatStore,
};
use chrono::Duration;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod pattern;
#[cfg(test)]
mod tests;

pub use pattern::{BehaviorSignature, CorrelationConfig, Pattern, PatternTracker, PredictedNext};

/// Correlates detections across cameras into patterns and promotes
/// qualifying activity to threats.
///
/// Single logical owner of the pattern and threat sets: all mutation runs
/// on the one task draining the detection channel; reads are lock-free via
/// the shared store.
pub struct Coordinator {
    cameras: Vec<Camera>,
    store: Arc<ThreatStore>,
    patterns: Mutex<PatternTracker>,
    bus: EventBus,
    dispatch: Arc<DispatchManager>,
    analyzer: AnalyzerConfig,
    config: CorrelationConfig,
}

impl Coordinator {
    pub fn new(
        cameras: Vec<Camera>,
        store: Arc<ThreatStore>,
        dispatch: Arc<DispatchManager>,
        bus: EventBus,
        analyzer: AnalyzerConfig,
        config: CorrelationConfig,
    ) -> Self {
        Self {
            cameras,
            store,
            patterns: Mutex::new(PatternTracker::new(config.clone())),
            bus,
            dispatch,
            analyzer,
            config,
        }
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn store(&self) -> &Arc<ThreatStore> {
        &self.store
    }

    pub fn active_patterns(&self) -> Vec<Pattern> {
        match self.patterns.lock() {
            Ok(tracker) => tracker.active_patterns(),
            Err(poisoned) => poisoned.into_inner().active_patterns(),
        }
    }

    /// Process one detection: correlate, then promote.
    pub fn ingest(&self, detection: Detection) {
        let pattern_id = self.correlate(&detection);
        self.promote(detection, pattern_id);
    }

    fn correlate(&self, detection: &Detection) -> Option<Uuid> {
        let updated = {
            let mut tracker = match self.patterns.lock() {
                Ok(t) => t,
                Err(poisoned) => poisoned.into_inner(),
            };
            tracker.observe(detection, &self.cameras)
        };

        updated.map(|pattern| {
            let id = pattern.id;
            if let Some(next) = &pattern.predicted_next {
                info!(
                    pattern_id = %id,
                    occurrences = pattern.occurrence_count,
                    predicted_camera = %next.camera_id,
                    prediction_confidence = next.confidence,
                    "Pattern updated with prediction"
                );
            }
            self.bus.publish(WatchEvent::PatternUpdated(pattern));
            id
        })
    }

    /// Promote a detection to a threat, or merge it into the active one
    /// holding the same (camera, activity) key.
    fn promote(&self, detection: Detection, pattern_id: Option<Uuid>) {
        if !detection.activity.is_dispatch_eligible() {
            return;
        }

        let key = ThreatKey {
            camera_id: detection.camera_id.clone(),
            activity: detection.activity,
        };
        let assessment = analyze(detection.activity, detection.confidence, &self.analyzer);

        if let Some(existing_id) = self.store.active_id(&key) {
            let cooldown = Duration::seconds(self.config.threat_cooldown_secs);
            let stale = match self.store.get(&existing_id) {
                Some(existing) => {
                    detection.timestamp.signed_duration_since(existing.timestamp) > cooldown
                }
                None => true,
            };

            if !stale {
                if let Some(merged) = self.store.merge(
                    &existing_id,
                    detection.confidence,
                    detection.timestamp,
                    assessment.severity,
                ) {
                    debug!(
                        threat_id = %existing_id,
                        camera_id = %merged.camera_id,
                        confidence = merged.confidence,
                        "Merged detection into active threat"
                    );
                    self.bus.publish(WatchEvent::ThreatUpdated(merged.clone()));
                    self.spawn_dispatch(merged, assessment);
                }
                return;
            }

            // Cooldown elapsed: retire the stale threat and escalate fresh
            if let Some(resolved) = self.store.resolve(&existing_id) {
                self.bus.publish(WatchEvent::ThreatUpdated(resolved));
            }
        }

        let mut details = ThreatDetails::for_activity(detection.activity);
        details.severity = assessment.severity;

        let threat = Threat {
            id: Uuid::new_v4(),
            activity: detection.activity,
            camera_id: detection.camera_id.clone(),
            location: detection.location,
            confidence: detection.confidence,
            timestamp: detection.timestamp,
            status: ThreatStatus::Active,
            details,
            pattern_id,
            dispatch: Default::default(),
        };

        match self.store.insert_active(threat.clone()) {
            Ok(()) => {
                info!(
                    threat_id = %threat.id,
                    camera_id = %threat.camera_id,
                    activity = %threat.activity,
                    severity = %threat.details.severity,
                    "Threat created"
                );
                self.bus.publish(WatchEvent::ThreatCreated(threat.clone()));
                self.spawn_dispatch(threat, assessment);
            }
            Err(winner) => {
                // Lost a concurrent creation race: merge into the winner
                if let Some(merged) = self.store.merge(
                    &winner,
                    detection.confidence,
                    detection.timestamp,
                    assessment.severity,
                ) {
                    self.bus.publish(WatchEvent::ThreatUpdated(merged.clone()));
                    self.spawn_dispatch(merged, assessment);
                }
            }
        }
    }

    fn spawn_dispatch(&self, threat: Threat, assessment: crate::threat::ThreatAssessment) {
        if !assessment.should_call_emergency && !assessment.should_notify_community {
            return;
        }
        let dispatch = Arc::clone(&self.dispatch);
        tokio::spawn(async move {
            dispatch.dispatch(&threat, &assessment).await;
        });
    }

    /// Resolve every active threat (scenario stop). Outstanding dispatch
    /// tasks are left to complete on their own.
    pub fn resolve_all(&self) {
        for resolved in self.store.resolve_all() {
            self.bus.publish(WatchEvent::ThreatUpdated(resolved));
        }
    }

    /// Consumer task: the single writer for patterns and threats. Detections
    /// arrive ordered per camera, interleaved across cameras.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Detection>) {
        info!("Coordinator started");
        while let Some(detection) = rx.recv().await {
            self.ingest(detection);
        }
        warn!("Detection stream closed, coordinator stopping");
    }
}
