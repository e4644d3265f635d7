use crate::bus::{DispatchChannel, EventBus, WatchEvent};
use crate::geo::{self, Camera, GeoPoint};
use crate::threat::{DispatchStatus, Threat, ThreatAssessment, ThreatStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod message;
pub mod sinks;

pub use sinks::{CallOutcome, EmergencyCallSink, NotificationSink, SendOutcome, SimulatedTelephony};

/// A registered neighbor eligible for radius notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommunityMember {
    pub contact_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl CommunityMember {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Dispatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Destination for emergency calls (a dispatch line, not 911)
    #[serde(default = "default_emergency_number")]
    pub emergency_number: String,
    /// Community notification radius (haversine)
    #[serde(default = "default_notification_radius")]
    pub notification_radius: f64,
    /// Radius for the "nearby cameras" count in dispatch messages
    #[serde(default = "default_nearby_camera_radius")]
    pub nearby_camera_radius: f64,
}

fn default_emergency_number() -> String {
    "+15550100".to_string()
}
fn default_notification_radius() -> f64 {
    50.0
}
fn default_nearby_camera_radius() -> f64 {
    5.0
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            emergency_number: default_emergency_number(),
            notification_radius: default_notification_radius(),
            nearby_camera_radius: default_nearby_camera_radius(),
        }
    }
}

/// Executes dispatch decisions exactly once per threat and records
/// outcomes on the threat's dispatch state.
pub struct DispatchManager {
    store: Arc<ThreatStore>,
    call_sink: Arc<dyn EmergencyCallSink>,
    notify_sink: Arc<dyn NotificationSink>,
    members: Vec<CommunityMember>,
    cameras: Vec<Camera>,
    bus: EventBus,
    config: DispatchConfig,
}

impl DispatchManager {
    pub fn new(
        store: Arc<ThreatStore>,
        call_sink: Arc<dyn EmergencyCallSink>,
        notify_sink: Arc<dyn NotificationSink>,
        members: Vec<CommunityMember>,
        cameras: Vec<Camera>,
        bus: EventBus,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            call_sink,
            notify_sink,
            members,
            cameras,
            bus,
            config,
        }
    }

    /// Execute a dispatch decision. Idempotent per threat id by
    /// construction: the call claim and the recipient claims are
    /// checked-and-set atomically on the store, so re-invocation is a
    /// no-op and concurrent invocation resolves to a single call.
    pub async fn dispatch(&self, threat: &Threat, decision: &ThreatAssessment) {
        if decision.should_call_emergency {
            self.place_emergency_call(threat, decision).await;
        }
        if decision.should_notify_community {
            self.notify_community(threat, decision).await;
        }
    }

    fn nearby_camera_count(&self, location: GeoPoint) -> usize {
        geo::cameras_within(&self.cameras, location, self.config.nearby_camera_radius).len()
    }

    async fn place_emergency_call(&self, threat: &Threat, decision: &ThreatAssessment) {
        if !self.store.claim_emergency_call(&threat.id) {
            debug!(threat_id = %threat.id, "Emergency call already attempted, skipping");
            return;
        }

        let nearby = self.nearby_camera_count(threat.location);
        let script = message::call_script(threat, decision, nearby);

        let outcome = self
            .call_sink
            .place_call(&self.config.emergency_number, &script)
            .await;

        let detail = match (&outcome.status, &outcome.call_id) {
            (DispatchStatus::Failed, _) => "emergency call failed".to_string(),
            (_, Some(call_id)) => format!("call {}", call_id),
            (_, None) => "call placed".to_string(),
        };

        match outcome.status {
            DispatchStatus::Failed => {
                warn!(threat_id = %threat.id, "Emergency call failed");
            }
            _ => {
                info!(
                    threat_id = %threat.id,
                    destination = %self.config.emergency_number,
                    status = ?outcome.status,
                    "Emergency call dispatched"
                );
            }
        }

        self.store
            .record_call_outcome(&threat.id, outcome.status, detail.clone());
        self.bus.publish(WatchEvent::DispatchOutcome {
            threat_id: threat.id,
            channel: DispatchChannel::EmergencyCall,
            status: outcome.status,
            detail,
        });
    }

    async fn notify_community(&self, threat: &Threat, decision: &ThreatAssessment) {
        let in_range: Vec<&CommunityMember> = self
            .members
            .iter()
            .filter(|m| {
                geo::haversine_distance(m.location(), threat.location)
                    <= self.config.notification_radius
            })
            .collect();

        if in_range.is_empty() {
            debug!(threat_id = %threat.id, "No community members in notification radius");
            return;
        }

        let candidates: Vec<String> = in_range.iter().map(|m| m.contact_id.clone()).collect();
        let fresh = self.store.claim_recipients(&threat.id, &candidates);
        if fresh.is_empty() {
            debug!(threat_id = %threat.id, "All members in range already notified");
            return;
        }

        let nearby = self.nearby_camera_count(threat.location);
        let alert = message::community_alert(threat, decision, nearby);

        let mut sent = 0usize;
        let mut failed = 0usize;
        for contact_id in &fresh {
            let outcome = self.notify_sink.send_message(contact_id, &alert).await;
            match outcome.status {
                DispatchStatus::Failed => {
                    warn!(threat_id = %threat.id, contact_id = %contact_id, "Notification failed");
                    failed += 1;
                }
                _ => sent += 1,
            }
        }

        info!(
            threat_id = %threat.id,
            notified = sent,
            failed,
            "Community notification fan-out complete"
        );
        self.bus.publish(WatchEvent::DispatchOutcome {
            threat_id: threat.id,
            channel: DispatchChannel::CommunityNotification,
            status: if failed > 0 && sent == 0 {
                DispatchStatus::Failed
            } else {
                DispatchStatus::Sent
            },
            detail: format!("{} notified, {} failed", sent, failed),
        });
    }
}
