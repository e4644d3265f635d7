use crate::camera::ActivityType;
use crate::geo::GeoPoint;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod analyzer;

pub use analyzer::{analyze, AnalyzerConfig, ThreatAssessment, ThreatCategory, ThreatSeverity};

/// Lifecycle status of a threat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatStatus {
    Active,
    Resolved,
}

/// Operator-facing description attached at promotion time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreatDetails {
    pub description: String,
    pub severity: ThreatSeverity,
    pub action_required: bool,
}

impl ThreatDetails {
    /// Per-activity description table (severity here is the initial
    /// operator hint; the analyzer's assessment is authoritative).
    pub fn for_activity(activity: ActivityType) -> Self {
        match activity {
            ActivityType::CarProwling => Self {
                description: "Individual checking car door handles".to_string(),
                severity: ThreatSeverity::Medium,
                action_required: true,
            },
            ActivityType::Loitering => Self {
                description: "Person loitering near vehicles".to_string(),
                severity: ThreatSeverity::Low,
                action_required: false,
            },
            ActivityType::SuspiciousMovement => Self {
                description: "Unusual movement pattern detected".to_string(),
                severity: ThreatSeverity::Medium,
                action_required: true,
            },
            ActivityType::Wildfire => Self {
                description: "Fire or smoke signature detected".to_string(),
                severity: ThreatSeverity::Critical,
                action_required: true,
            },
            ActivityType::Wildlife => Self {
                description: "Wild animal in a residential area".to_string(),
                severity: ThreatSeverity::Medium,
                action_required: true,
            },
            ActivityType::LostPet => Self {
                description: "Unaccompanied pet moving through the area".to_string(),
                severity: ThreatSeverity::Low,
                action_required: false,
            },
            ActivityType::None => Self {
                description: "Unknown activity".to_string(),
                severity: ThreatSeverity::Low,
                action_required: false,
            },
        }
    }
}

/// Outcome classification of one sink invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Queued,
    Sent,
    Failed,
    Simulated,
}

/// Emergency-call record on a threat. At most one call is ever attempted
/// per threat id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CallRecord {
    pub attempted: bool,
    pub status: Option<DispatchStatus>,
    pub outcome: Option<String>,
}

/// Community-notification record on a threat.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub attempted_count: usize,
    pub recipients: Vec<String>,
}

/// Dispatch bookkeeping attached to a threat. Mutated only by the
/// DispatchManager.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DispatchState {
    pub emergency_call: CallRecord,
    pub notifications: NotificationRecord,
}

/// A promoted, deduplicated escalation of one or more detections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Threat {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub activity: ActivityType,

    pub camera_id: String,
    pub location: GeoPoint,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub status: ThreatStatus,
    pub details: ThreatDetails,

    /// Pattern this threat was promoted from, if any
    pub pattern_id: Option<Uuid>,

    pub dispatch: DispatchState,
}

/// Dedup key: at most one active threat per (camera, activity) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThreatKey {
    pub camera_id: String,
    pub activity: ActivityType,
}

/// Shared registry of threats. Reads are lock-free; the coordinator is the
/// single writer for promotion/merge, the dispatch manager for dispatch
/// records.
#[derive(Default)]
pub struct ThreatStore {
    threats: DashMap<Uuid, Threat>,
    active: DashMap<ThreatKey, Uuid>,
}

impl ThreatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<Threat> {
        self.threats.get(id).map(|t| t.clone())
    }

    /// Id of the active threat holding this key, if any.
    pub fn active_id(&self, key: &ThreatKey) -> Option<Uuid> {
        self.active.get(key).map(|id| *id)
    }

    /// Insert a newly promoted threat. First writer wins: if another threat
    /// already holds the key, the existing id is returned and nothing is
    /// inserted.
    pub fn insert_active(&self, threat: Threat) -> Result<(), Uuid> {
        let key = ThreatKey {
            camera_id: threat.camera_id.clone(),
            activity: threat.activity,
        };
        let entry = self.active.entry(key).or_insert(threat.id);
        if *entry != threat.id {
            return Err(*entry);
        }
        // Hold the index entry while publishing the threat so a concurrent
        // merge cannot observe the id without the record.
        self.threats.insert(threat.id, threat);
        Ok(())
    }

    /// Merge a newer detection into an existing threat: last writer wins on
    /// confidence, timestamp, and the re-derived severity. Returns the
    /// updated threat.
    pub fn merge(
        &self,
        id: &Uuid,
        confidence: f64,
        timestamp: DateTime<Utc>,
        severity: ThreatSeverity,
    ) -> Option<Threat> {
        let mut entry = self.threats.get_mut(id)?;
        entry.confidence = confidence;
        entry.timestamp = timestamp;
        entry.details.severity = severity;
        Some(entry.clone())
    }

    /// Mark one threat resolved and release its dedup key.
    pub fn resolve(&self, id: &Uuid) -> Option<Threat> {
        let mut entry = self.threats.get_mut(id)?;
        entry.status = ThreatStatus::Resolved;
        let snapshot = entry.clone();
        drop(entry);

        let key = ThreatKey {
            camera_id: snapshot.camera_id.clone(),
            activity: snapshot.activity,
        };
        self.active.remove_if(&key, |_, held| held == id);
        Some(snapshot)
    }

    /// Resolve every active threat (scenario stop). Returns the resolved
    /// snapshots so callers can broadcast updates.
    pub fn resolve_all(&self) -> Vec<Threat> {
        let ids: Vec<Uuid> = self
            .threats
            .iter()
            .filter(|t| t.status == ThreatStatus::Active)
            .map(|t| t.id)
            .collect();
        ids.iter().filter_map(|id| self.resolve(id)).collect()
    }

    pub fn active_threats(&self) -> Vec<Threat> {
        self.threats
            .iter()
            .filter(|t| t.status == ThreatStatus::Active)
            .map(|t| t.clone())
            .collect()
    }

    pub fn all_threats(&self) -> Vec<Threat> {
        self.threats.iter().map(|t| t.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.threats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threats.is_empty()
    }

    /// Atomically claim the emergency call for a threat. Returns true for
    /// exactly one caller per threat id; the claim is made under the map
    /// entry lock so concurrent dispatchers cannot both see it unclaimed.
    pub fn claim_emergency_call(&self, id: &Uuid) -> bool {
        match self.threats.get_mut(id) {
            Some(mut entry) => {
                if entry.dispatch.emergency_call.attempted {
                    false
                } else {
                    entry.dispatch.emergency_call.attempted = true;
                    true
                }
            }
            None => false,
        }
    }

    /// Record the outcome of a claimed emergency call.
    pub fn record_call_outcome(&self, id: &Uuid, status: DispatchStatus, outcome: String) {
        if let Some(mut entry) = self.threats.get_mut(id) {
            entry.dispatch.emergency_call.status = Some(status);
            entry.dispatch.emergency_call.outcome = Some(outcome);
        }
    }

    /// Atomically claim notification recipients not yet recorded on the
    /// threat. Returns the newly claimed subset; already-notified members
    /// are filtered out under the entry lock.
    pub fn claim_recipients(&self, id: &Uuid, candidates: &[String]) -> Vec<String> {
        match self.threats.get_mut(id) {
            Some(mut entry) => {
                let fresh: Vec<String> = candidates
                    .iter()
                    .filter(|c| !entry.dispatch.notifications.recipients.contains(c))
                    .cloned()
                    .collect();
                entry
                    .dispatch
                    .notifications
                    .recipients
                    .extend(fresh.iter().cloned());
                entry.dispatch.notifications.attempted_count += fresh.len();
                fresh
            }
            None => Vec::new(),
        }
    }
}
