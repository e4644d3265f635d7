use crate::camera::{Detection, ReasoningLogEntry};
use crate::coordinator::pattern::Pattern;
use crate::threat::{DispatchStatus, Threat};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;


/// Which dispatch channel an outcome refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchChannel {
    EmergencyCall,
    CommunityNotification,
}

/// Every state change the pipeline broadcasts to observers.
///
/// Tagged for the WebSocket wire: `{"type": "threat_created", ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
    Detection(Detection),
    ThreatCreated(Threat),
    ThreatUpdated(Threat),
    PatternUpdated(Pattern),
    DispatchOutcome {
        threat_id: Uuid,
        channel: DispatchChannel,
        status: DispatchStatus,
        detail: String,
    },
    Reasoning(ReasoningLogEntry),
    ScenarioStarted {
        scenario: String,
    },
    ScenarioStopped {
        scenario: String,
    },
}

/// Best-effort, at-most-once fan-out of pipeline events.
///
/// `publish` never blocks and never fails: with no observers the event is
/// dropped, and a slow observer lags (skips) rather than stalling
/// detection or dispatch.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WatchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: WatchEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
