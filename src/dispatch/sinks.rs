use crate::threat::DispatchStatus;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;
use uuid::Uuid;

/// Result of one emergency-call placement.
#[derive(Clone, Debug)]
pub struct CallOutcome {
    pub status: DispatchStatus,
    pub call_id: Option<String>,
}

/// Result of one community message send.
#[derive(Clone, Debug)]
pub struct SendOutcome {
    pub status: DispatchStatus,
}

/// Telephony voice sink. May be slow or fail; callers record the outcome
/// and never retry automatically.
pub trait EmergencyCallSink: Send + Sync {
    fn place_call<'a>(&'a self, destination: &'a str, message: &'a str)
        -> BoxFuture<'a, CallOutcome>;
}

/// SMS/notification sink.
pub trait NotificationSink: Send + Sync {
    fn send_message<'a>(&'a self, destination: &'a str, message: &'a str)
        -> BoxFuture<'a, SendOutcome>;
}

/// Default sink when no telephony transport is configured: logs the full
/// message and reports a simulated success, mirroring what an operator
/// would see on a real console.
pub struct SimulatedTelephony;

impl EmergencyCallSink for SimulatedTelephony {
    fn place_call<'a>(
        &'a self,
        destination: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, CallOutcome> {
        async move {
            info!(destination = %destination, message = %message, "Simulated emergency call");
            CallOutcome {
                status: DispatchStatus::Simulated,
                call_id: Some(Uuid::new_v4().to_string()),
            }
        }
        .boxed()
    }
}

impl NotificationSink for SimulatedTelephony {
    fn send_message<'a>(
        &'a self,
        destination: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, SendOutcome> {
        async move {
            info!(destination = %destination, message = %message, "Simulated SMS");
            SendOutcome {
                status: DispatchStatus::Simulated,
            }
        }
        .boxed()
    }
}
