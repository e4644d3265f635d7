use super::{DetectedObject, ObservationBundle};
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A per-camera stream of observation bundles.
///
/// The core is agnostic to whether bundles are scripted or come from a real
/// feature extractor; agents consume a channel, and `spawn_source` adapts
/// any pull source onto one. Returning `None` ends the stream.
pub trait ObservationSource: Send {
    fn next_bundle(&mut self) -> Option<ObservationBundle>;
}

/// One scripted phase of a synthetic feed: a feature level held for a fixed
/// number of ticks, with a little noise on top.
#[derive(Clone, Debug)]
pub struct PhaseSpec {
    pub ticks: u32,
    pub edge_density: f64,
    pub intensity_stddev: f64,
    pub motion_consistency: f64,
    pub motion_speed: f64,
    pub persistence_ratio: f64,
    pub objects: Option<Vec<DetectedObject>>,
    /// Amplitude of uniform noise applied to the unit-range fields
    pub jitter: f64,
}

impl PhaseSpec {
    /// A quiet street: no motion, nothing detected.
    pub fn calm(ticks: u32) -> Self {
        Self {
            ticks,
            edge_density: 0.03,
            intensity_stddev: 12.0,
            motion_consistency: 0.0,
            motion_speed: 0.0,
            persistence_ratio: 0.0,
            objects: Some(Vec::new()),
            jitter: 0.01,
        }
    }
}

/// Scripted observation generator for demo scenarios.
pub struct SyntheticSource {
    camera_id: String,
    phases: Vec<PhaseSpec>,
    phase_index: usize,
    tick_in_phase: u32,
}

impl SyntheticSource {
    pub fn new(camera_id: impl Into<String>, phases: Vec<PhaseSpec>) -> Self {
        Self {
            camera_id: camera_id.into(),
            phases,
            phase_index: 0,
            tick_in_phase: 0,
        }
    }

    fn jittered(base: f64, jitter: f64) -> f64 {
        if jitter <= 0.0 {
            return base.clamp(0.0, 1.0);
        }
        let noise = rand::thread_rng().gen_range(-jitter..=jitter);
        (base + noise).clamp(0.0, 1.0)
    }
}

impl ObservationSource for SyntheticSource {
    fn next_bundle(&mut self) -> Option<ObservationBundle> {
        let phase = loop {
            let phase = self.phases.get(self.phase_index)?;
            if self.tick_in_phase < phase.ticks {
                break phase;
            }
            self.phase_index += 1;
            self.tick_in_phase = 0;
        };
        self.tick_in_phase += 1;

        Some(ObservationBundle {
            camera_id: self.camera_id.clone(),
            timestamp: Utc::now(),
            edge_density: Self::jittered(phase.edge_density, phase.jitter),
            intensity_stddev: phase.intensity_stddev.max(0.0),
            motion_consistency: Self::jittered(phase.motion_consistency, phase.jitter),
            motion_speed: Self::jittered(phase.motion_speed, phase.jitter),
            persistence_ratio: Self::jittered(phase.persistence_ratio, phase.jitter),
            detected_objects: phase.objects.clone(),
        })
    }
}

/// Adapter for a live feature extractor that exposes a pull interface over a
/// channel. An extractor that pushes can instead feed the agent's channel
/// directly and skip the tick driver entirely.
pub struct ChannelSource {
    camera_id: String,
    rx: mpsc::Receiver<ObservationBundle>,
}

impl ChannelSource {
    pub fn new(camera_id: impl Into<String>, rx: mpsc::Receiver<ObservationBundle>) -> Self {
        Self {
            camera_id: camera_id.into(),
            rx,
        }
    }

    /// A no-activity bundle for ticks where the extractor had no frame ready.
    fn quiet_bundle(&self) -> ObservationBundle {
        ObservationBundle {
            camera_id: self.camera_id.clone(),
            timestamp: Utc::now(),
            edge_density: 0.0,
            intensity_stddev: 0.0,
            motion_consistency: 0.0,
            motion_speed: 0.0,
            persistence_ratio: 0.0,
            detected_objects: None,
        }
    }
}

impl ObservationSource for ChannelSource {
    fn next_bundle(&mut self) -> Option<ObservationBundle> {
        match self.rx.try_recv() {
            Ok(bundle) => Some(bundle),
            Err(mpsc::error::TryRecvError::Empty) => Some(self.quiet_bundle()),
            Err(mpsc::error::TryRecvError::Disconnected) => None,
        }
    }
}

/// Drive a source on a fixed tick, forwarding validated bundles into an
/// agent's channel. Stops on shutdown signal, stream end, or a closed
/// receiver. Malformed bundles are logged and skipped, never fatal.
pub fn spawn_source<S>(
    mut source: S,
    tick: Duration,
    tx: mpsc::Sender<ObservationBundle>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: ObservationSource + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let bundle = match source.next_bundle() {
                        Some(b) => b,
                        None => break,
                    };
                    if let Err(e) = bundle.validate() {
                        warn!(camera_id = %bundle.camera_id, error = %e, "Rejected malformed bundle");
                        continue;
                    }
                    if tx.send(bundle).await.is_err() {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Observation source stopped");
    })
}
