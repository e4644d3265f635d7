use crate::camera::{ActivityType, MovementPattern};
use crate::observation::ObservationBundle;
use crate::camera::scoring::ObjectSignals;
use serde::Deserialize;
use std::collections::VecDeque;

/// Bands for deriving a MovementPattern from the rolling motion window.
#[derive(Debug, Clone, Deserialize)]
pub struct MovementConfig {
    /// Below this average the scene is static
    #[serde(default = "default_static_max")]
    pub static_max: f64,
    /// Slow-deliberate: low spread inside this average band
    #[serde(default = "default_deliberate_std_max")]
    pub deliberate_std_max: f64,
    #[serde(default = "default_deliberate_low")]
    pub deliberate_low: f64,
    #[serde(default = "default_deliberate_high")]
    pub deliberate_high: f64,
    /// Above this average the motion is fast
    #[serde(default = "default_fast_min")]
    pub fast_min: f64,
    /// Above this spread the motion is erratic
    #[serde(default = "default_erratic_std_min")]
    pub erratic_std_min: f64,
    /// Minimum samples before a non-static call is made
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// How many recent samples the derivation looks at
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_static_max() -> f64 {
    0.05
}
fn default_deliberate_std_max() -> f64 {
    0.02
}
fn default_deliberate_low() -> f64 {
    0.08
}
fn default_deliberate_high() -> f64 {
    0.15
}
fn default_fast_min() -> f64 {
    0.15
}
fn default_erratic_std_min() -> f64 {
    0.03
}
fn default_min_samples() -> usize {
    5
}
fn default_recent_window() -> usize {
    10
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            static_max: default_static_max(),
            deliberate_std_max: default_deliberate_std_max(),
            deliberate_low: default_deliberate_low(),
            deliberate_high: default_deliberate_high(),
            fast_min: default_fast_min(),
            erratic_std_min: default_erratic_std_min(),
            min_samples: default_min_samples(),
            recent_window: default_recent_window(),
        }
    }
}

/// Bands for the ordered activity-classification rules.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyConfig {
    // Person-near-vehicle escalation to car prowling
    #[serde(default = "default_prowl_active_persistence")]
    pub prowl_active_persistence: f64,
    #[serde(default = "default_prowl_extended_persistence")]
    pub prowl_extended_persistence: f64,

    // Person with suspicious motion
    #[serde(default = "default_suspicious_persistence_min")]
    pub suspicious_persistence_min: f64,
    #[serde(default = "default_suspicious_edge_low")]
    pub suspicious_edge_low: f64,
    #[serde(default = "default_suspicious_edge_high")]
    pub suspicious_edge_high: f64,
    #[serde(default = "default_suspicious_persistence_alt")]
    pub suspicious_persistence_alt: f64,

    // Motion-only fallback: car prowling band
    #[serde(default = "default_prowl_edge_low")]
    pub prowl_edge_low: f64,
    #[serde(default = "default_prowl_edge_high")]
    pub prowl_edge_high: f64,
    #[serde(default = "default_prowl_speed_low")]
    pub prowl_speed_low: f64,
    #[serde(default = "default_prowl_speed_high")]
    pub prowl_speed_high: f64,
    #[serde(default = "default_prowl_persistence_min")]
    pub prowl_persistence_min: f64,

    // Motion-only fallback: loitering band
    #[serde(default = "default_loiter_persistence_min")]
    pub loiter_persistence_min: f64,
    #[serde(default = "default_loiter_edge_low")]
    pub loiter_edge_low: f64,
    #[serde(default = "default_loiter_edge_high")]
    pub loiter_edge_high: f64,
    #[serde(default = "default_loiter_speed_max")]
    pub loiter_speed_max: f64,
}

fn default_prowl_active_persistence() -> f64 {
    0.4
}
fn default_prowl_extended_persistence() -> f64 {
    0.5
}
fn default_suspicious_persistence_min() -> f64 {
    0.5
}
fn default_suspicious_edge_low() -> f64 {
    0.10
}
fn default_suspicious_edge_high() -> f64 {
    0.20
}
fn default_suspicious_persistence_alt() -> f64 {
    0.6
}
fn default_prowl_edge_low() -> f64 {
    0.10
}
fn default_prowl_edge_high() -> f64 {
    0.20
}
fn default_prowl_speed_low() -> f64 {
    0.02
}
fn default_prowl_speed_high() -> f64 {
    0.08
}
fn default_prowl_persistence_min() -> f64 {
    0.6
}
fn default_loiter_persistence_min() -> f64 {
    0.7
}
fn default_loiter_edge_low() -> f64 {
    0.08
}
fn default_loiter_edge_high() -> f64 {
    0.15
}
fn default_loiter_speed_max() -> f64 {
    0.05
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            prowl_active_persistence: default_prowl_active_persistence(),
            prowl_extended_persistence: default_prowl_extended_persistence(),
            suspicious_persistence_min: default_suspicious_persistence_min(),
            suspicious_edge_low: default_suspicious_edge_low(),
            suspicious_edge_high: default_suspicious_edge_high(),
            suspicious_persistence_alt: default_suspicious_persistence_alt(),
            prowl_edge_low: default_prowl_edge_low(),
            prowl_edge_high: default_prowl_edge_high(),
            prowl_speed_low: default_prowl_speed_low(),
            prowl_speed_high: default_prowl_speed_high(),
            prowl_persistence_min: default_prowl_persistence_min(),
            loiter_persistence_min: default_loiter_persistence_min(),
            loiter_edge_low: default_loiter_edge_low(),
            loiter_edge_high: default_loiter_edge_high(),
            loiter_speed_max: default_loiter_speed_max(),
        }
    }
}

/// Derive the tick's MovementPattern from recent motion samples.
/// Exactly one value per tick.
pub fn movement_pattern(window: &VecDeque<f64>, config: &MovementConfig) -> MovementPattern {
    if window.len() < config.min_samples {
        return MovementPattern::Static;
    }

    let recent: Vec<f64> = window
        .iter()
        .rev()
        .take(config.recent_window)
        .copied()
        .collect();
    let n = recent.len() as f64;
    let avg = recent.iter().sum::<f64>() / n;
    let std = (recent.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n).sqrt();

    if avg < config.static_max {
        MovementPattern::Static
    } else if std < config.deliberate_std_max
        && avg > config.deliberate_low
        && avg < config.deliberate_high
    {
        MovementPattern::SlowDeliberate
    } else if avg > config.fast_min {
        MovementPattern::FastMovement
    } else if std > config.erratic_std_min {
        MovementPattern::Erratic
    } else {
        MovementPattern::Moderate
    }
}

/// Classify the tick's activity with ordered rule precedence: object-fusion
/// rules first, then motion-only fallback bands. Returns
/// `ActivityType::None` when nothing matches.
pub fn classify_activity(
    bundle: &ObservationBundle,
    pattern: MovementPattern,
    signals: &ObjectSignals,
    config: &ClassifyConfig,
) -> ActivityType {
    if signals.detector_available {
        // A hazard box trumps everything
        if signals.hazard {
            return ActivityType::Wildfire;
        }

        // Person near a vehicle with deliberate or sustained presence
        if signals.person_near_vehicle {
            let deliberate = pattern == MovementPattern::SlowDeliberate;
            let active = bundle.motion_speed > config.prowl_speed_low
                && bundle.motion_speed < config.prowl_speed_high
                && bundle.persistence_ratio > config.prowl_active_persistence;
            let extended = bundle.persistence_ratio > config.prowl_extended_persistence;
            if deliberate || active || extended {
                return ActivityType::CarProwling;
            }
        }

        // Person staying in the same area
        if signals.loitering && signals.people > 0 {
            return ActivityType::Loitering;
        }

        if signals.wildlife {
            return ActivityType::Wildlife;
        }

        // A pet with no person in frame reads as lost
        if signals.pet && signals.people == 0 {
            return ActivityType::LostPet;
        }

        // Person with suspicious motion characteristics
        if signals.people > 0 {
            let patterned = matches!(
                pattern,
                MovementPattern::SlowDeliberate | MovementPattern::Erratic
            ) && bundle.persistence_ratio > config.suspicious_persistence_min;
            let banded = bundle.edge_density > config.suspicious_edge_low
                && bundle.edge_density < config.suspicious_edge_high
                && bundle.persistence_ratio > config.suspicious_persistence_alt;
            if patterned || banded {
                return ActivityType::SuspiciousMovement;
            }
        }
    }

    // Motion-only fallback, for degraded mode and for ticks where the
    // detector ran but missed the subject
    if signals.people == 0 {
        if pattern == MovementPattern::SlowDeliberate
            && bundle.edge_density > config.prowl_edge_low
            && bundle.edge_density < config.prowl_edge_high
            && bundle.motion_speed > config.prowl_speed_low
            && bundle.motion_speed < config.prowl_speed_high
            && bundle.persistence_ratio > config.prowl_persistence_min
        {
            return ActivityType::CarProwling;
        }

        if bundle.persistence_ratio > config.loiter_persistence_min
            && bundle.edge_density > config.loiter_edge_low
            && bundle.edge_density < config.loiter_edge_high
            && bundle.motion_speed < config.loiter_speed_max
        {
            return ActivityType::Loitering;
        }

        if matches!(
            pattern,
            MovementPattern::SlowDeliberate | MovementPattern::Erratic
        ) && bundle.persistence_ratio > config.suspicious_persistence_min
        {
            return ActivityType::SuspiciousMovement;
        }
    }

    ActivityType::None
}
