use crate::camera::MovementPattern;
use crate::observation::{DetectedObject, ObservationBundle};
use serde::Deserialize;
use std::collections::VecDeque;

/// Weighted-factor fusion weights and sweet-spot bounds.
///
/// Every contribution is independently capped and configurable; the
/// defaults are the demo-tuned constants from the reference deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    // Factor 1: edge density sweet spot (too high = noise)
    #[serde(default = "default_edge_sweet_low")]
    pub edge_sweet_low: f64,
    #[serde(default = "default_edge_sweet_high")]
    pub edge_sweet_high: f64,
    #[serde(default = "default_edge_sweet_weight")]
    pub edge_sweet_weight: f64,
    #[serde(default = "default_edge_excess_weight")]
    pub edge_excess_weight: f64,

    // Factor 2: motion concentration (object) vs scatter (noise)
    #[serde(default = "default_consistency_min")]
    pub consistency_min: f64,
    #[serde(default = "default_consistency_weight")]
    pub consistency_weight: f64,
    #[serde(default = "default_consistency_scatter_max")]
    pub consistency_scatter_max: f64,
    #[serde(default = "default_consistency_scatter_penalty")]
    pub consistency_scatter_penalty: f64,

    // Factor 3: moderate speed (fast = ordinary traffic)
    #[serde(default = "default_speed_low")]
    pub speed_low: f64,
    #[serde(default = "default_speed_high")]
    pub speed_high: f64,
    #[serde(default = "default_speed_weight")]
    pub speed_weight: f64,
    #[serde(default = "default_speed_fast_min")]
    pub speed_fast_min: f64,
    #[serde(default = "default_speed_fast_penalty")]
    pub speed_fast_penalty: f64,

    // Factor 4: persistence over the rolling window
    #[serde(default = "default_persistence_min")]
    pub persistence_min: f64,
    #[serde(default = "default_persistence_weight")]
    pub persistence_weight: f64,
    #[serde(default = "default_persistence_brief_max")]
    pub persistence_brief_max: f64,
    #[serde(default = "default_persistence_brief_penalty")]
    pub persistence_brief_penalty: f64,

    // Factor 5: movement pattern
    #[serde(default = "default_slow_deliberate_weight")]
    pub slow_deliberate_weight: f64,
    #[serde(default = "default_erratic_weight")]
    pub erratic_weight: f64,
    #[serde(default = "default_fast_movement_penalty")]
    pub fast_movement_penalty: f64,

    // Factor 6: intensity variation (very high = lighting changes)
    #[serde(default = "default_stddev_low")]
    pub stddev_low: f64,
    #[serde(default = "default_stddev_high")]
    pub stddev_high: f64,
    #[serde(default = "default_stddev_weight")]
    pub stddev_weight: f64,
    #[serde(default = "default_stddev_excess_min")]
    pub stddev_excess_min: f64,
    #[serde(default = "default_stddev_excess_penalty")]
    pub stddev_excess_penalty: f64,

    // Factor 7: object fusion
    #[serde(default = "default_person_near_vehicle_weight")]
    pub person_near_vehicle_weight: f64,
    #[serde(default = "default_loitering_weight")]
    pub loitering_weight: f64,
    #[serde(default = "default_person_moving_weight")]
    pub person_moving_weight: f64,
    #[serde(default = "default_person_still_weight")]
    pub person_still_weight: f64,
    #[serde(default = "default_hazard_weight")]
    pub hazard_weight: f64,
    #[serde(default = "default_wildlife_weight")]
    pub wildlife_weight: f64,
    #[serde(default = "default_pet_weight")]
    pub pet_weight: f64,
    #[serde(default = "default_unattended_motion_penalty")]
    pub unattended_motion_penalty: f64,
    #[serde(default = "default_unattended_motion_speed_min")]
    pub unattended_motion_speed_min: f64,
    #[serde(default = "default_person_moving_speed_min")]
    pub person_moving_speed_min: f64,

    // Object analysis parameters
    #[serde(default = "default_object_confidence_min")]
    pub object_confidence_min: f64,
    #[serde(default = "default_proximity_margin_px")]
    pub proximity_margin_px: f64,
    #[serde(default = "default_loiter_variance_max")]
    pub loiter_variance_max: f64,
    #[serde(default = "default_loiter_min_samples")]
    pub loiter_min_samples: usize,
    #[serde(default = "default_hazard_classes")]
    pub hazard_classes: Vec<String>,
    #[serde(default = "default_wildlife_classes")]
    pub wildlife_classes: Vec<String>,
    #[serde(default = "default_pet_classes")]
    pub pet_classes: Vec<String>,
}

fn default_edge_sweet_low() -> f64 {
    0.10
}
fn default_edge_sweet_high() -> f64 {
    0.25
}
fn default_edge_sweet_weight() -> f64 {
    0.14
}
fn default_edge_excess_weight() -> f64 {
    0.03
}
fn default_consistency_min() -> f64 {
    0.3
}
fn default_consistency_weight() -> f64 {
    0.16
}
fn default_consistency_scatter_max() -> f64 {
    0.1
}
fn default_consistency_scatter_penalty() -> f64 {
    0.10
}
fn default_speed_low() -> f64 {
    0.02
}
fn default_speed_high() -> f64 {
    0.10
}
fn default_speed_weight() -> f64 {
    0.13
}
fn default_speed_fast_min() -> f64 {
    0.15
}
fn default_speed_fast_penalty() -> f64 {
    0.10
}
fn default_persistence_min() -> f64 {
    0.6
}
fn default_persistence_weight() -> f64 {
    0.20
}
fn default_persistence_brief_max() -> f64 {
    0.3
}
fn default_persistence_brief_penalty() -> f64 {
    0.12
}
fn default_slow_deliberate_weight() -> f64 {
    0.15
}
fn default_erratic_weight() -> f64 {
    0.08
}
fn default_fast_movement_penalty() -> f64 {
    0.10
}
fn default_stddev_low() -> f64 {
    30.0
}
fn default_stddev_high() -> f64 {
    80.0
}
fn default_stddev_weight() -> f64 {
    0.08
}
fn default_stddev_excess_min() -> f64 {
    100.0
}
fn default_stddev_excess_penalty() -> f64 {
    0.10
}
fn default_person_near_vehicle_weight() -> f64 {
    0.30
}
fn default_loitering_weight() -> f64 {
    0.25
}
fn default_person_moving_weight() -> f64 {
    0.15
}
fn default_person_still_weight() -> f64 {
    0.10
}
fn default_hazard_weight() -> f64 {
    0.35
}
fn default_wildlife_weight() -> f64 {
    0.20
}
fn default_pet_weight() -> f64 {
    0.15
}
fn default_unattended_motion_penalty() -> f64 {
    0.15
}
fn default_unattended_motion_speed_min() -> f64 {
    0.1
}
fn default_person_moving_speed_min() -> f64 {
    0.02
}
fn default_object_confidence_min() -> f64 {
    0.5
}
fn default_proximity_margin_px() -> f64 {
    50.0
}
fn default_loiter_variance_max() -> f64 {
    10_000.0
}
fn default_loiter_min_samples() -> usize {
    5
}
fn default_hazard_classes() -> Vec<String> {
    vec!["fire".to_string(), "smoke".to_string()]
}
fn default_wildlife_classes() -> Vec<String> {
    vec!["bear".to_string(), "deer".to_string(), "coyote".to_string()]
}
fn default_pet_classes() -> Vec<String> {
    vec!["dog".to_string(), "cat".to_string()]
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            edge_sweet_low: default_edge_sweet_low(),
            edge_sweet_high: default_edge_sweet_high(),
            edge_sweet_weight: default_edge_sweet_weight(),
            edge_excess_weight: default_edge_excess_weight(),
            consistency_min: default_consistency_min(),
            consistency_weight: default_consistency_weight(),
            consistency_scatter_max: default_consistency_scatter_max(),
            consistency_scatter_penalty: default_consistency_scatter_penalty(),
            speed_low: default_speed_low(),
            speed_high: default_speed_high(),
            speed_weight: default_speed_weight(),
            speed_fast_min: default_speed_fast_min(),
            speed_fast_penalty: default_speed_fast_penalty(),
            persistence_min: default_persistence_min(),
            persistence_weight: default_persistence_weight(),
            persistence_brief_max: default_persistence_brief_max(),
            persistence_brief_penalty: default_persistence_brief_penalty(),
            slow_deliberate_weight: default_slow_deliberate_weight(),
            erratic_weight: default_erratic_weight(),
            fast_movement_penalty: default_fast_movement_penalty(),
            stddev_low: default_stddev_low(),
            stddev_high: default_stddev_high(),
            stddev_weight: default_stddev_weight(),
            stddev_excess_min: default_stddev_excess_min(),
            stddev_excess_penalty: default_stddev_excess_penalty(),
            person_near_vehicle_weight: default_person_near_vehicle_weight(),
            loitering_weight: default_loitering_weight(),
            person_moving_weight: default_person_moving_weight(),
            person_still_weight: default_person_still_weight(),
            hazard_weight: default_hazard_weight(),
            wildlife_weight: default_wildlife_weight(),
            pet_weight: default_pet_weight(),
            unattended_motion_penalty: default_unattended_motion_penalty(),
            unattended_motion_speed_min: default_unattended_motion_speed_min(),
            person_moving_speed_min: default_person_moving_speed_min(),
            object_confidence_min: default_object_confidence_min(),
            proximity_margin_px: default_proximity_margin_px(),
            loiter_variance_max: default_loiter_variance_max(),
            loiter_min_samples: default_loiter_min_samples(),
            hazard_classes: default_hazard_classes(),
            wildlife_classes: default_wildlife_classes(),
            pet_classes: default_pet_classes(),
        }
    }
}

/// Composite suspicion value with a named factor breakdown.
/// Recomputed every tick; never persisted beyond it.
#[derive(Clone, Debug)]
pub struct SuspicionScore {
    pub value: f64,
    pub factors: Vec<(&'static str, f64)>,
}

/// What the object detector saw this tick, interpreted for scoring.
#[derive(Clone, Debug, Default)]
pub struct ObjectSignals {
    pub detector_available: bool,
    pub people: usize,
    pub vehicles: usize,
    pub person_near_vehicle: bool,
    pub loitering: bool,
    pub hazard: bool,
    pub wildlife: bool,
    pub pet: bool,
}

impl ObjectSignals {
    fn any_salient(&self) -> bool {
        self.people > 0 || self.hazard || self.wildlife || self.pet
    }
}

/// Interpret the detector's boxes plus the person-position history.
///
/// `objects = None` means the collaborator was unavailable; scoring then
/// degrades to motion-only and no object factors apply.
pub fn analyze_objects(
    objects: Option<&[DetectedObject]>,
    person_history: &VecDeque<Vec<(f64, f64)>>,
    config: &ScoringConfig,
) -> ObjectSignals {
    let objects = match objects {
        Some(o) => o,
        None => return ObjectSignals::default(),
    };

    let confident: Vec<&DetectedObject> = objects
        .iter()
        .filter(|o| o.confidence > config.object_confidence_min)
        .collect();

    let people: Vec<&&DetectedObject> = confident.iter().filter(|o| o.is_person()).collect();
    let vehicles: Vec<&&DetectedObject> = confident.iter().filter(|o| o.is_vehicle()).collect();

    let person_near_vehicle = people.iter().any(|p| {
        let (px, py) = p.center();
        vehicles.iter().any(|v| {
            let m = config.proximity_margin_px;
            px > v.bbox[0] - m && px < v.bbox[2] + m && py > v.bbox[1] - m && py < v.bbox[3] + m
        })
    });

    let hazard = confident
        .iter()
        .any(|o| config.hazard_classes.iter().any(|c| c == &o.class));
    let wildlife = confident
        .iter()
        .any(|o| config.wildlife_classes.iter().any(|c| c == &o.class));
    let pet = confident
        .iter()
        .any(|o| config.pet_classes.iter().any(|c| c == &o.class));

    ObjectSignals {
        detector_available: true,
        people: people.len(),
        vehicles: vehicles.len(),
        person_near_vehicle,
        loitering: loitering_detected(person_history, config),
        hazard,
        wildlife,
        pet,
    }
}

/// A tracked person is loitering when their recent box centers barely move:
/// enough samples in the window, summed positional variance under the cap.
fn loitering_detected(person_history: &VecDeque<Vec<(f64, f64)>>, config: &ScoringConfig) -> bool {
    let positions: Vec<(f64, f64)> = person_history.iter().flatten().copied().collect();
    if positions.len() < config.loiter_min_samples {
        return false;
    }

    let n = positions.len() as f64;
    let mean_x = positions.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = positions.iter().map(|p| p.1).sum::<f64>() / n;
    let var_x = positions.iter().map(|p| (p.0 - mean_x).powi(2)).sum::<f64>() / n;
    let var_y = positions.iter().map(|p| (p.1 - mean_y).powi(2)).sum::<f64>() / n;

    var_x + var_y < config.loiter_variance_max
}

/// Weighted factor fusion: sum of independently banded contributions,
/// clipped to [0, 1]. Pure and deterministic for fixed inputs and config.
pub fn suspicion_score(
    bundle: &ObservationBundle,
    pattern: MovementPattern,
    signals: &ObjectSignals,
    config: &ScoringConfig,
) -> SuspicionScore {
    let mut factors: Vec<(&'static str, f64)> = Vec::new();
    let push = |factors: &mut Vec<(&'static str, f64)>, name: &'static str, delta: f64| {
        if delta != 0.0 {
            factors.push((name, delta));
        }
    };

    // Factor 1: edge density sweet spot
    if bundle.edge_density > config.edge_sweet_low && bundle.edge_density < config.edge_sweet_high {
        push(&mut factors, "edge_density_sweet_spot", config.edge_sweet_weight);
    } else if bundle.edge_density >= config.edge_sweet_high {
        push(&mut factors, "edge_density_excess", config.edge_excess_weight);
    }

    // Factor 2: motion concentration
    if bundle.motion_consistency > config.consistency_min {
        push(&mut factors, "motion_concentrated", config.consistency_weight);
    } else if bundle.motion_consistency < config.consistency_scatter_max {
        push(&mut factors, "motion_scattered", -config.consistency_scatter_penalty);
    }

    // Factor 3: moderate speed
    if bundle.motion_speed > config.speed_low && bundle.motion_speed < config.speed_high {
        push(&mut factors, "moderate_speed", config.speed_weight);
    } else if bundle.motion_speed > config.speed_fast_min {
        push(&mut factors, "fast_traffic", -config.speed_fast_penalty);
    }

    // Factor 4: persistence
    if bundle.persistence_ratio > config.persistence_min {
        push(&mut factors, "persistent_activity", config.persistence_weight);
    } else if bundle.persistence_ratio < config.persistence_brief_max {
        push(&mut factors, "transient_activity", -config.persistence_brief_penalty);
    }

    // Factor 5: movement pattern
    match pattern {
        MovementPattern::SlowDeliberate => {
            push(&mut factors, "slow_deliberate_movement", config.slow_deliberate_weight)
        }
        MovementPattern::Erratic => push(&mut factors, "erratic_movement", config.erratic_weight),
        MovementPattern::FastMovement => {
            push(&mut factors, "fast_movement", -config.fast_movement_penalty)
        }
        MovementPattern::Static | MovementPattern::Moderate => {}
    }

    // Factor 6: intensity variation
    if bundle.intensity_stddev > config.stddev_low && bundle.intensity_stddev < config.stddev_high {
        push(&mut factors, "moderate_intensity_variation", config.stddev_weight);
    } else if bundle.intensity_stddev > config.stddev_excess_min {
        push(&mut factors, "lighting_change", -config.stddev_excess_penalty);
    }

    // Factor 7: object fusion (only when the detector ran this tick)
    if signals.detector_available {
        if signals.hazard {
            push(&mut factors, "hazard_present", config.hazard_weight);
        }
        if signals.wildlife {
            push(&mut factors, "wildlife_present", config.wildlife_weight);
        }
        if signals.pet && signals.people == 0 {
            push(&mut factors, "unattended_pet", config.pet_weight);
        }

        if signals.person_near_vehicle {
            push(&mut factors, "person_near_vehicle", config.person_near_vehicle_weight);
        } else if signals.loitering && signals.people > 0 {
            push(&mut factors, "person_loitering", config.loitering_weight);
        } else if signals.people > 0 {
            if bundle.motion_speed > config.person_moving_speed_min {
                push(&mut factors, "person_moving", config.person_moving_weight);
            } else {
                push(&mut factors, "person_stationary", config.person_still_weight);
            }
        }

        // High motion with nothing salient in frame reads as noise
        if !signals.any_salient() && bundle.motion_speed > config.unattended_motion_speed_min {
            push(&mut factors, "motion_without_subject", -config.unattended_motion_penalty);
        }
    }

    let value = factors
        .iter()
        .map(|(_, d)| d)
        .sum::<f64>()
        .clamp(0.0, 1.0);

    SuspicionScore { value, factors }
}
