use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod validation;
pub mod source;

pub use source::{spawn_source, ChannelSource, ObservationSource, PhaseSpec, SyntheticSource};
pub use validation::{validate, BundleError};

/// One camera's feature bundle for a single tick.
///
/// Bundles are ephemeral: an agent keeps a bounded sliding window of the
/// derived motion samples, never the bundles themselves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationBundle {
    /// Camera that produced this bundle
    pub camera_id: String,

    /// Producer time
    pub timestamp: DateTime<Utc>,

    /// Fraction of pixels on an edge, in [0, 1]
    pub edge_density: f64,

    /// Standard deviation of pixel intensity, >= 0
    pub intensity_stddev: f64,

    /// How concentrated the motion is (object vs scattered noise), in [0, 1]
    pub motion_consistency: f64,

    /// Fraction of the frame in motion, in [0, 1]
    pub motion_speed: f64,

    /// Fraction of recent ticks showing activity, in [0, 1]
    pub persistence_ratio: f64,

    /// Labeled boxes from the object-detection collaborator.
    /// `None` means the collaborator was unavailable this tick;
    /// `Some(vec![])` means it ran and saw nothing.
    pub detected_objects: Option<Vec<DetectedObject>>,
}

impl ObservationBundle {
    /// Validates all numeric fields against their stated ranges.
    pub fn validate(&self) -> Result<(), BundleError> {
        validation::validate(self)
    }
}

/// A labeled bounding box from the black-box object classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Classifier label (e.g. "person", "car", "bear")
    pub class: String,

    /// Classifier confidence, in [0, 1]
    pub confidence: f64,

    /// [x1, y1, x2, y2] in pixel coordinates
    pub bbox: [f64; 4],
}

impl DetectedObject {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.bbox[0] + self.bbox[2]) / 2.0,
            (self.bbox[1] + self.bbox[3]) / 2.0,
        )
    }

    pub fn is_person(&self) -> bool {
        self.class == "person"
    }

    pub fn is_vehicle(&self) -> bool {
        matches!(self.class.as_str(), "car" | "motorcycle" | "bus" | "truck")
    }
}
