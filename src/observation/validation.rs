use super::ObservationBundle;
use std::fmt;

/// Validation errors for ObservationBundle
#[derive(Debug, Clone, PartialEq)]
pub enum BundleError {
    MissingCameraId,
    OutOfRange { field: &'static str, value: f64 },
    NegativeStddev(f64),
    InvalidObjectConfidence(f64),
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::MissingCameraId => write!(f, "camera_id is required"),
            BundleError::OutOfRange { field, value } => {
                write!(f, "{} must be in [0, 1], got {}", field, value)
            }
            BundleError::NegativeStddev(v) => {
                write!(f, "intensity_stddev must be >= 0, got {}", v)
            }
            BundleError::InvalidObjectConfidence(v) => {
                write!(f, "object confidence must be in [0, 1], got {}", v)
            }
        }
    }
}

impl std::error::Error for BundleError {}

fn unit_range(field: &'static str, value: f64) -> Result<(), BundleError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(BundleError::OutOfRange { field, value });
    }
    Ok(())
}

/// Validates an ObservationBundle against the stated field ranges.
///
/// Rules:
/// - camera_id must be non-empty
/// - edge_density, motion_consistency, motion_speed, persistence_ratio in [0, 1]
/// - intensity_stddev finite and >= 0
/// - every detected object's confidence in [0, 1]
pub fn validate(bundle: &ObservationBundle) -> Result<(), BundleError> {
    if bundle.camera_id.is_empty() {
        return Err(BundleError::MissingCameraId);
    }

    unit_range("edge_density", bundle.edge_density)?;
    unit_range("motion_consistency", bundle.motion_consistency)?;
    unit_range("motion_speed", bundle.motion_speed)?;
    unit_range("persistence_ratio", bundle.persistence_ratio)?;

    if !bundle.intensity_stddev.is_finite() || bundle.intensity_stddev < 0.0 {
        return Err(BundleError::NegativeStddev(bundle.intensity_stddev));
    }

    if let Some(objects) = &bundle.detected_objects {
        for obj in objects {
            if !obj.confidence.is_finite() || !(0.0..=1.0).contains(&obj.confidence) {
                return Err(BundleError::InvalidObjectConfidence(obj.confidence));
            }
        }
    }

    Ok(())
}
