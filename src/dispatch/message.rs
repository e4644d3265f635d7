use crate::threat::{Threat, ThreatAssessment, ThreatCategory};

/// Script spoken on the emergency call, templated from threat attributes.
pub fn call_script(threat: &Threat, assessment: &ThreatAssessment, nearby_cameras: usize) -> String {
    let mut message = format!(
        "Hello, this is the Ursa security system calling to report a {} severity incident. \
         We have detected {} with {:.0}% confidence. \
         The incident is categorized as {}. ",
        assessment.severity,
        threat.activity.human(),
        threat.confidence * 100.0,
        assessment.category.human(),
    );

    message.push_str(&format!(
        "Location coordinates are {:.4}, {:.4}. ",
        threat.location.lat, threat.location.lng
    ));

    if nearby_cameras > 0 {
        message.push_str(&format!(
            "We have {} additional cameras monitoring the area. ",
            nearby_cameras
        ));
    }

    message.push_str("Please advise on the appropriate response. Thank you.");
    message
}

/// SMS body for community members, with per-category guidance.
pub fn community_alert(
    threat: &Threat,
    assessment: &ThreatAssessment,
    nearby_cameras: usize,
) -> String {
    let mut message = String::from("URSA SECURITY ALERT\n\n");
    message.push_str(&format!(
        "Incident detected: {}\nSeverity: {}\nTime: {}\n\n",
        threat.activity.human(),
        assessment.severity.label().to_uppercase(),
        threat.timestamp.format("%I:%M %p"),
    ));

    let guidance = match assessment.category {
        ThreatCategory::CarProwling => {
            "Be alert: Someone may be checking vehicles in your area. \
             Please check your vehicles and report any suspicious activity."
        }
        ThreatCategory::SuspiciousActivity => {
            "Unusual activity detected in your neighborhood. \
             Please remain vigilant and report any concerns."
        }
        ThreatCategory::BehavioralAbnormality => {
            "Behavioral concern detected. Please check on neighbors if safe to do so."
        }
        ThreatCategory::Fire => {
            "FIRE DETECTED. Evacuate if necessary and call 911 immediately."
        }
        ThreatCategory::Assault | ThreatCategory::Kidnapping => {
            "CRITICAL INCIDENT. Stay indoors, lock doors, and call 911 if you see anything."
        }
        ThreatCategory::Wildlife => {
            "Wild animal sighted in the area. Keep children and pets indoors."
        }
        ThreatCategory::LostPet => {
            "A pet appears to be lost in the area. Contact animal control if sighted."
        }
        ThreatCategory::Loitering | ThreatCategory::Unknown => "",
    };
    if !guidance.is_empty() {
        message.push_str(guidance);
        message.push_str("\n\n");
    }

    message.push_str(&format!(
        "Location: {:.4}, {:.4}\n",
        threat.location.lat, threat.location.lng
    ));

    if nearby_cameras > 0 {
        message.push_str("Multiple cameras monitoring the area.\n");
    }

    message.push_str("\nStay safe. Updates will be sent as the situation develops.");
    message
}
