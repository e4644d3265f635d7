use crate::camera::ActivityType;
use serde::{Deserialize, Serialize};

/// Threat severity levels, ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            ThreatSeverity::Low => "low",
            ThreatSeverity::Medium => "medium",
            ThreatSeverity::High => "high",
            ThreatSeverity::Critical => "critical",
        }
    }

    /// Dispatch priority (1-10, higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            ThreatSeverity::Critical => 10,
            ThreatSeverity::High => 7,
            ThreatSeverity::Medium => 5,
            ThreatSeverity::Low => 2,
        }
    }
}

impl std::fmt::Display for ThreatSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Threat categories, derived from the activity classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    Kidnapping,
    Assault,
    Fire,
    CarProwling,
    Loitering,
    SuspiciousActivity,
    BehavioralAbnormality,
    Wildlife,
    LostPet,
    Unknown,
}

impl ThreatCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ThreatCategory::Kidnapping => "kidnapping",
            ThreatCategory::Assault => "assault",
            ThreatCategory::Fire => "fire",
            ThreatCategory::CarProwling => "car_prowling",
            ThreatCategory::Loitering => "loitering",
            ThreatCategory::SuspiciousActivity => "suspicious_activity",
            ThreatCategory::BehavioralAbnormality => "behavioral_abnormality",
            ThreatCategory::Wildlife => "wildlife",
            ThreatCategory::LostPet => "lost_pet",
            ThreatCategory::Unknown => "unknown",
        }
    }

    pub fn human(&self) -> String {
        self.label().replace('_', " ")
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<ActivityType> for ThreatCategory {
    fn from(activity: ActivityType) -> Self {
        match activity {
            ActivityType::SuspiciousMovement => ThreatCategory::SuspiciousActivity,
            ActivityType::CarProwling => ThreatCategory::CarProwling,
            ActivityType::Loitering => ThreatCategory::Loitering,
            ActivityType::Wildfire => ThreatCategory::Fire,
            ActivityType::Wildlife => ThreatCategory::Wildlife,
            ActivityType::LostPet => ThreatCategory::LostPet,
            ActivityType::None => ThreatCategory::Unknown,
        }
    }
}

/// The analyzer's output tuple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub severity: ThreatSeverity,
    pub category: ThreatCategory,
    pub should_call_emergency: bool,
    pub should_notify_community: bool,
}

/// Severity-band and call-gating cutoffs. The band shape is fixed; the
/// literal cutoffs are configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Confidence gate for calling on HIGH severity
    #[serde(default = "default_call_threshold")]
    pub call_threshold: f64,
    /// Confidence gate for calling on MEDIUM severity
    #[serde(default = "default_medium_call_threshold")]
    pub medium_call_threshold: f64,

    /// Category-specific HIGH cutoffs
    #[serde(default = "default_prowling_high")]
    pub prowling_high: f64,
    #[serde(default = "default_suspicious_high")]
    pub suspicious_high: f64,
    #[serde(default = "default_behavioral_high")]
    pub behavioral_high: f64,
    #[serde(default = "default_wildlife_high")]
    pub wildlife_high: f64,

    /// Generic MEDIUM cutoff
    #[serde(default = "default_medium_confidence")]
    pub medium_confidence: f64,
}

fn default_call_threshold() -> f64 {
    0.75
}
fn default_medium_call_threshold() -> f64 {
    0.9
}
fn default_prowling_high() -> f64 {
    0.8
}
fn default_suspicious_high() -> f64 {
    0.85
}
fn default_behavioral_high() -> f64 {
    0.75
}
fn default_wildlife_high() -> f64 {
    0.8
}
fn default_medium_confidence() -> f64 {
    0.7
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            call_threshold: default_call_threshold(),
            medium_call_threshold: default_medium_call_threshold(),
            prowling_high: default_prowling_high(),
            suspicious_high: default_suspicious_high(),
            behavioral_high: default_behavioral_high(),
            wildlife_high: default_wildlife_high(),
            medium_confidence: default_medium_confidence(),
        }
    }
}

/// Pure severity/dispatch classification. Same inputs always yield the
/// same assessment; no side effects.
pub fn analyze(activity: ActivityType, confidence: f64, config: &AnalyzerConfig) -> ThreatAssessment {
    let category = ThreatCategory::from(activity);
    let severity = severity_for(category, confidence, config);

    ThreatAssessment {
        severity,
        category,
        should_call_emergency: should_call(severity, confidence, config),
        should_notify_community: should_notify(severity, category),
    }
}

fn severity_for(category: ThreatCategory, confidence: f64, config: &AnalyzerConfig) -> ThreatSeverity {
    // Immediate-danger categories are critical regardless of confidence
    if matches!(
        category,
        ThreatCategory::Kidnapping | ThreatCategory::Assault | ThreatCategory::Fire
    ) {
        return ThreatSeverity::Critical;
    }

    // High severity requires a category-specific confidence cutoff
    let high = match category {
        ThreatCategory::CarProwling => confidence > config.prowling_high,
        ThreatCategory::SuspiciousActivity => confidence > config.suspicious_high,
        ThreatCategory::BehavioralAbnormality => confidence > config.behavioral_high,
        ThreatCategory::Wildlife => confidence > config.wildlife_high,
        _ => false,
    };
    if high {
        return ThreatSeverity::High;
    }

    // Medium: confident enough, or an inherently actionable category
    if confidence > config.medium_confidence
        || matches!(
            category,
            ThreatCategory::CarProwling | ThreatCategory::SuspiciousActivity
        )
    {
        return ThreatSeverity::Medium;
    }

    ThreatSeverity::Low
}

/// Asymmetric call gating: emergency calls stay rare below CRITICAL.
fn should_call(severity: ThreatSeverity, confidence: f64, config: &AnalyzerConfig) -> bool {
    match severity {
        ThreatSeverity::Critical => true,
        ThreatSeverity::High => confidence >= config.call_threshold,
        ThreatSeverity::Medium => confidence >= config.medium_call_threshold,
        ThreatSeverity::Low => false,
    }
}

fn should_notify(severity: ThreatSeverity, category: ThreatCategory) -> bool {
    severity >= ThreatSeverity::Medium || category == ThreatCategory::BehavioralAbnormality
}
