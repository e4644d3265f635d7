use crate::camera::CameraConfig;
use crate::coordinator::CorrelationConfig;
use crate::dispatch::{CommunityMember, DispatchConfig};
use crate::geo::Camera;
use crate::threat::AnalyzerConfig;
use serde::Deserialize;

/// Complete Ursa configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UrsaConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Monitored camera network
    #[serde(default = "default_cameras")]
    pub cameras: Vec<Camera>,

    /// Notification registry
    #[serde(default = "default_community")]
    pub community: Vec<CommunityMember>,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Origins allowed by the CORS layer (the demo UI dev servers)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Pipeline runtime knobs
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Scripted-mode observation tick (milliseconds)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Event bus buffer per observer
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    /// Detection channel depth between agents and the coordinator
    #[serde(default = "default_detection_channel_capacity")]
    pub detection_channel_capacity: usize,
}

fn default_tick_ms() -> u64 {
    500
}

fn default_bus_capacity() -> usize {
    1000
}

fn default_detection_channel_capacity() -> usize {
    256
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            bus_capacity: default_bus_capacity(),
            detection_channel_capacity: default_detection_channel_capacity(),
        }
    }
}

/// The demo neighborhood network.
fn default_cameras() -> Vec<Camera> {
    [
        ("cam_001", 37.7749, -122.4194, "123 Oak St"),
        ("cam_002", 37.7755, -122.4200, "456 Pine Ave"),
        ("cam_003", 37.7761, -122.4206, "789 Elm Dr"),
        ("cam_004", 37.7743, -122.4188, "321 Maple Ln"),
        ("cam_005", 37.7757, -122.4192, "654 Cedar Rd"),
    ]
    .iter()
    .map(|(id, lat, lng, address)| Camera {
        id: id.to_string(),
        lat: *lat,
        lng: *lng,
        address: address.to_string(),
    })
    .collect()
}

fn default_community() -> Vec<CommunityMember> {
    vec![CommunityMember {
        contact_id: "member_001".to_string(),
        name: "Demo User".to_string(),
        lat: 37.7749,
        lng: -122.4194,
    }]
}

impl Default for UrsaConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            correlation: CorrelationConfig::default(),
            analyzer: AnalyzerConfig::default(),
            dispatch: DispatchConfig::default(),
            api: ApiConfig::default(),
            runtime: RuntimeConfig::default(),
            cameras: default_cameras(),
            community: default_community(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<UrsaConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: UrsaConfig = toml::from_str(&contents)?;
    Ok(config)
}
