use serde::{Deserialize, Serialize};

/// Earth radius used for great-circle distances. The registry coordinates
/// are WGS84 lat/lng, so distances come out in miles.
const EARTH_RADIUS: f64 = 3959.0;

/// A WGS84 coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A camera in the monitored network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Camera {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Camera {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Great-circle distance between two points (haversine formula).
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS * c
}

/// Camera closest to `point`, excluding ids for which `exclude` returns true.
pub fn nearest_camera<'a, F>(
    cameras: &'a [Camera],
    point: GeoPoint,
    exclude: F,
) -> Option<&'a Camera>
where
    F: Fn(&str) -> bool,
{
    cameras
        .iter()
        .filter(|c| !exclude(&c.id))
        .min_by(|a, b| {
            let da = haversine_distance(a.location(), point);
            let db = haversine_distance(b.location(), point);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Cameras within `radius` of `point`.
pub fn cameras_within<'a>(
    cameras: &'a [Camera],
    point: GeoPoint,
    radius: f64,
) -> Vec<&'a Camera> {
    cameras
        .iter()
        .filter(|c| haversine_distance(c.location(), point) <= radius)
        .collect()
}
