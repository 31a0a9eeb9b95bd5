//! Locally calibrated azimuthal equal-area map projection

use geo::Coord;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Finite-difference step, in degrees, for the kilometer calibration
const CALIBRATION_EPSILON_DEG: f64 = 1e-3;

/// Great-circle distance between two (lat, lng) pairs in kilometers
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lng1) = (lat1.to_radians(), lng1.to_radians());
    let (lat2, lng2) = (lat2.to_radians(), lng2.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    a.sqrt().asin() * 2.0 * EARTH_RADIUS_KM
}

/// Lambert azimuthal equal-area projection centered on a fixed reference point.
///
/// One unit of projected space corresponds to one kilometer of ground distance
/// near the reference point; y grows downward so that increasing latitude maps
/// "up" on a top-down page. A reference point at a pole is unsupported: the
/// kilometer calibration divides by a vanishing longitude scale there.
#[derive(Clone, Debug)]
pub struct AzimuthalEqualArea {
    lat: f64,
    lng: f64,
    scale: f64,
}

impl AzimuthalEqualArea {
    /// Create a projection centered on (lat, lng), calibrating the kilometer
    /// scale once from finite-difference ground distances.
    pub fn new(lat: f64, lng: f64) -> Self {
        let mut projection = Self {
            lat,
            lng,
            scale: 1.0,
        };
        projection.scale = projection.kilometer_scale();
        projection
    }

    /// Project a (lat, lng) pair in degrees onto the plane.
    pub fn project(&self, lat: f64, lng: f64) -> Coord<f64> {
        let (lat, lng) = (lat.to_radians(), lng.to_radians());
        let (clat, clng) = (self.lat.to_radians(), self.lng.to_radians());
        let k = (2.0
            / (1.0 + clat.sin() * lat.sin() + clat.cos() * lat.cos() * (lng - clng).cos()))
        .sqrt();
        let x = k * lat.cos() * (lng - clng).sin();
        let y = k * (clat.cos() * lat.sin() - clat.sin() * lat.cos() * (lng - clng).cos());
        Coord {
            x: x * self.scale,
            y: -y * self.scale,
        }
    }

    /// Scale factor that makes one projected unit equal one kilometer near the
    /// reference point: measure km-per-degree on each axis, project two points
    /// offset by exactly 1 km each way, and average the inverse deltas.
    fn kilometer_scale(&self) -> f64 {
        let e = CALIBRATION_EPSILON_DEG;
        let (lat, lng) = (self.lat, self.lng);
        let km_per_lat = haversine_km(lat - e, lng, lat + e, lng) / (2.0 * e);
        let km_per_lng = haversine_km(lat, lng - e, lat, lng + e) / (2.0 * e);
        let a = self.project(lat - 1.0 / km_per_lat, lng - 1.0 / km_per_lng);
        let b = self.project(lat + 1.0 / km_per_lat, lng + 1.0 / km_per_lng);
        let sx = 2.0 / (b.x - a.x);
        let sy = 2.0 / (a.y - b.y);
        (sx + sy) / 2.0
    }
}
