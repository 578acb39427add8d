//! Great-circle distance and bounding-box arithmetic.

use crate::error::{Result, WaypostError};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate kilometers spanned by one degree of latitude.
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Floor for cos(latitude) so the longitude delta stays finite near the
/// poles, where a degree of longitude spans almost no distance.
const MIN_COS_LAT: f64 = 1e-3;

const KM_PER_MILE: f64 = 1.60934;
const MILES_PER_KM: f64 = 0.621371;

/// A validated geographic coordinate pair.
///
/// Construction is the only validation point: a `GeoPoint` in hand is always
/// within range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(WaypostError::InvalidLocation(format!(
                "latitude must be between -90 and 90, got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(WaypostError::InvalidLocation(format!(
                "longitude must be between -180 and 180, got {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// An axis-aligned latitude/longitude rectangle used as a pre-filter before
/// exact distance checks.
///
/// For a given center and radius the box may admit points outside the radius
/// (near its corners) but never excludes a point within it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box guaranteed to contain every point within `radius_km` of `center`,
    /// clamped to valid coordinate ranges.
    pub fn around(center: &GeoPoint, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE_LAT;
        let lat_rad = center.latitude().to_radians();
        let lon_delta = radius_km / (KM_PER_DEGREE_LAT * lat_rad.cos().max(MIN_COS_LAT));

        Self {
            min_lat: (center.latitude() - lat_delta).max(-90.0),
            max_lat: (center.latitude() + lat_delta).min(90.0),
            min_lon: (center.longitude() - lon_delta).max(-180.0),
            max_lon: (center.longitude() + lon_delta).min(180.0),
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}

/// Great-circle distance between two points in kilometers, via the haversine
/// formula on a sphere of mean Earth radius.
///
/// The spherical approximation is within a fraction of a percent of an
/// ellipsoidal model: fine for ranking nearby places, not for surveying.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).to_radians();
    let delta_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Wrap a longitude into the [-180, 180] range.
///
/// Useful for callers composing deltas themselves; `BoundingBox::around`
/// clamps instead, since an over-wide box is sound and a wrapped one is not.
pub fn normalize_longitude(longitude: f64) -> f64 {
    let mut longitude = longitude;
    while longitude > 180.0 {
        longitude -= 360.0;
    }
    while longitude < -180.0 {
        longitude += 360.0;
    }
    longitude
}

pub fn km_to_miles(km: f64) -> f64 {
    km * MILES_PER_KM
}

pub fn miles_to_km(miles: f64) -> f64 {
    miles * KM_PER_MILE
}
