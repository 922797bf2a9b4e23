use crate::error::{ProcessingError, Result};
use serde::Serialize;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const KM_PER_MILE: f64 = 1.609344;

/// Axis-aligned lon/lat box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Widen the box by `lat_margin` degrees north/south and `lon_margin` east/west
    pub fn expand(&self, lat_margin: f64, lon_margin: f64) -> Self {
        Self {
            min_lon: self.min_lon - lon_margin,
            min_lat: self.min_lat - lat_margin,
            max_lon: self.max_lon + lon_margin,
            max_lat: self.max_lat + lat_margin,
        }
    }

    pub fn center_latitude(&self) -> f64 {
        (self.min_lat + self.max_lat) / 2.0
    }

    /// Largest absolute latitude inside the box, where a degree of longitude is shortest
    pub fn max_abs_latitude(&self) -> f64 {
        self.min_lat.abs().max(self.max_lat.abs())
    }

    /// Smallest box covering both
    pub fn union(&self, other: &GeoBoundingBox) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// Validate a lon/lat pair
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ProcessingError::InvalidFormat(format!(
            "Latitude {} is outside [-90, 90]; boundaries must be in geographic coordinates",
            latitude
        )));
    }

    if !(-180.0..=360.0).contains(&longitude) {
        return Err(ProcessingError::InvalidFormat(format!(
            "Longitude {} is outside [-180, 360]; boundaries must be in geographic coordinates",
            longitude
        )));
    }

    Ok(())
}

/// Calculate the distance between two points using the Haversine formula
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Degrees of latitude spanning `km` along a meridian
pub fn km_to_lat_degrees(km: f64) -> f64 {
    (km / EARTH_RADIUS_KM).to_degrees()
}

/// Degrees of longitude spanning `km` along the parallel at `latitude`
pub fn km_to_lon_degrees(km: f64, latitude: f64) -> f64 {
    // Clamp so polar boxes don't blow up to infinity
    let cos_lat = latitude.to_radians().cos().max(0.01);
    km_to_lat_degrees(km) / cos_lat
}
