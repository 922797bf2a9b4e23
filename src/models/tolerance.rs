use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::utils::coordinates::{
    haversine_distance, km_to_lat_degrees, km_to_lon_degrees, KM_PER_MILE,
};
use crate::utils::constants::DEFAULT_JOIN_DISTANCE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Raw coordinate units of the boundary CRS
    Degrees,
    /// Great-circle kilometres
    Kilometres,
    /// Great-circle statute miles
    Miles,
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceUnit::Degrees => "degrees",
            DistanceUnit::Kilometres => "kilometres",
            DistanceUnit::Miles => "miles",
        };
        write!(f, "{}", name)
    }
}

/// Join distance threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Tolerance {
    #[validate(range(exclusive_min = 0.0))]
    pub distance: f64,
    pub unit: DistanceUnit,
}

/// Ground distance covered by a tolerance at one latitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceReport {
    pub latitude: f64,
    pub north_south_km: f64,
    pub east_west_km: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            distance: DEFAULT_JOIN_DISTANCE,
            unit: DistanceUnit::Degrees,
        }
    }
}

impl Tolerance {
    pub fn new(distance: f64, unit: DistanceUnit) -> Self {
        Self { distance, unit }
    }

    pub fn is_geodesic(&self) -> bool {
        !matches!(self.unit, DistanceUnit::Degrees)
    }

    /// Tolerance in kilometres, `None` for degree tolerances
    pub fn kilometres(&self) -> Option<f64> {
        match self.unit {
            DistanceUnit::Degrees => None,
            DistanceUnit::Kilometres => Some(self.distance),
            DistanceUnit::Miles => Some(self.distance * KM_PER_MILE),
        }
    }

    /// (lat, lon) degree margins that cover the tolerance anywhere at or below `max_abs_lat`
    pub fn degree_margins(&self, max_abs_lat: f64) -> (f64, f64) {
        match self.kilometres() {
            None => (self.distance, self.distance),
            Some(km) => {
                // Slightly generous so envelope tests never cut off a true match
                let km = km * 1.01;
                (km_to_lat_degrees(km), km_to_lon_degrees(km, max_abs_lat))
            }
        }
    }

    /// Ground distance spanned by the tolerance at `latitude`
    pub fn ground_distance_at(&self, latitude: f64) -> ToleranceReport {
        match self.kilometres() {
            Some(km) => ToleranceReport {
                latitude,
                north_south_km: km,
                east_west_km: km,
            },
            None => {
                let lon = 0.0;
                ToleranceReport {
                    latitude,
                    north_south_km: haversine_distance(latitude, lon, latitude + self.distance, lon),
                    east_west_km: haversine_distance(latitude, lon, latitude, lon + self.distance),
                }
            }
        }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.distance, self.unit)
    }
}

impl ToleranceReport {
    pub fn summary(&self) -> String {
        format!(
            "At latitude {:.2}: {:.2} km ({:.2} mi) north-south, {:.2} km ({:.2} mi) east-west",
            self.latitude,
            self.north_south_km,
            self.north_south_km / KM_PER_MILE,
            self.east_west_km,
            self.east_west_km / KM_PER_MILE
        )
    }
}
