use geo::{
    Closest, ClosestPoint, EuclideanDistance, HaversineClosestPoint, Intersects, LineString,
    MultiPolygon, Point,
};
use rayon::prelude::*;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use std::collections::HashMap;
use tracing::debug;

use crate::models::{BoundarySet, Tolerance};
use crate::utils::coordinates::haversine_distance;

type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Grid points assigned to each ZIP code.
///
/// A point belongs to a ZIP when it lies inside, or within the tolerance of,
/// any polygon carrying that code. A point is listed once per matching
/// polygon, so a point near two polygons of one ZIP weighs twice in that
/// ZIP's mean. Built once per grid geometry and reused while the axes stay
/// the same.
#[derive(Debug, Clone)]
pub struct JoinIndex {
    lats: Vec<f64>,
    lons: Vec<f64>,
    zip_codes: Vec<String>,
    members: Vec<Vec<usize>>,
}

impl JoinIndex {
    /// Match every `(lat, lon)` of the grid against the boundaries.
    ///
    /// Runs on the current rayon pool; wrap in `ThreadPool::install` to bound it.
    pub fn build(boundaries: &BoundarySet, lats: &[f64], lons: &[f64], tolerance: Tolerance) -> Self {
        let zip_codes = boundaries.zip_codes();
        let zip_lookup: HashMap<&str, usize> = zip_codes
            .iter()
            .enumerate()
            .map(|(i, z)| (z.as_str(), i))
            .collect();
        let polygon_zip: Vec<usize> = boundaries
            .boundaries()
            .iter()
            .map(|b| zip_lookup[b.zip_code.as_str()])
            .collect();

        let max_abs_lat = boundaries
            .bounding_box()
            .map(|b| b.max_abs_latitude())
            .unwrap_or(0.0);
        let (lat_margin, lon_margin) = tolerance.degree_margins(max_abs_lat);

        let envelopes: Vec<Envelope> = boundaries
            .boundaries()
            .iter()
            .enumerate()
            .filter_map(|(i, boundary)| {
                boundary.bounding_box().map(|bbox| {
                    let e = bbox.expand(lat_margin, lon_margin);
                    GeomWithData::new(
                        Rectangle::from_corners([e.min_lon, e.min_lat], [e.max_lon, e.max_lat]),
                        i,
                    )
                })
            })
            .collect();
        let tree = RTree::bulk_load(envelopes);

        let n_lon = lons.len();
        let hits: Vec<(usize, Vec<usize>)> = (0..lats.len() * n_lon)
            .into_par_iter()
            .filter_map(|index| {
                let lat = lats[index / n_lon];
                let lon = lons[index % n_lon];

                let mut zips: Vec<usize> = tree
                    .locate_all_at_point(&[lon, lat])
                    .filter(|candidate| {
                        let geometry = &boundaries.boundaries()[candidate.data].geometry;
                        is_within(geometry, lat, lon, &tolerance)
                    })
                    .map(|candidate| polygon_zip[candidate.data])
                    .collect();

                if zips.is_empty() {
                    return None;
                }
                zips.sort_unstable();
                Some((index, zips))
            })
            .collect();

        let mut members = vec![Vec::new(); zip_codes.len()];
        for (index, zips) in hits {
            for zip in zips {
                members[zip].push(index);
            }
        }

        debug!(
            zip_codes = zip_codes.len(),
            grid_points = lats.len() * n_lon,
            matched = members.iter().filter(|m| !m.is_empty()).count(),
            %tolerance,
            "Built join index"
        );

        Self {
            lats: lats.to_vec(),
            lons: lons.to_vec(),
            zip_codes,
            members,
        }
    }

    /// Whether this index was built for exactly these axes
    pub fn matches_axes(&self, lats: &[f64], lons: &[f64]) -> bool {
        self.lats == lats && self.lons == lons
    }

    /// All ZIP codes of the boundary set, sorted
    pub fn zip_codes(&self) -> &[String] {
        &self.zip_codes
    }

    /// ZIP codes paired with their flat grid point indices, in ZIP order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.zip_codes
            .iter()
            .zip(&self.members)
            .map(|(zip, members)| (zip.as_str(), members.as_slice()))
    }

    pub fn members(&self, zip_code: &str) -> Option<&[usize]> {
        self.zip_codes
            .binary_search_by(|z| z.as_str().cmp(zip_code))
            .ok()
            .map(|i| self.members[i].as_slice())
    }

    /// Whether no grid point joined any ZIP code
    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|m| m.is_empty())
    }

    /// ZIP codes no grid point fell near
    pub fn unmatched_zip_codes(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, members)| members.is_empty())
            .map(|(zip, _)| zip.to_string())
            .collect()
    }
}

/// Distance from a point to a geometry, zero inside.
///
/// Degree tolerances measure planar distance in coordinate units. Geodesic
/// tolerances measure great-circle kilometres to the nearest point on the
/// sphere of any ring.
pub fn distance_to_geometry(
    geometry: &MultiPolygon<f64>,
    lat: f64,
    lon: f64,
    tolerance: &Tolerance,
) -> f64 {
    let point = Point::new(lon, lat);
    if geometry.intersects(&point) {
        return 0.0;
    }

    if !tolerance.is_geodesic() {
        return point.euclidean_distance(geometry);
    }

    geometry
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| ring_distance_km(ring, &point))
        .fold(f64::INFINITY, f64::min)
}

fn ring_distance_km(ring: &LineString<f64>, point: &Point<f64>) -> f64 {
    let closest = match ring.haversine_closest_point(point) {
        Closest::Indeterminate => ring.closest_point(point),
        found => found,
    };
    match closest {
        Closest::Intersection(p) | Closest::SinglePoint(p) => {
            haversine_distance(point.y(), point.x(), p.y(), p.x())
        }
        Closest::Indeterminate => f64::INFINITY,
    }
}

fn is_within(geometry: &MultiPolygon<f64>, lat: f64, lon: f64, tolerance: &Tolerance) -> bool {
    let limit = tolerance.kilometres().unwrap_or(tolerance.distance);
    distance_to_geometry(geometry, lat, lon, tolerance) <= limit
}
