use geo::{BoundingRect, MultiPolygon};
use serde::Serialize;
use std::collections::BTreeSet;
use validator::Validate;

use crate::models::Tolerance;
use crate::utils::coordinates::GeoBoundingBox;

/// A ZIP-code delivery area
#[derive(Debug, Clone, Validate)]
pub struct ZipBoundary {
    #[validate(length(min = 1))]
    pub zip_code: String,

    pub state: Option<String>,

    pub geometry: MultiPolygon<f64>,
}

impl ZipBoundary {
    pub fn new(zip_code: String, state: Option<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            zip_code,
            state,
            geometry,
        }
    }

    pub fn bounding_box(&self) -> Option<GeoBoundingBox> {
        self.geometry
            .bounding_rect()
            .map(|r| GeoBoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    pub fn is_in_state(&self, state: &str) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(state.trim()))
    }
}

/// Polygons for one state, loaded once and shared read-only
#[derive(Debug, Clone)]
pub struct BoundarySet {
    boundaries: Vec<ZipBoundary>,
    crs: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundarySummary {
    pub polygons: usize,
    pub zip_codes: usize,
    pub crs: Option<String>,
    pub bounding_box: Option<GeoBoundingBox>,
}

impl BoundarySet {
    pub fn new(boundaries: Vec<ZipBoundary>, crs: Option<String>) -> Self {
        Self { boundaries, crs }
    }

    pub fn boundaries(&self) -> &[ZipBoundary] {
        &self.boundaries
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Distinct ZIP codes, sorted
    pub fn zip_codes(&self) -> Vec<String> {
        self.boundaries
            .iter()
            .map(|b| b.zip_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn bounding_box(&self) -> Option<GeoBoundingBox> {
        self.boundaries
            .iter()
            .filter_map(|b| b.bounding_box())
            .reduce(|acc, bbox| acc.union(&bbox))
    }

    /// Region of the grid that can fall within `tolerance` of any polygon
    pub fn join_window(&self, tolerance: &Tolerance) -> Option<GeoBoundingBox> {
        self.bounding_box().map(|bbox| {
            let (lat_margin, lon_margin) = tolerance.degree_margins(bbox.max_abs_latitude());
            bbox.expand(lat_margin, lon_margin)
        })
    }

    pub fn centroid_latitude(&self) -> Option<f64> {
        self.bounding_box().map(|b| b.center_latitude())
    }

    pub fn summary(&self) -> BoundarySummary {
        BoundarySummary {
            polygons: self.len(),
            zip_codes: self.zip_codes().len(),
            crs: self.crs.clone(),
            bounding_box: self.bounding_box(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min_x, y: min_y),
            (x: min_x + size, y: min_y),
            (x: min_x + size, y: min_y + size),
            (x: min_x, y: min_y + size),
            (x: min_x, y: min_y),
        ]])
    }

    #[test]
    fn test_boundary_validation() {
        let boundary = ZipBoundary::new("85001".to_string(), Some("AZ".to_string()), square(-112.1, 33.4, 0.1));
        assert!(boundary.validate().is_ok());
        assert!(boundary.is_in_state("az"));
        assert!(!boundary.is_in_state("NM"));

        let unnamed = ZipBoundary::new(String::new(), None, square(-112.1, 33.4, 0.1));
        assert!(unnamed.validate().is_err());
        assert!(!unnamed.is_in_state("AZ"));
    }

    #[test]
    fn test_set_bounds_and_codes() {
        let set = BoundarySet::new(
            vec![
                ZipBoundary::new("85003".to_string(), None, square(-112.0, 33.0, 1.0)),
                ZipBoundary::new("85001".to_string(), None, square(-110.0, 34.0, 0.5)),
                ZipBoundary::new("85003".to_string(), None, square(-111.0, 32.0, 0.5)),
            ],
            Some("GEOGCS[\"GCS_WGS_1984\"]".to_string()),
        );

        assert_eq!(set.len(), 3);
        assert_eq!(set.zip_codes(), vec!["85001".to_string(), "85003".to_string()]);

        let bbox = set.bounding_box().unwrap();
        assert_eq!(bbox, GeoBoundingBox::new(-112.0, 32.0, -109.5, 34.5));
        assert_eq!(set.centroid_latitude(), Some(33.25));

        let summary = set.summary();
        assert_eq!(summary.polygons, 3);
        assert_eq!(summary.zip_codes, 2);
        assert!(summary.crs.unwrap().contains("WGS_1984"));
    }

    #[test]
    fn test_join_window() {
        let set = BoundarySet::new(
            vec![ZipBoundary::new("85001".to_string(), None, square(-112.0, 33.0, 1.0))],
            None,
        );

        let window = set.join_window(&Tolerance::default()).unwrap();
        assert!((window.min_lon - -112.03).abs() < 1e-9);
        assert!((window.max_lat - 34.03).abs() < 1e-9);
    }

    #[test]
    fn test_empty_set() {
        let set = BoundarySet::new(Vec::new(), None);
        assert!(set.is_empty());
        assert!(set.bounding_box().is_none());
        assert!(set.join_window(&Tolerance::default()).is_none());
    }
}
