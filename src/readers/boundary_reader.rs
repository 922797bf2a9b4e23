use crate::archive::TempFileManager;
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{BoundarySet, ZipBoundary};
use crate::utils::constants::ZIP_CODE_WIDTH;
use crate::utils::coordinates::validate_coordinates;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Shape};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use validator::Validate;

const SHAPEFILE_EXTENSIONS: [&str; 5] = ["shp", "shx", "dbf", "prj", "cpg"];

/// Reads ZIP-code polygons from a shapefile or a zip archive holding one
pub struct BoundaryReader {
    zip_field: String,
    state_field: String,
    state: Option<String>,
}

impl BoundaryReader {
    pub fn new(zip_field: &str, state_field: &str, state: Option<&str>) -> Self {
        Self {
            zip_field: zip_field.to_string(),
            state_field: state_field.to_string(),
            state: state
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            &config.zip_field,
            &config.state_field,
            config.state.as_deref(),
        )
    }

    pub fn read(&self, path: &Path) -> Result<BoundarySet> {
        if has_extension(path, "zip") {
            let mut temp = TempFileManager::new()?;
            let extracted = temp.extract_files_with_extensions(path, &SHAPEFILE_EXTENSIONS)?;
            let shp = first_shapefile(&extracted).ok_or_else(|| {
                ProcessingError::MissingData(format!(
                    "No .shp file found in archive '{}'",
                    path.display()
                ))
            })?;
            debug!(archive = %path.display(), shapefile = %shp.display(), "Extracted boundary archive");
            return self.read_shapefile(&shp);
        }

        self.read_shapefile(path)
    }

    fn read_shapefile(&self, path: &Path) -> Result<BoundarySet> {
        let mut reader = shapefile::Reader::from_path(path)?;
        let mut boundaries = Vec::new();
        let mut total = 0usize;
        let mut null_shapes = 0usize;
        let mut blank_zip_codes = 0usize;

        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result?;
            total += 1;

            let geometry = match shape_to_multipolygon(shape)? {
                Some(geometry) => geometry,
                None => {
                    null_shapes += 1;
                    continue;
                }
            };

            let zip_code = field_as_string(&record, &self.zip_field)
                .map(|z| normalize_zip_code(&z))
                .unwrap_or_default();
            let state = field_as_string(&record, &self.state_field);
            let boundary = ZipBoundary::new(zip_code, state, geometry);

            if let Some(ref wanted) = self.state {
                if !boundary.is_in_state(wanted) {
                    continue;
                }
            }

            if boundary.validate().is_err() {
                blank_zip_codes += 1;
                warn!(
                    record = total,
                    path = %path.display(),
                    field = %self.zip_field,
                    "Skipping boundary without a ZIP code"
                );
                continue;
            }

            if let Some(bbox) = boundary.bounding_box() {
                validate_coordinates(bbox.min_lat, bbox.min_lon)?;
                validate_coordinates(bbox.max_lat, bbox.max_lon)?;
            }
            boundaries.push(boundary);
        }

        if boundaries.is_empty() {
            return Err(ProcessingError::MissingData(match self.state {
                Some(ref state) => format!(
                    "No boundaries in '{}' have {} = {}",
                    path.display(),
                    self.state_field,
                    state
                ),
                None => format!("No polygon boundaries in '{}'", path.display()),
            }));
        }

        let crs = read_projection(path)?;
        let set = BoundarySet::new(boundaries, crs);

        info!(
            path = %path.display(),
            records = total,
            kept = set.len(),
            zip_codes = set.zip_codes().len(),
            null_shapes,
            blank_zip_codes,
            "Loaded ZIP boundaries"
        );

        Ok(set)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn first_shapefile(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut shapefiles: Vec<&PathBuf> = paths.iter().filter(|p| has_extension(p, "shp")).collect();
    shapefiles.sort();
    shapefiles.first().map(|p| p.to_path_buf())
}

/// Contents of the `.prj` sidecar, if any
fn read_projection(shp_path: &Path) -> Result<Option<String>> {
    for extension in ["prj", "PRJ"] {
        let prj = shp_path.with_extension(extension);
        if prj.exists() {
            let text = std::fs::read_to_string(prj)?;
            let text = text.trim();
            return Ok((!text.is_empty()).then(|| text.to_string()));
        }
    }
    Ok(None)
}

/// Attribute as trimmed text; whole numbers lose their decimal point
pub fn field_as_string(record: &Record, name: &str) -> Option<String> {
    let text = match record.get(name)? {
        FieldValue::Character(Some(s)) => s.clone(),
        FieldValue::Memo(s) => s.clone(),
        FieldValue::Numeric(Some(n)) => format_number(*n),
        FieldValue::Double(n) => format_number(*n),
        FieldValue::Float(Some(n)) => format_number(f64::from(*n)),
        FieldValue::Integer(n) => n.to_string(),
        _ => return None,
    };

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Left-pad purely numeric codes to five digits, e.g. `1001` -> `01001`
pub fn normalize_zip_code(zip: &str) -> String {
    let zip = zip.trim();
    if !zip.is_empty() && zip.len() < ZIP_CODE_WIDTH && zip.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>width$}", zip, width = ZIP_CODE_WIDTH)
    } else {
        zip.to_string()
    }
}

/// Convert a shapefile shape to a multipolygon; null shapes give `None`
pub fn shape_to_multipolygon(shape: Shape) -> Result<Option<MultiPolygon<f64>>> {
    match shape {
        Shape::NullShape => Ok(None),
        Shape::Polygon(polygon) => Ok(Some(rings_to_multipolygon(polygon.rings(), |p| {
            (p.x, p.y)
        }))),
        Shape::PolygonM(polygon) => Ok(Some(rings_to_multipolygon(polygon.rings(), |p| {
            (p.x, p.y)
        }))),
        Shape::PolygonZ(polygon) => Ok(Some(rings_to_multipolygon(polygon.rings(), |p| {
            (p.x, p.y)
        }))),
        other => Err(ProcessingError::InvalidFormat(format!(
            "Expected polygon boundaries, found {:?} shape",
            other.shapetype()
        ))),
    }
}

/// Outer rings open a new polygon, inner rings are holes of the latest outer ring
fn rings_to_multipolygon<P, F>(rings: &[PolygonRing<P>], xy: F) -> MultiPolygon<f64>
where
    F: Fn(&P) -> (f64, f64),
{
    let mut polygons: Vec<Polygon<f64>> = Vec::new();

    for ring in rings {
        let coords: Vec<Coord<f64>> = ring
            .points()
            .iter()
            .map(|p| {
                let (x, y) = xy(p);
                Coord { x, y }
            })
            .collect();
        let line = LineString::from(coords);

        match ring {
            PolygonRing::Outer(_) => polygons.push(Polygon::new(line, vec![])),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some(polygon) => polygon.interiors_push(line),
                // A hole with no shell is kept as a shell
                None => polygons.push(Polygon::new(line, vec![])),
            },
        }
    }

    MultiPolygon::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point as GeoPoint};
    use shapefile::dbase::{FieldName, TableWriterBuilder};
    use shapefile::Point;
    use std::convert::TryFrom;
    use tempfile::TempDir;

    // Clockwise, as shapefiles expect for outer rings
    fn clockwise_square(min_x: f64, min_y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(min_x, min_y),
            Point::new(min_x, min_y + size),
            Point::new(min_x + size, min_y + size),
            Point::new(min_x + size, min_y),
            Point::new(min_x, min_y),
        ]
    }

    fn write_test_shapefile(dir: &Path) -> PathBuf {
        write_shapefile(dir, &[("85001", "AZ", -112.1), ("87101", "NM", -106.7), ("85004", "AZ", -112.0)])
    }

    fn write_shapefile(dir: &Path, rows: &[(&str, &str, f64)]) -> PathBuf {
        let path = dir.join("zips.shp");
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from("ZIP_CODE").unwrap(), 5)
            .add_character_field(FieldName::try_from("STATE").unwrap(), 2);

        {
            let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
            for &(zip, state, x) in rows {
                let polygon = shapefile::Polygon::new(PolygonRing::Outer(clockwise_square(x, 33.4, 0.05)));
                let mut record = Record::default();
                record.insert("ZIP_CODE".to_string(), FieldValue::Character(Some(zip.to_string())));
                record.insert("STATE".to_string(), FieldValue::Character(Some(state.to_string())));
                writer.write_shape_and_record(&polygon, &record).unwrap();
            }
        }

        std::fs::write(dir.join("zips.prj"), "GEOGCS[\"GCS_North_American_1983\"]\n").unwrap();
        path
    }

    #[test]
    fn test_read_filters_state() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_test_shapefile(dir.path());

        let reader = BoundaryReader::new("ZIP_CODE", "STATE", Some("AZ"));
        let set = reader.read(&path)?;

        assert_eq!(set.len(), 2);
        assert_eq!(set.zip_codes(), vec!["85001".to_string(), "85004".to_string()]);
        assert_eq!(set.crs(), Some("GEOGCS[\"GCS_North_American_1983\"]"));

        let first = &set.boundaries()[0];
        assert!(first.geometry.contains(&GeoPoint::new(-112.075, 33.425)));

        Ok(())
    }

    #[test]
    fn test_read_without_state_filter() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_test_shapefile(dir.path());

        let set = BoundaryReader::new("ZIP_CODE", "STATE", None).read(&path)?;
        assert_eq!(set.len(), 3);

        Ok(())
    }

    #[test]
    fn test_no_matching_state_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_test_shapefile(dir.path());

        let result = BoundaryReader::new("ZIP_CODE", "STATE", Some("TX")).read(&path);
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));

        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = BoundaryReader::new("ZIP_CODE", "STATE", Some("AZ"))
            .read(Path::new("does/not/exist.shp"));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_zipped_shapefile() -> Result<()> {
        use std::io::Write;
        use zip::write::FileOptions;

        let dir = TempDir::new()?;
        write_test_shapefile(dir.path());

        let archive_path = dir.path().join("zips.zip");
        {
            let file = std::fs::File::create(&archive_path)?;
            let mut zip = zip::ZipWriter::new(file);
            for ext in ["shp", "shx", "dbf", "prj"] {
                zip.start_file(format!("bundle/zips.{}", ext), FileOptions::default())?;
                zip.write_all(&std::fs::read(dir.path().join(format!("zips.{}", ext)))?)?;
            }
            zip.finish()?;
        }

        let set = BoundaryReader::new("ZIP_CODE", "STATE", Some("NM")).read(&archive_path)?;
        assert_eq!(set.zip_codes(), vec!["87101".to_string()]);
        assert!(set.crs().is_some());

        Ok(())
    }

    #[test]
    fn test_blank_zip_codes_are_skipped() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_shapefile(dir.path(), &[("85001", "AZ", -112.1), ("", "AZ", -112.0), ("  ", "NM", -106.7)]);

        let set = BoundaryReader::new("ZIP_CODE", "STATE", None).read(&path)?;
        assert_eq!(set.zip_codes(), vec!["85001".to_string()]);

        let only_blank = write_shapefile(dir.path(), &[("", "AZ", -112.0)]);
        let result = BoundaryReader::new("ZIP_CODE", "STATE", Some("AZ")).read(&only_blank);
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));

        Ok(())
    }

    #[test]
    fn test_zipped_shapefile_with_uppercase_sidecars() -> Result<()> {
        use std::io::Write;
        use zip::write::FileOptions;

        let dir = TempDir::new()?;
        write_test_shapefile(dir.path());

        let archive_path = dir.path().join("ZIPS.ZIP");
        {
            let file = std::fs::File::create(&archive_path)?;
            let mut zip = zip::ZipWriter::new(file);
            for ext in ["shp", "shx", "dbf", "prj"] {
                zip.start_file(format!("ZIPS.{}", ext.to_uppercase()), FileOptions::default())?;
                zip.write_all(&std::fs::read(dir.path().join(format!("zips.{}", ext)))?)?;
            }
            zip.finish()?;
        }

        let set = BoundaryReader::new("ZIP_CODE", "STATE", Some("AZ")).read(&archive_path)?;
        assert_eq!(set.zip_codes(), vec!["85001".to_string(), "85004".to_string()]);
        assert!(set.crs().is_some());

        Ok(())
    }

    #[test]
    fn test_rings_with_hole() {
        let outer = clockwise_square(0.0, 0.0, 10.0);
        let hole = vec![
            Point::new(2.0, 2.0),
            Point::new(4.0, 2.0),
            Point::new(4.0, 4.0),
            Point::new(2.0, 4.0),
            Point::new(2.0, 2.0),
        ];
        let rings = vec![
            PolygonRing::Outer(outer),
            PolygonRing::Inner(hole),
            PolygonRing::Outer(clockwise_square(20.0, 0.0, 1.0)),
        ];

        let multi = rings_to_multipolygon(&rings, |p| (p.x, p.y));

        assert_eq!(multi.0.len(), 2);
        assert_eq!(multi.0[0].interiors().len(), 1);
        assert!((multi.unsigned_area() - (100.0 - 4.0 + 1.0)).abs() < 1e-9);
        assert!(!multi.contains(&GeoPoint::new(3.0, 3.0)));
        assert!(multi.contains(&GeoPoint::new(6.0, 6.0)));
    }

    #[test]
    fn test_non_polygon_shape_is_rejected() {
        let shape = Shape::Point(Point::new(1.0, 2.0));
        assert!(shape_to_multipolygon(shape).is_err());
        assert!(shape_to_multipolygon(Shape::NullShape).unwrap().is_none());
    }

    #[test]
    fn test_field_values() {
        let mut record = Record::default();
        record.insert("ZIP".to_string(), FieldValue::Numeric(Some(1001.0)));
        record.insert("NAME".to_string(), FieldValue::Character(Some("  Phoenix ".to_string())));
        record.insert("BLANK".to_string(), FieldValue::Character(Some("   ".to_string())));

        assert_eq!(field_as_string(&record, "ZIP").as_deref(), Some("1001"));
        assert_eq!(field_as_string(&record, "NAME").as_deref(), Some("Phoenix"));
        assert_eq!(field_as_string(&record, "BLANK"), None);
        assert_eq!(field_as_string(&record, "MISSING"), None);
    }

    #[test]
    fn test_normalize_zip_code() {
        assert_eq!(normalize_zip_code("1001"), "01001");
        assert_eq!(normalize_zip_code("85001"), "85001");
        assert_eq!(normalize_zip_code(" 85001 "), "85001");
        assert_eq!(normalize_zip_code("850XX"), "850XX");
    }
}
