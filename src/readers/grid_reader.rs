use crate::archive::TempFileManager;
use crate::error::{ProcessingError, Result};
use crate::models::{MonthGrid, MonthPeriod};
use crate::utils::constants::{LAT_VARIABLE, LON_VARIABLE, TIME_DIMENSION};
use crate::utils::coordinates::GeoBoundingBox;
use crate::utils::filename::scratch_file_name;
use netcdf::AttributeValue;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Packing and masking attributes of a gridded variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueDecoding {
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Default for ValueDecoding {
    fn default() -> Self {
        Self {
            fill_value: None,
            missing_value: None,
            scale_factor: 1.0,
            add_offset: 0.0,
        }
    }
}

impl ValueDecoding {
    /// Unpack a raw value; fill and missing markers become `NaN`
    pub fn decode(&self, raw: f32) -> f32 {
        let raw64 = f64::from(raw);
        let is_marker = |marker: Option<f64>| {
            marker.is_some_and(|m| raw64 == m || (raw64 - m).abs() <= m.abs() * 1e-6)
        };

        if raw.is_nan() || is_marker(self.fill_value) || is_marker(self.missing_value) {
            return f32::NAN;
        }

        (raw64 * self.scale_factor + self.add_offset) as f32
    }
}

/// Decodes one month of a gridded NetCDF variable
pub struct GridReader {
    variable: String,
    window: Option<GeoBoundingBox>,
}

impl GridReader {
    pub fn new(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            window: None,
        }
    }

    /// Only read cells inside `window`
    pub fn with_window(mut self, window: GeoBoundingBox) -> Self {
        self.window = Some(window);
        self
    }

    /// Decode downloaded bytes through a scratch file
    pub fn read_bytes(&self, bytes: &[u8], period: MonthPeriod) -> Result<MonthGrid> {
        if bytes.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Empty response body for {}",
                period
            )));
        }

        let temp = TempFileManager::new()?;
        let path = temp.write_scratch(&scratch_file_name(&period), bytes)?;
        self.read_file(&path, period)
    }

    pub fn read_file(&self, path: &Path, period: MonthPeriod) -> Result<MonthGrid> {
        let file = netcdf::open(path)?;

        let lats = read_axis(&file, LAT_VARIABLE)?;
        let lons = read_axis(&file, LON_VARIABLE)?;

        let variable = file.variable(&self.variable).ok_or_else(|| {
            ProcessingError::MissingData(format!(
                "Variable '{}' not found in grid for {}",
                self.variable, period
            ))
        })?;

        let dims: Vec<String> = variable.dimensions().iter().map(|d| d.name()).collect();
        if dims != [TIME_DIMENSION, LAT_VARIABLE, LON_VARIABLE] {
            return Err(ProcessingError::InvalidFormat(format!(
                "Variable '{}' has dimensions {:?}, expected ({}, {}, {})",
                self.variable, dims, TIME_DIMENSION, LAT_VARIABLE, LON_VARIABLE
            )));
        }
        let days = variable.dimensions()[0].len();

        let (lat_range, lon_range) = match self.window {
            Some(window) => {
                let lat_range = axis_window(&lats, window.min_lat, window.max_lat);
                let lon_range = axis_window(&lons, window.min_lon, window.max_lon);
                if lat_range.is_empty() || lon_range.is_empty() {
                    return Err(ProcessingError::MissingData(format!(
                        "No grid points for {} inside lon {:.4}..{:.4}, lat {:.4}..{:.4}",
                        period, window.min_lon, window.max_lon, window.min_lat, window.max_lat
                    )));
                }
                (lat_range, lon_range)
            }
            None => (0..lats.len(), 0..lons.len()),
        };

        let decoding = read_decoding(&variable)?;
        let values: Vec<f32> = if lat_range.is_empty() || lon_range.is_empty() {
            Vec::new()
        } else {
            variable
                .get_values::<f32, _>((.., lat_range.clone(), lon_range.clone()))?
                .into_iter()
                .map(|v| decoding.decode(v))
                .collect()
        };

        let (lats, lons) = if values.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (lats[lat_range].to_vec(), lons[lon_range].to_vec())
        };

        debug!(
            %period,
            days,
            lat = lats.len(),
            lon = lons.len(),
            ?decoding,
            "Decoded grid"
        );

        MonthGrid::new(period, lats, lons, days, values)
    }
}

fn read_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let variable = file.variable(name).ok_or_else(|| {
        ProcessingError::MissingData(format!("Coordinate variable '{}' not found", name))
    })?;
    Ok(variable.get_values::<f64, _>(..)?)
}

fn read_decoding(variable: &netcdf::Variable) -> Result<ValueDecoding> {
    let number = |name: &str| -> Result<Option<f64>> {
        match variable.attribute(name) {
            Some(attribute) => Ok(attribute_as_f64(&attribute.value()?)),
            None => Ok(None),
        }
    };

    Ok(ValueDecoding {
        fill_value: number("_FillValue")?,
        missing_value: number("missing_value")?,
        scale_factor: number("scale_factor")?.unwrap_or(1.0),
        add_offset: number("add_offset")?.unwrap_or(0.0),
    })
}

/// Scalar numeric attribute as f64
pub fn attribute_as_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Uchar(v) => Some(f64::from(*v)),
        AttributeValue::Schar(v) => Some(f64::from(*v)),
        AttributeValue::Ushort(v) => Some(f64::from(*v)),
        AttributeValue::Short(v) => Some(f64::from(*v)),
        AttributeValue::Uint(v) => Some(f64::from(*v)),
        AttributeValue::Int(v) => Some(f64::from(*v)),
        AttributeValue::Ulonglong(v) => Some(*v as f64),
        AttributeValue::Longlong(v) => Some(*v as f64),
        AttributeValue::Float(v) => Some(f64::from(*v)),
        AttributeValue::Double(v) => Some(*v),
        AttributeValue::Floats(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    }
}

/// Contiguous index range of a monotonic axis falling inside `[min, max]`
pub fn axis_window(axis: &[f64], min: f64, max: f64) -> Range<usize> {
    let inside: Vec<usize> = axis
        .iter()
        .enumerate()
        .filter(|(_, v)| (min..=max).contains(*v))
        .map(|(i, _)| i)
        .collect();

    match (inside.first(), inside.last()) {
        (Some(&first), Some(&last)) => first..last + 1,
        _ => 0..0,
    }
}
