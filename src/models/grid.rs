use crate::error::{ProcessingError, Result};
use crate::models::MonthPeriod;

/// One month of a gridded variable, values in `(time, lat, lon)` order.
///
/// Missing cells are `NaN`.
#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub period: MonthPeriod,
    lats: Vec<f64>,
    lons: Vec<f64>,
    days: usize,
    values: Vec<f32>,
}

impl MonthGrid {
    pub fn new(
        period: MonthPeriod,
        lats: Vec<f64>,
        lons: Vec<f64>,
        days: usize,
        values: Vec<f32>,
    ) -> Result<Self> {
        let expected = days * lats.len() * lons.len();
        if values.len() != expected {
            return Err(ProcessingError::InvalidFormat(format!(
                "Grid for {} has {} values, expected {} ({} days x {} lat x {} lon)",
                period,
                values.len(),
                expected,
                days,
                lats.len(),
                lons.len()
            )));
        }

        Ok(Self {
            period,
            lats,
            lons,
            days,
            values,
        })
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn points_per_day(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    /// Values for a 0-indexed day, flattened as `lat_index * n_lon + lon_index`
    pub fn day_values(&self, day: usize) -> Option<&[f32]> {
        if day >= self.days {
            return None;
        }
        let n = self.points_per_day();
        Some(&self.values[day * n..(day + 1) * n])
    }

    /// (lat, lon) of a flat point index
    pub fn point(&self, index: usize) -> Option<(f64, f64)> {
        let n_lon = self.lons.len();
        if n_lon == 0 || index >= self.points_per_day() {
            return None;
        }
        Some((self.lats[index / n_lon], self.lons[index % n_lon]))
    }
}
