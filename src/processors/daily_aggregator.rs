use crate::error::{ProcessingError, Result};
use crate::models::{DailyZipRecord, MonthGrid};
use crate::processors::JoinIndex;
use crate::utils::units::celsius_to_fahrenheit;

/// Averages joined grid values per ZIP code and day
pub struct DailyAggregator<'a> {
    index: &'a JoinIndex,
}

impl<'a> DailyAggregator<'a> {
    pub fn new(index: &'a JoinIndex) -> Self {
        Self { index }
    }

    /// Records for every day of the month, ordered by date then ZIP code
    pub fn aggregate_month(&self, grid: &MonthGrid) -> Result<Vec<DailyZipRecord>> {
        if !self.index.matches_axes(grid.lats(), grid.lons()) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Grid axes for {} do not match the join index",
                grid.period
            )));
        }

        let mut records = Vec::with_capacity(grid.days() * self.index.zip_codes().len());
        for day in 0..grid.days() {
            records.extend(self.aggregate_day(grid, day)?);
        }
        Ok(records)
    }

    /// Records for one 0-indexed day.
    ///
    /// ZIP codes with no valid joined value that day produce no record.
    pub fn aggregate_day(&self, grid: &MonthGrid, day: usize) -> Result<Vec<DailyZipRecord>> {
        let date = grid.period.date(day as u32 + 1)?;
        let values = grid.day_values(day).ok_or_else(|| {
            ProcessingError::MissingData(format!("Day {} missing from grid for {}", day + 1, grid.period))
        })?;

        let records = self
            .index
            .iter()
            .filter_map(|(zip_code, members)| {
                mean_celsius(values, members).map(|(mean, count)| {
                    DailyZipRecord::new(date, zip_code.to_string(), celsius_to_fahrenheit(mean), count)
                })
            })
            .collect();

        Ok(records)
    }
}

/// Mean of the non-NaN values at `members`, with the number averaged
fn mean_celsius(values: &[f32], members: &[usize]) -> Option<(f64, usize)> {
    let (sum, count) = members
        .iter()
        .filter_map(|&i| values.get(i))
        .filter(|v| !v.is_nan())
        .fold((0.0f64, 0usize), |(sum, count), &v| (sum + f64::from(v), count + 1));

    (count > 0).then(|| (sum / count as f64, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundarySet, DistanceUnit, MonthPeriod, Tolerance, ZipBoundary};
    use chrono::NaiveDate;
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

    fn index(lats: &[f64], lons: &[f64]) -> JoinIndex {
        let boundaries = BoundarySet::new(
            vec![
                ZipBoundary::new("85001".to_string(), None, square(-112.0, 33.0, 1.0)),
                ZipBoundary::new("85002".to_string(), None, square(-111.0, 33.0, 1.0)),
                ZipBoundary::new("86001".to_string(), None, square(-100.0, 40.0, 1.0)),
            ],
            None,
        );
        JoinIndex::build(&boundaries, lats, lons, Tolerance::new(0.01, DistanceUnit::Degrees))
    }

    #[test]
    fn test_mean_ignores_missing_values() {
        assert_eq!(mean_celsius(&[10.0, f32::NAN, 20.0], &[0, 1, 2]), Some((15.0, 2)));
        assert_eq!(mean_celsius(&[f32::NAN], &[0]), None);
        assert_eq!(mean_celsius(&[1.0], &[]), None);
    }

    #[test]
    fn test_aggregate_month() {
        let lats = vec![33.5];
        let lons = vec![-111.75, -111.25, -110.5];
        let index = index(&lats, &lons);
        let grid = MonthGrid::new(
            MonthPeriod::new(2021, 2).unwrap(),
            lats,
            lons,
            2,
            vec![
                20.0, 30.0, 100.0, // day 1
                f32::NAN, f32::NAN, -10.0, // day 2
            ],
        )
        .unwrap();

        let records = DailyAggregator::new(&index).aggregate_month(&grid).unwrap();

        let first = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
        let second = NaiveDate::from_ymd_opt(2021, 2, 2).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!((records[0].date, records[0].zip_code.as_str()), (first, "85001"));
        assert!((records[0].tmax_f - 77.0).abs() < 1e-9);
        assert_eq!(records[0].point_count, 2);
        assert_eq!((records[1].date, records[1].zip_code.as_str()), (first, "85002"));
        assert!((records[1].tmax_f - 212.0).abs() < 1e-9);
        assert_eq!((records[2].date, records[2].zip_code.as_str()), (second, "85002"));
        assert!((records[2].tmax_f - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_weigh_once_per_matching_polygon() {
        // Two polygons of one ZIP code touching at x = -111.9
        let boundaries = BoundarySet::new(
            vec![
                ZipBoundary::new("85001".to_string(), None, square(-112.0, 33.0, 0.1)),
                ZipBoundary::new("85001".to_string(), None, square(-111.9, 33.0, 0.1)),
            ],
            None,
        );
        let lats = vec![33.05];
        let lons = vec![-111.9, -111.95];
        let index = JoinIndex::build(&boundaries, &lats, &lons, Tolerance::new(0.001, DistanceUnit::Degrees));
        let grid = MonthGrid::new(MonthPeriod::new(2021, 7).unwrap(), lats, lons, 1, vec![10.0, 40.0]).unwrap();

        let records = DailyAggregator::new(&index).aggregate_day(&grid, 0).unwrap();

        // (10 + 10 + 40) / 3 = 20 C
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].point_count, 3);
        assert!((records[0].tmax_f - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_axes_are_rejected() {
        let index = index(&[33.5], &[-111.5]);
        let grid = MonthGrid::new(
            MonthPeriod::new(2021, 2).unwrap(),
            vec![34.5],
            vec![-111.5],
            1,
            vec![1.0],
        )
        .unwrap();

        assert!(DailyAggregator::new(&index).aggregate_month(&grid).is_err());
    }

    #[test]
    fn test_day_beyond_calendar_is_an_error() {
        let lats = vec![33.5];
        let lons = vec![-111.5];
        let index = index(&lats, &lons);
        let grid = MonthGrid::new(
            MonthPeriod::new(2021, 2).unwrap(),
            lats,
            lons,
            29,
            vec![25.0; 29],
        )
        .unwrap();

        let result = DailyAggregator::new(&index).aggregate_month(&grid);
        assert!(matches!(result, Err(ProcessingError::InvalidDate { day: 29, .. })));
    }
}
