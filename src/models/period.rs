use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProcessingError, Result};

/// One calendar month of grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Month must be between 1 and 12, got: {}",
                month
            )));
        }

        Ok(Self { year, month })
    }

    /// Every month from January of `year_start` through `month_stop_final` of `year_stop`.
    ///
    /// Years before `year_stop` always run to December.
    pub fn range(year_start: i32, year_stop: i32, month_stop_final: u32) -> Vec<MonthPeriod> {
        let mut periods = Vec::new();

        for year in year_start..=year_stop {
            let month_stop = if year == year_stop {
                month_stop_final.min(12)
            } else {
                12
            };

            for month in 1..=month_stop {
                periods.push(MonthPeriod { year, month });
            }
        }

        periods
    }

    /// Calendar date for a 1-indexed day of this month
    pub fn date(&self, day: u32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day).ok_or(ProcessingError::InvalidDate {
            year: self.year,
            month: self.month,
            day,
        })
    }

    pub fn last_day(&self) -> Result<NaiveDate> {
        self.date(self.days_in_month())
    }

    pub fn days_in_month(&self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };

        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .map(|d| d.day())
            .unwrap_or(31)
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_stops_at_final_month() {
        let periods = MonthPeriod::range(2020, 2024, 5);

        assert_eq!(periods.len(), 4 * 12 + 5);
        assert_eq!(periods.first(), Some(&MonthPeriod { year: 2020, month: 1 }));
        assert_eq!(periods.last(), Some(&MonthPeriod { year: 2024, month: 5 }));
        assert_eq!(
            periods.last().unwrap().last_day().unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
    }

    #[test]
    fn test_single_year_range() {
        let periods = MonthPeriod::range(2022, 2022, 3);
        assert_eq!(periods.len(), 3);
        assert!(MonthPeriod::range(2023, 2022, 12).is_empty());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(MonthPeriod::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(MonthPeriod::new(2023, 2).unwrap().days_in_month(), 28);
        assert_eq!(MonthPeriod::new(2023, 12).unwrap().days_in_month(), 31);
        assert_eq!(MonthPeriod::new(2023, 4).unwrap().days_in_month(), 30);
    }

    #[test]
    fn test_date_construction() {
        let period = MonthPeriod::new(2021, 2).unwrap();
        assert_eq!(
            period.date(28).unwrap(),
            NaiveDate::from_ymd_opt(2021, 2, 28).unwrap()
        );
        assert!(matches!(
            period.date(29),
            Err(ProcessingError::InvalidDate { day: 29, .. })
        ));
        assert!(MonthPeriod::new(2021, 13).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(MonthPeriod::new(2020, 7).unwrap().to_string(), "2020/07");
    }
}
