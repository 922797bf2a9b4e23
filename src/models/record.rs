use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::constants::{MAX_PLAUSIBLE_TMAX_F, MIN_PLAUSIBLE_TMAX_F};

/// Average daily maximum over one ZIP code on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyZipRecord {
    pub date: NaiveDate,
    pub zip_code: String,
    pub tmax_f: f64,
    /// Grid points that contributed to the average
    #[serde(skip)]
    pub point_count: usize,
}

impl DailyZipRecord {
    pub fn new(date: NaiveDate, zip_code: String, tmax_f: f64, point_count: usize) -> Self {
        Self {
            date,
            zip_code,
            tmax_f,
            point_count,
        }
    }

    pub fn is_plausible(&self) -> bool {
        (MIN_PLAUSIBLE_TMAX_F..=MAX_PLAUSIBLE_TMAX_F).contains(&self.tmax_f)
    }
}

/// A record as written, with its sequential ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "ID")]
    pub id: u64,
    pub date: NaiveDate,
    pub zip_code: String,
    #[serde(rename = "daily_Tmax_degF")]
    pub daily_tmax_deg_f: f64,
}

impl OutputRow {
    pub fn from_record(id: u64, record: &DailyZipRecord) -> Self {
        Self {
            id,
            date: record.date,
            zip_code: record.zip_code.clone(),
            daily_tmax_deg_f: record.tmax_f,
        }
    }
}

/// Number records from 0 in accumulation order
pub fn number_rows(records: &[DailyZipRecord]) -> Vec<OutputRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| OutputRow::from_record(i as u64, r))
        .collect()
}
