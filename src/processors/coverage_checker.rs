use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::processors::{RunOutcome, SkippedMonth};
use crate::utils::constants::{MAX_PLAUSIBLE_TMAX_F, MIN_PLAUSIBLE_TMAX_F};

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub total_records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub processed_months: usize,
    pub skipped_months: Vec<SkippedMonth>,
    pub zip_statistics: BTreeMap<String, ZipStatistics>,
    pub unmatched_zip_codes: Vec<String>,
    pub temperature_violations: Vec<TemperatureViolation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureViolation {
    pub zip_code: String,
    pub date: NaiveDate,
    pub tmax_f: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ZipStatistics {
    pub days: usize,
    pub min_tmax_f: Option<f64>,
    pub max_tmax_f: Option<f64>,
    pub mean_tmax_f: Option<f64>,
}

pub struct CoverageChecker;

impl CoverageChecker {
    pub fn new() -> Self {
        Self
    }

    /// Summarise what a run produced
    pub fn check(&self, outcome: &RunOutcome) -> CoverageReport {
        let mut zip_statistics: BTreeMap<String, ZipStatistics> = BTreeMap::new();
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        let mut temperature_violations = Vec::new();

        for record in &outcome.records {
            let stats = zip_statistics.entry(record.zip_code.clone()).or_default();
            stats.days += 1;
            stats.min_tmax_f = Some(stats.min_tmax_f.map_or(record.tmax_f, |t| t.min(record.tmax_f)));
            stats.max_tmax_f = Some(stats.max_tmax_f.map_or(record.tmax_f, |t| t.max(record.tmax_f)));
            *sums.entry(&record.zip_code).or_default() += record.tmax_f;

            // Reported, never fatal
            if !record.is_plausible() {
                temperature_violations.push(TemperatureViolation {
                    zip_code: record.zip_code.clone(),
                    date: record.date,
                    tmax_f: record.tmax_f,
                });
            }
        }

        for (zip_code, stats) in zip_statistics.iter_mut() {
            if let Some(sum) = sums.get(zip_code.as_str()) {
                stats.mean_tmax_f = Some(sum / stats.days as f64);
            }
        }

        CoverageReport {
            total_records: outcome.records.len(),
            first_date: outcome.records.iter().map(|r| r.date).min(),
            last_date: outcome.records.iter().map(|r| r.date).max(),
            processed_months: outcome.processed.len(),
            skipped_months: outcome.skipped.clone(),
            zip_statistics,
            unmatched_zip_codes: outcome.unmatched_zip_codes.clone(),
            temperature_violations,
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &CoverageReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Coverage Report ===\n");
        summary.push_str(&format!("Total Records: {}\n", report.total_records));
        if let (Some(first), Some(last)) = (report.first_date, report.last_date) {
            summary.push_str(&format!("Date Range: {} to {}\n", first, last));
        }
        summary.push_str(&format!("Months Processed: {}\n", report.processed_months));
        summary.push_str(&format!("Months Skipped: {}\n", report.skipped_months.len()));
        for skipped in &report.skipped_months {
            summary.push_str(&format!("  {}: {}\n", skipped.period, skipped.reason));
        }

        summary.push_str(&format!("ZIP Codes With Data: {}\n", report.zip_statistics.len()));
        if !report.unmatched_zip_codes.is_empty() {
            summary.push_str(&format!(
                "ZIP Codes Without Grid Points: {} ({})\n",
                report.unmatched_zip_codes.len(),
                report.unmatched_zip_codes.join(", ")
            ));
        }

        let overall = report
            .zip_statistics
            .values()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (
                    s.min_tmax_f.map_or(lo, |t| lo.min(t)),
                    s.max_tmax_f.map_or(hi, |t| hi.max(t)),
                )
            });
        if overall.0.is_finite() && overall.1.is_finite() {
            summary.push_str(&format!(
                "Daily Tmax Range: {:.1}°F to {:.1}°F\n",
                overall.0, overall.1
            ));
        }

        summary.push_str(&format!(
            "\nImplausible Values (outside {}°F to {}°F): {}\n",
            MIN_PLAUSIBLE_TMAX_F,
            MAX_PLAUSIBLE_TMAX_F,
            report.temperature_violations.len()
        ));
        if !report.temperature_violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.temperature_violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. ZIP {} on {}: {:.1}°F\n",
                    i + 1,
                    violation.zip_code,
                    violation.date,
                    violation.tmax_f
                ));
            }
        }

        summary
    }

    pub fn write_json(&self, report: &CoverageReport, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, report)?;
        Ok(())
    }
}

impl Default for CoverageChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyZipRecord, MonthPeriod};
    use tempfile::TempDir;

    fn record(day: u32, zip: &str, tmax_f: f64) -> DailyZipRecord {
        DailyZipRecord::new(
            NaiveDate::from_ymd_opt(2020, 7, day).unwrap(),
            zip.to_string(),
            tmax_f,
            1,
        )
    }

    fn outcome() -> RunOutcome {
        RunOutcome {
            records: vec![
                record(1, "85001", 100.0),
                record(1, "85002", 104.0),
                record(2, "85001", 110.0),
                record(2, "85002", 150.0),
            ],
            processed: vec![MonthPeriod::new(2020, 7).unwrap()],
            skipped: vec![SkippedMonth {
                period: MonthPeriod::new(2020, 8).unwrap(),
                reason: "HTTP 404".to_string(),
            }],
            unmatched_zip_codes: vec!["85003".to_string()],
        }
    }

    #[test]
    fn test_zip_statistics() {
        let report = CoverageChecker::new().check(&outcome());

        assert_eq!(report.total_records, 4);
        assert_eq!(report.first_date, NaiveDate::from_ymd_opt(2020, 7, 1));
        assert_eq!(report.last_date, NaiveDate::from_ymd_opt(2020, 7, 2));

        let stats = &report.zip_statistics["85001"];
        assert_eq!(stats.days, 2);
        assert_eq!(stats.min_tmax_f, Some(100.0));
        assert_eq!(stats.max_tmax_f, Some(110.0));
        assert_eq!(stats.mean_tmax_f, Some(105.0));
    }

    #[test]
    fn test_implausible_values_are_reported() {
        let report = CoverageChecker::new().check(&outcome());

        assert_eq!(report.temperature_violations.len(), 1);
        assert_eq!(report.temperature_violations[0].zip_code, "85002");
    }

    #[test]
    fn test_summary_mentions_skips_and_unmatched() {
        let checker = CoverageChecker::new();
        let summary = checker.generate_summary(&checker.check(&outcome()));

        assert!(summary.contains("Total Records: 4"));
        assert!(summary.contains("Date Range: 2020-07-01 to 2020-07-02"));
        assert!(summary.contains("2020/08: HTTP 404"));
        assert!(summary.contains("85003"));
    }

    #[test]
    fn test_empty_run() {
        let checker = CoverageChecker::new();
        let report = checker.check(&RunOutcome::default());

        assert_eq!(report.total_records, 0);
        assert!(report.first_date.is_none());
        assert!(checker.generate_summary(&report).contains("Total Records: 0"));
    }

    #[test]
    fn test_write_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reports").join("summary.json");
        let checker = CoverageChecker::new();

        checker.write_json(&checker.check(&outcome()), &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total_records"], 4);
        assert_eq!(json["zip_statistics"]["85001"]["days"], 2);
        assert_eq!(json["skipped_months"][0]["period"]["month"], 8);
    }
}
