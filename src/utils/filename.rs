use std::path::{Path, PathBuf};

use crate::models::MonthPeriod;

/// Output path inside `output_dir`
pub fn output_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(file_name)
}

/// Scratch file name for a downloaded month, e.g. `ncdd-202001.nc`
pub fn scratch_file_name(period: &MonthPeriod) -> String {
    format!("ncdd-{}{:02}.nc", period.year, period.month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("data"), "az_tmax_data.csv");
        assert_eq!(path, PathBuf::from("data/az_tmax_data.csv"));
    }

    #[test]
    fn test_scratch_file_name() {
        let period = MonthPeriod::new(2020, 1).unwrap();
        assert_eq!(scratch_file_name(&period), "ncdd-202001.nc");
    }
}
