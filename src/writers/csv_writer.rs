use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::OutputRow;
use crate::utils::constants::{COLUMN_DATE, COLUMN_ID, COLUMN_TMAX_F, COLUMN_ZIP_CODE};

/// Writes `ID,date,zip_code,daily_Tmax_degF` tables
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write all rows to `path`, creating parent directories as needed
    pub fn write_rows(&self, rows: &[OutputRow], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        self.write_to(rows, file)?;

        info!(rows = rows.len(), path = %path.display(), "Wrote CSV output");
        Ok(())
    }

    pub fn write_to<W: Write>(&self, rows: &[OutputRow], sink: W) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(sink);

        // Written explicitly so an empty table still has its header
        writer.write_record([COLUMN_ID, COLUMN_DATE, COLUMN_ZIP_CODE, COLUMN_TMAX_F])?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn rows() -> Vec<OutputRow> {
        vec![
            OutputRow {
                id: 0,
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                zip_code: "85001".to_string(),
                daily_tmax_deg_f: 65.3,
            },
            OutputRow {
                id: 1,
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                zip_code: "85002".to_string(),
                daily_tmax_deg_f: 66.0,
            },
        ]
    }

    fn render(writer: &CsvWriter, rows: &[OutputRow]) -> String {
        let mut buffer = Vec::new();
        writer.write_to(rows, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_header_and_rows() {
        assert_eq!(
            render(&CsvWriter::new(), &rows()),
            "ID,date,zip_code,daily_Tmax_degF\n0,2020-01-01,85001,65.3\n1,2020-01-01,85002,66.0\n"
        );
    }

    #[test]
    fn test_empty_table_has_header() {
        assert_eq!(render(&CsvWriter::new(), &[]), "ID,date,zip_code,daily_Tmax_degF\n");
    }

    #[test]
    fn test_custom_delimiter() {
        let text = render(&CsvWriter::new().with_delimiter(b'\t'), &rows());
        assert!(text.starts_with("ID\tdate\tzip_code\tdaily_Tmax_degF\n0\t2020-01-01\t85001\t65.3\n"));
    }

    #[test]
    fn test_creates_output_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("az_tmax_data.csv");

        CsvWriter::new().write_rows(&rows(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let read: Vec<OutputRow> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(read, rows());
    }
}
