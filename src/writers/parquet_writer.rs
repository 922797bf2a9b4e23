use crate::error::{ProcessingError, Result};
use crate::models::OutputRow;
use crate::utils::constants::{
    COLUMN_DATE, COLUMN_ID, COLUMN_TMAX_F, COLUMN_ZIP_CODE, COMPRESSION_GZIP, COMPRESSION_LZ4,
    COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD, DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// `NaiveDate::num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write numbered rows; an empty slice still produces a file with the schema
    pub fn write_rows(&self, rows: &[OutputRow], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for chunk in rows.chunks(self.row_group_size.max(1)) {
            let batch = self.rows_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(COLUMN_ID, DataType::UInt64, false),
            Field::new(COLUMN_DATE, DataType::Date32, false),
            Field::new(COLUMN_ZIP_CODE, DataType::Utf8, false),
            Field::new(COLUMN_TMAX_F, DataType::Float64, false),
        ]))
    }

    fn rows_to_batch(&self, rows: &[OutputRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        let dates: Vec<i32> = rows
            .iter()
            .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();
        let zip_codes: Vec<&str> = rows.iter().map(|r| r.zip_code.as_str()).collect();
        let temps: Vec<f64> = rows.iter().map(|r| r.daily_tmax_deg_f).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt64Array::from(ids)),
                Arc::new(Date32Array::from(dates)),
                Arc::new(StringArray::from(zip_codes)),
                Arc::new(Float64Array::from(temps)),
            ],
        )?;

        Ok(batch)
    }

    /// Read back up to `limit` rows
    pub fn read_rows(&self, path: &Path, limit: usize) -> Result<Vec<OutputRow>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            let ids = column::<UInt64Array>(&batch, 0, COLUMN_ID)?;
            let dates = column::<Date32Array>(&batch, 1, COLUMN_DATE)?;
            let zip_codes = column::<StringArray>(&batch, 2, COLUMN_ZIP_CODE)?;
            let temps = column::<Float64Array>(&batch, 3, COLUMN_TMAX_F)?;

            for i in 0..batch.num_rows() {
                if rows.len() >= limit {
                    return Ok(rows);
                }
                let days = dates.value(i) + UNIX_EPOCH_DAYS_FROM_CE;
                let date = NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!("Date32 value {} out of range", dates.value(i)))
                })?;
                rows.push(OutputRow {
                    id: ids.value(i),
                    date,
                    zip_code: zip_codes.value(i).to_string(),
                    daily_tmax_deg_f: temps.value(i),
                });
            }
        }

        Ok(rows)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size: std::fs::metadata(path)?.len(),
            compression: self.compression,
        })
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, index: usize, name: &str) -> Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
        )
    }
}
