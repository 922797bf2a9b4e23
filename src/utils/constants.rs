/// Default remote location of the nClimGrid-Daily monthly grids
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.ncei.noaa.gov/data/nclimgrid-daily/access/grids/{year}/ncdd-{year}{month}-grd-scaled.nc";

/// URL template placeholders
pub const YEAR_PLACEHOLDER: &str = "{year}";
pub const MONTH_PLACEHOLDER: &str = "{month}";

/// NetCDF names
pub const LAT_VARIABLE: &str = "lat";
pub const LON_VARIABLE: &str = "lon";
pub const TIME_DIMENSION: &str = "time";
pub const DEFAULT_VARIABLE: &str = "tmax";

/// Boundary attribute defaults
pub const DEFAULT_STATE: &str = "AZ";
pub const DEFAULT_STATE_FIELD: &str = "STATE";
pub const DEFAULT_ZIP_FIELD: &str = "ZIP_CODE";
pub const ZIP_CODE_WIDTH: usize = 5;

/// Run range defaults
pub const DEFAULT_YEAR_START: i32 = 2020;
pub const DEFAULT_YEAR_STOP: i32 = 2024;
pub const DEFAULT_MONTH_STOP_FINAL: u32 = 5;

/// Join tolerance in degrees, roughly two miles of latitude
pub const DEFAULT_JOIN_DISTANCE: f64 = 0.03;

/// Output defaults
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_OUTPUT_FILE: &str = "az_tmax_data.csv";
pub const DEFAULT_DELIMITER: char = ',';
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Output column names
pub const COLUMN_ID: &str = "ID";
pub const COLUMN_DATE: &str = "date";
pub const COLUMN_ZIP_CODE: &str = "zip_code";
pub const COLUMN_TMAX_F: &str = "daily_Tmax_degF";

/// Fetch defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_SECS: u64 = 5;

/// Plausible daily maximum range, Fahrenheit
pub const MIN_PLAUSIBLE_TMAX_F: f64 = -80.0;
pub const MAX_PLAUSIBLE_TMAX_F: f64 = 140.0;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "NCLIMGRID";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
