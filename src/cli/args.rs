use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ErrorPolicy, OutputFormat};
use crate::models::DistanceUnit;

#[derive(Parser)]
#[command(name = "nclimgrid-zip")]
#[command(about = "Daily nClimGrid maximum temperature averaged over ZIP code areas")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Configuration file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download grids, join them to ZIP codes and write the daily table
    Process {
        #[command(flatten)]
        boundary: BoundaryArgs,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        join: JoinArgs,

        #[arg(long, help = "Output directory [default: data]")]
        output_dir: Option<PathBuf>,

        #[arg(short, long, help = "Output file name [default: az_tmax_data.csv]")]
        output_file: Option<String>,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        #[arg(short, long, help = "Parquet compression (snappy, gzip, lz4, zstd, none)")]
        compression: Option<String>,

        #[arg(long, help = "CSV field delimiter")]
        delimiter: Option<char>,

        #[arg(long, value_enum, help = "What to do when a month cannot be processed")]
        on_error: Option<ErrorPolicy>,

        #[arg(long)]
        max_attempts: Option<u32>,

        #[arg(long)]
        timeout_secs: Option<u64>,

        #[arg(long, help = "Threads for the spatial join (0 = one per CPU)")]
        max_workers: Option<usize>,

        #[arg(long, help = "Also write the coverage report as JSON")]
        summary_json: Option<PathBuf>,
    },

    /// Load the boundary file and report what would be joined
    Boundaries {
        #[command(flatten)]
        boundary: BoundaryArgs,

        #[command(flatten)]
        join: JoinArgs,
    },

    /// Print the grid URL of every month in the range
    Urls {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct BoundaryArgs {
    #[arg(short, long, help = "ZIP code shapefile (.shp or .zip)")]
    pub boundary: Option<PathBuf>,

    #[arg(short, long, help = "Two-letter state code to keep [default: AZ]")]
    pub state: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct RangeArgs {
    #[arg(long)]
    pub year_start: Option<i32>,

    #[arg(long)]
    pub year_stop: Option<i32>,

    #[arg(long, help = "Last month of the final year")]
    pub month_stop: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub struct JoinArgs {
    #[arg(long, help = "Join distance [default: 0.03]")]
    pub distance: Option<f64>,

    #[arg(long, value_enum, help = "Unit of --distance [default: degrees]")]
    pub distance_unit: Option<DistanceUnit>,
}
