use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use validator::Validate;

use crate::cli::args::{BoundaryArgs, Cli, Commands, JoinArgs, RangeArgs};
use crate::config::{OutputFormat, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::fetch::{render_url, HttpGridSource};
use crate::models::{number_rows, BoundarySet};
use crate::processors::{CoverageChecker, Pipeline};
use crate::readers::BoundaryReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, ParquetWriter};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            boundary,
            range,
            join,
            output_dir,
            output_file,
            format,
            compression,
            delimiter,
            on_error,
            max_attempts,
            timeout_secs,
            max_workers,
            summary_json,
        } => {
            boundary.apply(&mut config);
            range.apply(&mut config);
            join.apply(&mut config);
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(file) = output_file {
                config.output_file = file;
            }
            if let Some(format) = format {
                config.output_format = format;
            }
            if let Some(compression) = compression {
                config.compression = compression;
            }
            if let Some(delimiter) = delimiter {
                config.delimiter = delimiter;
            }
            if let Some(on_error) = on_error {
                config.on_error = on_error;
            }
            if let Some(attempts) = max_attempts {
                config.fetch.max_attempts = attempts;
            }
            if let Some(timeout) = timeout_secs {
                config.fetch.timeout_secs = timeout;
            }
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            config.validate()?;

            process(&config, summary_json.as_deref()).await?;
        }

        Commands::Boundaries { boundary, join } => {
            boundary.apply(&mut config);
            join.apply(&mut config);
            config.validate()?;

            let boundaries = load_boundaries(&config)?;
            print_boundaries(&boundaries, &config);
        }

        Commands::Urls { range } => {
            range.apply(&mut config);
            config.validate()?;

            for period in config.periods() {
                println!("{}", render_url(&config.fetch.url_template, &period));
            }
        }
    }

    Ok(())
}

async fn process(config: &PipelineConfig, summary_json: Option<&Path>) -> Result<()> {
    let boundaries = load_boundaries(config)?;
    print_boundaries(&boundaries, config);

    let periods = config.periods();
    let output = config.output_path();
    println!(
        "Processing {} months ({} to {})",
        periods.len(),
        periods.first().map(|p| p.to_string()).unwrap_or_default(),
        periods.last().map(|p| p.to_string()).unwrap_or_default()
    );
    println!("Output file: {}", output.display());

    let mut source = HttpGridSource::new(&config.fetch, &config.variable)?;
    if let Some(window) = boundaries.join_window(&config.join) {
        source = source.with_window(window);
    }

    let pipeline = Pipeline::new(source, boundaries, config.join, config.worker_count())?
        .with_error_policy(config.on_error);

    let progress = ProgressReporter::new(periods.len() as u64, "Processing months...", false);
    let outcome = pipeline.run(&periods, Some(&progress)).await?;
    progress.finish_with_message(&format!(
        "Processed {} months, {} records",
        outcome.processed.len(),
        outcome.records.len()
    ));

    let rows = number_rows(&outcome.records);
    match config.output_format {
        OutputFormat::Csv => {
            CsvWriter::new()
                .with_delimiter(config.delimiter_byte())
                .write_rows(&rows, &output)?;
        }
        OutputFormat::Parquet => {
            let writer = ParquetWriter::new().with_compression(&config.compression)?;
            writer.write_rows(&rows, &output)?;
            println!("\n{}", writer.get_file_info(&output)?.summary());
        }
    }
    info!(rows = rows.len(), path = %output.display(), "Output written");

    let checker = CoverageChecker::new();
    let report = checker.check(&outcome);
    println!("\n{}", checker.generate_summary(&report));

    if let Some(path) = summary_json {
        checker.write_json(&report, path)?;
        println!("Coverage report written to {}", path.display());
    }

    println!("Processing complete!");
    Ok(())
}

fn load_boundaries(config: &PipelineConfig) -> Result<BoundarySet> {
    let path = config.boundary_path()?;
    let progress = ProgressReporter::new_spinner("Loading ZIP code boundaries...", false);
    let boundaries = BoundaryReader::from_config(config).read(path)?;
    progress.finish_with_message(&format!("Loaded {} boundary polygons", boundaries.len()));
    Ok(boundaries)
}

fn print_boundaries(boundaries: &BoundarySet, config: &PipelineConfig) {
    let summary = boundaries.summary();

    println!("Boundary polygons: {}", summary.polygons);
    println!("ZIP codes: {}", summary.zip_codes);
    println!("CRS: {}", summary.crs.as_deref().unwrap_or("unknown"));
    if let Some(bbox) = summary.bounding_box {
        println!(
            "Bounding box: lon {:.4}..{:.4}, lat {:.4}..{:.4}",
            bbox.min_lon, bbox.max_lon, bbox.min_lat, bbox.max_lat
        );
    }

    println!("Join distance: {}", config.join);
    if let Some(latitude) = boundaries.centroid_latitude() {
        println!("{}", config.join.ground_distance_at(latitude).summary());
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))
}

impl BoundaryArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(path) = &self.boundary {
            config.boundary_path = Some(path.clone());
        }
        if let Some(state) = &self.state {
            config.state = Some(state.clone());
        }
    }
}

impl RangeArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(year) = self.year_start {
            config.year_start = year;
        }
        if let Some(year) = self.year_stop {
            config.year_stop = year;
        }
        if let Some(month) = self.month_stop {
            config.month_stop_final = month;
        }
    }
}

impl JoinArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(distance) = self.distance {
            config.join.distance = distance;
        }
        if let Some(unit) = self.distance_unit {
            config.join.unit = unit;
        }
    }
}
