use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::ErrorPolicy;
use crate::error::{ProcessingError, Result};
use crate::fetch::GridSource;
use crate::models::{BoundarySet, DailyZipRecord, MonthPeriod, Tolerance};
use crate::processors::{DailyAggregator, JoinIndex};
use crate::utils::progress::ProgressReporter;

/// A month left out of the output under [`ErrorPolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedMonth {
    pub period: MonthPeriod,
    pub reason: String,
}

/// Everything a run accumulated, in output order
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub records: Vec<DailyZipRecord>,
    pub processed: Vec<MonthPeriod>,
    pub skipped: Vec<SkippedMonth>,
    /// ZIP codes with no joined grid point in the last grid geometry seen
    pub unmatched_zip_codes: Vec<String>,
}

/// Fetches, joins and averages months one after another
pub struct Pipeline<S: GridSource> {
    source: S,
    boundaries: BoundarySet,
    tolerance: Tolerance,
    on_error: ErrorPolicy,
    pool: rayon::ThreadPool,
}

impl<S: GridSource> Pipeline<S> {
    pub fn new(source: S, boundaries: BoundarySet, tolerance: Tolerance, max_workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        Ok(Self {
            source,
            boundaries,
            tolerance,
            on_error: ErrorPolicy::Abort,
            pool,
        })
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn boundaries(&self) -> &BoundarySet {
        &self.boundaries
    }

    /// Process `periods` in order.
    ///
    /// Records come out ordered by date, then ZIP code. Months are never
    /// processed concurrently.
    pub async fn run(&self, periods: &[MonthPeriod], progress: Option<&ProgressReporter>) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();
        let mut index: Option<JoinIndex> = None;

        for &period in periods {
            if let Some(p) = progress {
                p.set_message(&format!("Processing {}...", period));
            }

            let started = Instant::now();
            match self.process_month(period, &mut index).await {
                Ok(records) => {
                    info!(
                        records = records.len(),
                        "Processed {} in {:.2} minutes",
                        period,
                        started.elapsed().as_secs_f64() / 60.0
                    );
                    outcome.records.extend(records);
                    outcome.processed.push(period);
                }
                Err(e) => match self.on_error {
                    ErrorPolicy::Abort => {
                        return Err(ProcessingError::MonthFailed {
                            year: period.year,
                            month: period.month,
                            source: Box::new(e),
                        })
                    }
                    ErrorPolicy::Skip => {
                        warn!(%period, error = %e, "Skipping month");
                        outcome.skipped.push(SkippedMonth {
                            period,
                            reason: e.to_string(),
                        });
                    }
                },
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        if let Some(index) = index {
            outcome.unmatched_zip_codes = index.unmatched_zip_codes();
        }

        Ok(outcome)
    }

    async fn process_month(&self, period: MonthPeriod, index: &mut Option<JoinIndex>) -> Result<Vec<DailyZipRecord>> {
        let grid = self.source.fetch_month(period).await?;
        if grid.period != period {
            return Err(ProcessingError::InvalidFormat(format!(
                "Requested {} but received grid for {}",
                period, grid.period
            )));
        }

        let reusable = index
            .as_ref()
            .is_some_and(|idx| idx.matches_axes(grid.lats(), grid.lons()));
        if !reusable {
            *index = None;
        }
        let index = index.get_or_insert_with(|| {
            let started = Instant::now();
            let (boundaries, tolerance) = (&self.boundaries, self.tolerance);
            let built = self.pool.install(|| {
                JoinIndex::build(boundaries, grid.lats(), grid.lons(), tolerance)
            });
            info!(
                %period,
                grid_points = grid.points_per_day(),
                seconds = started.elapsed().as_secs_f64(),
                "Built spatial join for grid geometry"
            );
            built
        });

        if index.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No grid point for {} lies within {} of any ZIP code ({} x {} grid)",
                period,
                self.tolerance,
                grid.lats().len(),
                grid.lons().len()
            )));
        }

        DailyAggregator::new(index).aggregate_month(&grid)
    }
}
