pub mod coverage_checker;
pub mod daily_aggregator;
pub mod pipeline;
pub mod spatial_join;

pub use coverage_checker::{CoverageChecker, CoverageReport, TemperatureViolation, ZipStatistics};
pub use daily_aggregator::DailyAggregator;
pub use pipeline::{Pipeline, RunOutcome, SkippedMonth};
pub use spatial_join::JoinIndex;
