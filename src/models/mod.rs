pub mod boundary;
pub mod grid;
pub mod period;
pub mod record;
pub mod tolerance;

pub use boundary::{BoundarySet, BoundarySummary, ZipBoundary};
pub use grid::MonthGrid;
pub use period::MonthPeriod;
pub use record::{number_rows, DailyZipRecord, OutputRow};
pub use tolerance::{DistanceUnit, Tolerance, ToleranceReport};
