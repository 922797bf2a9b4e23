pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;
pub mod units;

pub use constants::*;
pub use coordinates::{haversine_distance, GeoBoundingBox};
pub use filename::output_path;
pub use progress::ProgressReporter;
pub use units::{celsius_to_fahrenheit, fahrenheit_to_celsius};
