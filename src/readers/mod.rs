pub mod boundary_reader;
pub mod grid_reader;

pub use boundary_reader::BoundaryReader;
pub use grid_reader::{GridReader, ValueDecoding};
