pub mod measurement_queries;
pub mod rows;

pub use rows::RowMappingError;
