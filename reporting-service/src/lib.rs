pub mod api;
pub mod assembler;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod metrics_server;
pub mod observability;
pub mod reports;
pub mod store;
pub mod submission;

pub use assembler::ReportService;
pub use error::ServiceError;
