pub mod export;
mod statistics;
mod summary;
pub mod views;

pub use export::{ExportError, ReportExporter};
pub use summary::ScoringReport;
