//! Composite regional performance scoring.
//!
//! Regions are categorized by population, every available activity table is
//! scored by its scorer, weights of absent activities are redistributed across
//! the present ones, and the per-activity results are folded into a 0-100
//! composite score per region.

pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod scoring;
pub mod telemetry;

mod text;
