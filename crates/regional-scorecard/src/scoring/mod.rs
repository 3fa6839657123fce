pub mod activity;
pub mod aggregation;
pub mod coefficients;
pub mod engine;
pub mod extension;
pub mod region;
pub mod scorers;

pub use activity::{
    parse_number, try_parse_number, ActivityKey, ActivityRow, ActivityTable, PopulationTable,
    AGGREGATE_ROW, DEFAULT_POPULATION, REGION_COLUMN,
};
pub use aggregation::{ActivityContribution, ActivityWeight, AggregationEngine, RegionResult};
pub use coefficients::{redistribute, CoefficientMap, EffectiveCoefficients, Reallocation};
pub use engine::{BatchInput, ScoringConfig, ScoringEngine};
pub use extension::{
    ExtensionDescriptor, ExtensionRegistry, GenericPolicy, Registration, ValidationError,
    FALLBACK_COEFFICIENT,
};
pub use region::{RegionCatalog, RegionCategory, RegionProfile};
pub use scorers::{ActivityScore, ActivityScoreSet, ActivityScorer, ScoreComponent, ScoringContext};

use serde::Serialize;

/// Points available per unit of importance coefficient.
pub const POINTS_PER_COEFFICIENT: f64 = 10.0;

/// Why an activity could not take part in a run. Recoverable: the activity's
/// weight is redistributed instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DataUnavailable {
    #[error("no table was supplied")]
    MissingTable,
    #[error("table contains no region rows")]
    EmptyTable,
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("table could not be parsed: {0}")]
    ParseFailure(String),
}

/// Errors that abort a scoring run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("no activity data is available; nothing can be scored")]
    NoActivityData,
    #[error("final score {score:.6} for region '{region}' is outside 0-100")]
    ScoreOutOfBounds { region: String, score: f64 },
}

/// Availability of one declared activity within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityNote {
    pub activity: ActivityKey,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DataUnavailable>,
}
