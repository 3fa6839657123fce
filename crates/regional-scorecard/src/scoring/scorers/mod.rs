//! Per-activity scoring rules.
//!
//! Every scorer works in two phases over the whole table: run-wide extrema are
//! gathered first, then each region is scored by a pure function of its own
//! row plus those extrema. Raw scores always fall within `[0, max_score]`.

mod council;
mod generic;
mod membership;
mod normalize;
mod seasonal;
mod symbol;
mod tiers;

pub use council::CouncilScorer;
pub use generic::{GenericPolicy, GenericScorer};
pub use membership::MembershipScorer;
pub use seasonal::SeasonalScorer;
pub use symbol::SymbolScorer;

use super::activity::{ActivityKey, ActivityTable, PopulationTable};
use super::region::RegionCatalog;
use super::DataUnavailable;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Run-wide inputs a scorer may consult.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub max_score: f64,
    pub regions: &'a RegionCatalog,
    pub population: &'a PopulationTable,
}

/// Scoring capability shared by the built-in and descriptor-driven scorers.
pub trait ActivityScorer: Send + Sync {
    fn key(&self) -> &ActivityKey;

    /// Decides whether `table` can be scored at all.
    fn check_table(&self, table: &ActivityTable) -> Result<(), DataUnavailable>;

    fn score_table(&self, table: &ActivityTable, ctx: &ScoringContext<'_>) -> ActivityScoreSet;
}

/// Named piece of a raw score, kept for audit trails and reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub label: &'static str,
    pub value: f64,
    pub notes: String,
}

impl ScoreComponent {
    pub(crate) fn new(label: &'static str, value: f64, notes: impl Into<String>) -> Self {
        Self {
            label,
            value,
            notes: notes.into(),
        }
    }
}

/// Raw score of one region for one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityScore {
    pub region: String,
    pub raw: f64,
    pub components: Vec<ScoreComponent>,
}

impl ActivityScore {
    /// Sums the components and clamps the total into `[0, max_score]`.
    pub(crate) fn from_components(
        region: impl Into<String>,
        components: Vec<ScoreComponent>,
        max_score: f64,
    ) -> Self {
        let total: f64 = components.iter().map(|component| component.value).sum();
        Self {
            region: region.into(),
            raw: total.clamp(0.0, max_score.max(0.0)),
            components,
        }
    }
}

/// All raw scores one activity produced in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityScoreSet {
    pub activity: ActivityKey,
    pub max_score: f64,
    scores: BTreeMap<String, ActivityScore>,
}

impl ActivityScoreSet {
    pub fn new(activity: ActivityKey, max_score: f64) -> Self {
        Self {
            activity,
            max_score,
            scores: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, score: ActivityScore) {
        self.scores.insert(score.region.clone(), score);
    }

    pub fn get(&self, region: &str) -> Option<&ActivityScore> {
        self.scores.get(region)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityScore> {
        self.scores.values()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// The dedicated scorers for the four built-in activities.
pub fn builtin_scorers() -> Vec<Arc<dyn ActivityScorer>> {
    vec![
        Arc::new(MembershipScorer::new()),
        Arc::new(CouncilScorer::new()),
        Arc::new(SeasonalScorer::new()),
        Arc::new(SymbolScorer::new()),
    ]
}

pub(crate) fn require_columns(
    table: &ActivityTable,
    columns: &[&str],
) -> Result<(), DataUnavailable> {
    if table.is_empty() {
        return Err(DataUnavailable::EmptyTable);
    }

    match columns.iter().find(|column| !table.has_column(column)) {
        Some(column) => Err(DataUnavailable::MissingColumn((*column).to_string())),
        None => Ok(()),
    }
}

/// Residents-relative ratio; a zero population yields 0 rather than a division error.
pub(crate) fn per_population(value: f64, population: u64, scale: f64) -> f64 {
    if population == 0 {
        0.0
    } else {
        value / population as f64 * scale
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::table;
    use super::*;

    #[test]
    fn require_columns_reports_first_missing_column() {
        let data = table(&["İL", "A"], &[&["ANKARA", "1"]]);
        assert_eq!(require_columns(&data, &["A"]), Ok(()));
        assert_eq!(
            require_columns(&data, &["A", "B"]),
            Err(DataUnavailable::MissingColumn("B".to_string()))
        );

        let empty = table(&["İL", "A"], &[]);
        assert_eq!(require_columns(&empty, &["A"]), Err(DataUnavailable::EmptyTable));
    }

    #[test]
    fn activity_score_clamps_to_max() {
        let score = ActivityScore::from_components(
            "ANKARA",
            vec![
                ScoreComponent::new("a", 30.0, ""),
                ScoreComponent::new("b", 15.0, ""),
            ],
            40.0,
        );
        assert_eq!(score.raw, 40.0);
    }

    #[test]
    fn per_population_guards_zero() {
        assert_eq!(per_population(10.0, 0, 100.0), 0.0);
        assert_eq!(per_population(50.0, 1000, 1000.0), 50.0);
    }

    #[test]
    fn builtins_cover_default_activities() {
        let keys: Vec<String> = builtin_scorers()
            .iter()
            .map(|scorer| scorer.key().to_string())
            .collect();
        assert_eq!(keys, vec!["membership", "council", "seasonal", "symbol"]);
    }
}
