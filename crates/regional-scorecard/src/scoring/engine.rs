use super::activity::{ActivityKey, ActivityTable, PopulationTable};
use super::aggregation::AggregationEngine;
use super::coefficients::redistribute;
use super::extension::{ExtensionRegistry, FALLBACK_COEFFICIENT};
use super::region::RegionCatalog;
use super::scorers::{ActivityScoreSet, ScoringContext};
use super::{AvailabilityNote, DataUnavailable, ScoringError};
use crate::report::ScoringReport;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Engine level knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Coefficient given to an activity table that arrives without a
    /// descriptor or declared coefficient.
    pub default_extension_coefficient: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_extension_coefficient: FALLBACK_COEFFICIENT,
        }
    }
}

/// Immutable snapshot of everything one run consumes.
#[derive(Debug, Clone, Default)]
pub struct BatchInput {
    pub tables: BTreeMap<ActivityKey, ActivityTable>,
    pub population: PopulationTable,
    /// Activities whose source could not be parsed, with the parser message.
    pub load_failures: BTreeMap<ActivityKey, String>,
    /// Sources ignored because an earlier source already supplied the activity.
    pub duplicates: BTreeMap<ActivityKey, Vec<String>>,
}

impl BatchInput {
    pub fn new(population: PopulationTable) -> Self {
        Self {
            population,
            ..Self::default()
        }
    }

    pub fn with_table(mut self, activity: ActivityKey, table: ActivityTable) -> Self {
        self.insert_table(activity, table);
        self
    }

    pub fn insert_table(&mut self, activity: ActivityKey, table: ActivityTable) {
        self.load_failures.remove(&activity);
        self.tables.insert(activity, table);
    }

    pub fn record_failure(&mut self, activity: ActivityKey, message: impl Into<String>) {
        if !self.tables.contains_key(&activity) {
            self.load_failures.insert(activity, message.into());
        }
    }

    /// True when a table or a load failure is already recorded for `activity`.
    pub fn has_source(&self, activity: &ActivityKey) -> bool {
        self.tables.contains_key(activity) || self.load_failures.contains_key(activity)
    }

    pub fn record_duplicate(&mut self, activity: ActivityKey, source: impl Into<String>) {
        self.duplicates.entry(activity).or_default().push(source.into());
    }

    fn activities(&self) -> impl Iterator<Item = &ActivityKey> {
        self.tables.keys().chain(self.load_failures.keys())
    }
}

/// Runs batches: availability, redistribution, scoring, aggregation.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
    registry: ExtensionRegistry,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, registry: ExtensionRegistry) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    /// Scores one batch. Nothing is carried over between runs: the registry
    /// is snapshotted and weights are redistributed from the declared values.
    pub fn run(&self, input: &BatchInput) -> Result<ScoringReport, ScoringError> {
        let mut registry = self.registry.clone();
        let mut warnings = Vec::new();

        for activity in input.activities() {
            if registry.contains(activity) {
                continue;
            }
            let coefficient = registry
                .declared()
                .get(activity)
                .unwrap_or(self.config.default_extension_coefficient);
            warn!(%activity, coefficient, "no descriptor registered, using the default policy");
            warnings.push(format!(
                "{activity}: no descriptor registered, scored with the default policy"
            ));
            registry.register_default(activity.clone(), coefficient);
        }

        for (activity, sources) in &input.duplicates {
            for source in sources {
                warnings.push(format!(
                    "{activity}: duplicate source '{source}' ignored, the first table is kept"
                ));
            }
        }

        warnings.extend(registry.registrations().iter().flat_map(|registration| {
            registration
                .problems
                .iter()
                .map(move |problem| format!("{}: {problem}", registration.activity))
        }));

        let declared = registry.declared();
        let availability = assess_availability(&registry, input);
        let available: BTreeSet<ActivityKey> = availability
            .iter()
            .filter(|note| note.available)
            .map(|note| note.activity.clone())
            .collect();

        for note in availability.iter().filter(|note| !note.available) {
            if let Some(reason) = &note.reason {
                warn!(activity = %note.activity, %reason, "activity unavailable, redistributing its weight");
            }
        }

        let effective = redistribute(declared, &available)?;
        for reallocation in effective.reallocations() {
            info!(
                activity = %reallocation.activity,
                declared = reallocation.declared,
                share = reallocation.share,
                effective = reallocation.effective,
                "coefficient resolved"
            );
        }

        let region_names: BTreeSet<&str> = effective
            .activities()
            .filter_map(|activity| input.tables.get(activity))
            .flat_map(ActivityTable::regions)
            .collect();
        let regions = RegionCatalog::build(region_names, &input.population);

        let jobs: Vec<_> = effective
            .activities()
            .filter_map(|activity| {
                let scorer = registry.scorer(activity)?;
                let table = input.tables.get(activity)?;
                let max_score = effective.max_score(activity)?;
                Some((scorer, table, max_score))
            })
            .collect();

        let score_sets: Vec<ActivityScoreSet> = jobs
            .par_iter()
            .map(|(scorer, table, max_score)| {
                let ctx = ScoringContext {
                    max_score: *max_score,
                    regions: &regions,
                    population: &input.population,
                };
                let set = scorer.score_table(table, &ctx);
                debug!(activity = %set.activity, regions = set.len(), "activity scored");
                set
            })
            .collect();

        let results = AggregationEngine.aggregate(&regions, &effective, &score_sets)?;
        let weights = AggregationEngine.weights(declared, &effective);

        info!(
            regions = results.len(),
            activities = effective.len(),
            "scoring run complete"
        );

        Ok(ScoringReport::new(
            results,
            weights,
            effective.reallocations().to_vec(),
            availability,
            warnings,
        ))
    }
}

fn assess_availability(registry: &ExtensionRegistry, input: &BatchInput) -> Vec<AvailabilityNote> {
    registry
        .declared()
        .keys()
        .map(|activity| {
            let reason = if let Some(message) = input.load_failures.get(activity) {
                Some(DataUnavailable::ParseFailure(message.clone()))
            } else {
                match (input.tables.get(activity), registry.scorer(activity)) {
                    (Some(table), Some(scorer)) => scorer.check_table(table).err(),
                    _ => Some(DataUnavailable::MissingTable),
                }
            };

            AvailabilityNote {
                activity: activity.clone(),
                available: reason.is_none(),
                reason,
            }
        })
        .collect()
}
