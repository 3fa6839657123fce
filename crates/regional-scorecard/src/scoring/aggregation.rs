use super::activity::ActivityKey;
use super::coefficients::{CoefficientMap, EffectiveCoefficients};
use super::region::{RegionCatalog, RegionCategory};
use super::scorers::{ActivityScoreSet, ScoreComponent};
use super::{ScoringError, POINTS_PER_COEFFICIENT};
use serde::Serialize;
use std::cmp::Ordering;

const BOUNDS_TOLERANCE: f64 = 1e-6;

/// Weight an activity carried in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityWeight {
    pub activity: ActivityKey,
    pub declared_coefficient: f64,
    pub effective_coefficient: f64,
    pub weight_pct: f64,
    pub max_score: f64,
    pub available: bool,
}

/// One activity's share of a region's final score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityContribution {
    pub activity: ActivityKey,
    pub raw: f64,
    pub max_score: f64,
    pub normalized: f64,
    pub weight_pct: f64,
    pub contribution: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ScoreComponent>,
}

/// Final standing of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionResult {
    pub rank: usize,
    pub region: String,
    pub category: RegionCategory,
    pub category_label: &'static str,
    pub category_coefficient: f64,
    pub population: u64,
    pub final_score: f64,
    pub activities: Vec<ActivityContribution>,
}

impl RegionResult {
    pub fn contribution(&self, activity: &ActivityKey) -> Option<&ActivityContribution> {
        self.activities
            .iter()
            .find(|entry| entry.activity == *activity)
    }
}

/// Folds raw activity scores into weighted 0-100 region scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    /// Weight table covering every declared activity, available or not.
    pub fn weights(
        &self,
        declared: &CoefficientMap,
        effective: &EffectiveCoefficients,
    ) -> Vec<ActivityWeight> {
        declared
            .iter()
            .map(|(activity, declared_coefficient)| {
                let effective_coefficient = effective.get(activity);
                ActivityWeight {
                    activity: activity.clone(),
                    declared_coefficient,
                    effective_coefficient: effective_coefficient.unwrap_or(0.0),
                    weight_pct: effective.weight_pct(activity).unwrap_or(0.0),
                    max_score: effective_coefficient.unwrap_or(0.0) * POINTS_PER_COEFFICIENT,
                    available: effective_coefficient.is_some(),
                }
            })
            .collect()
    }

    /// Scores and ranks every region of the catalog. Results are sorted by
    /// final score descending, ties broken by region name.
    pub fn aggregate(
        &self,
        regions: &RegionCatalog,
        effective: &EffectiveCoefficients,
        score_sets: &[ActivityScoreSet],
    ) -> Result<Vec<RegionResult>, ScoringError> {
        let mut results = Vec::with_capacity(regions.len());

        for profile in regions.iter() {
            let activities: Vec<ActivityContribution> = effective
                .activities()
                .map(|activity| {
                    let max_score = effective.max_score(activity).unwrap_or(0.0);
                    let weight_pct = effective.weight_pct(activity).unwrap_or(0.0);
                    let score = score_sets
                        .iter()
                        .find(|set| set.activity == *activity)
                        .and_then(|set| set.get(&profile.name))
                        .map(|score| (score.raw, score.components.clone()));
                    contribution(activity, score, max_score, weight_pct)
                })
                .collect();

            let total: f64 = activities.iter().map(|entry| entry.contribution).sum();
            if !(-BOUNDS_TOLERANCE..=100.0 + BOUNDS_TOLERANCE).contains(&total) || total.is_nan() {
                return Err(ScoringError::ScoreOutOfBounds {
                    region: profile.name.clone(),
                    score: total,
                });
            }

            results.push(RegionResult {
                rank: 0,
                region: profile.name.clone(),
                category: profile.category,
                category_label: profile.category.label(),
                category_coefficient: profile.coefficient,
                population: profile.population,
                final_score: total.clamp(0.0, 100.0),
                activities,
            });
        }

        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.region.cmp(&b.region))
        });
        for (index, result) in results.iter_mut().enumerate() {
            result.rank = index + 1;
        }

        Ok(results)
    }
}

fn contribution(
    activity: &ActivityKey,
    score: Option<(f64, Vec<ScoreComponent>)>,
    max_score: f64,
    weight_pct: f64,
) -> ActivityContribution {
    let (raw, components) = score.unwrap_or((0.0, Vec::new()));
    let normalized = if max_score > 0.0 {
        (raw / max_score).min(1.0)
    } else {
        0.0
    };

    ActivityContribution {
        activity: activity.clone(),
        raw,
        max_score,
        normalized,
        weight_pct,
        contribution: normalized * weight_pct,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::activity::PopulationTable;
    use crate::scoring::coefficients::redistribute;
    use crate::scoring::scorers::ActivityScore;
    use std::collections::BTreeSet;

    fn score_set(activity: ActivityKey, max: f64, scores: &[(&str, f64)]) -> ActivityScoreSet {
        let mut set = ActivityScoreSet::new(activity, max);
        for (region, raw) in scores {
            set.insert(ActivityScore {
                region: region.to_string(),
                raw: *raw,
                components: Vec::new(),
            });
        }
        set
    }

    fn all_builtins() -> BTreeSet<ActivityKey> {
        ActivityKey::builtins().into_iter().collect()
    }

    #[test]
    fn half_of_every_maximum_scores_fifty() {
        let declared = CoefficientMap::defaults();
        let effective = redistribute(&declared, &all_builtins()).expect("effective");
        let regions = RegionCatalog::build(["ANKARA"], &PopulationTable::default());
        let sets = vec![
            score_set(ActivityKey::membership(), 40.0, &[("ANKARA", 20.0)]),
            score_set(ActivityKey::council(), 30.0, &[("ANKARA", 15.0)]),
            score_set(ActivityKey::seasonal(), 20.0, &[("ANKARA", 10.0)]),
            score_set(ActivityKey::symbol(), 10.0, &[("ANKARA", 5.0)]),
        ];

        let results = AggregationEngine
            .aggregate(&regions, &effective, &sets)
            .expect("aggregates");
        assert!((results[0].final_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn missing_region_row_contributes_zero() {
        let declared = CoefficientMap::defaults();
        let effective = redistribute(&declared, &all_builtins()).expect("effective");
        let regions = RegionCatalog::build(["ANKARA", "KONYA"], &PopulationTable::default());
        let sets = vec![
            score_set(ActivityKey::membership(), 40.0, &[("ANKARA", 40.0), ("KONYA", 40.0)]),
            score_set(ActivityKey::council(), 30.0, &[("ANKARA", 30.0)]),
            score_set(ActivityKey::seasonal(), 20.0, &[("ANKARA", 20.0), ("KONYA", 20.0)]),
            score_set(ActivityKey::symbol(), 10.0, &[("ANKARA", 10.0), ("KONYA", 10.0)]),
        ];

        let results = AggregationEngine
            .aggregate(&regions, &effective, &sets)
            .expect("aggregates");
        assert_eq!(results[0].region, "ANKARA");
        assert!((results[0].final_score - 100.0).abs() < 1e-9);
        assert!((results[1].final_score - 70.0).abs() < 1e-9);
        let council = results[1]
            .contribution(&ActivityKey::council())
            .expect("council contribution");
        assert_eq!(council.raw, 0.0);
    }

    #[test]
    fn ties_are_ranked_by_name() {
        let declared: CoefficientMap = [(ActivityKey::symbol(), 1.0)].into_iter().collect();
        let available: BTreeSet<ActivityKey> = [ActivityKey::symbol()].into_iter().collect();
        let effective = redistribute(&declared, &available).expect("effective");
        let regions = RegionCatalog::build(["SİNOP", "ADANA"], &PopulationTable::default());
        let sets = vec![score_set(
            ActivityKey::symbol(),
            10.0,
            &[("SİNOP", 5.0), ("ADANA", 5.0)],
        )];

        let results = AggregationEngine
            .aggregate(&regions, &effective, &sets)
            .expect("aggregates");
        assert_eq!(results[0].region, "ADANA");
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
    }

    #[test]
    fn weights_list_unavailable_activities() {
        let declared = CoefficientMap::defaults();
        let available: BTreeSet<ActivityKey> =
            [ActivityKey::membership(), ActivityKey::council()].into_iter().collect();
        let effective = redistribute(&declared, &available).expect("effective");
        let weights = AggregationEngine.weights(&declared, &effective);

        assert_eq!(weights.len(), 4);
        let symbol = weights
            .iter()
            .find(|weight| weight.activity == ActivityKey::symbol())
            .expect("symbol weight");
        assert!(!symbol.available);
        assert_eq!(symbol.weight_pct, 0.0);
        let total: f64 = weights.iter().map(|weight| weight.weight_pct).sum();
        assert!((total - 100.0).abs() < 1e-6);
    }
}
