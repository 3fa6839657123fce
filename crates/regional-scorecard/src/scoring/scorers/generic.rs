use super::normalize::Extrema;
use super::{
    per_population, require_columns, ActivityScore, ActivityScoreSet, ActivityScorer,
    ScoreComponent, ScoringContext,
};
use crate::scoring::activity::{ActivityKey, ActivityTable};
use crate::scoring::DataUnavailable;
use serde::Serialize;

/// Scoring policy of a descriptor-driven activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenericPolicy {
    /// Column holding the scored value. `None` scores the table's first data column.
    pub key_column: Option<String>,
    pub population_normalization: bool,
    pub category_coefficient: bool,
}

/// Min-max scorer over a single numeric column, configured by a [`GenericPolicy`].
#[derive(Debug, Clone)]
pub struct GenericScorer {
    key: ActivityKey,
    policy: GenericPolicy,
}

impl GenericScorer {
    pub fn new(key: ActivityKey, policy: GenericPolicy) -> Self {
        Self { key, policy }
    }

    pub fn policy(&self) -> &GenericPolicy {
        &self.policy
    }

    fn value_column<'t>(&'t self, table: &'t ActivityTable) -> Option<&'t str> {
        self.policy
            .key_column
            .as_deref()
            .or_else(|| table.first_data_column())
    }
}

impl ActivityScorer for GenericScorer {
    fn key(&self) -> &ActivityKey {
        &self.key
    }

    fn check_table(&self, table: &ActivityTable) -> Result<(), DataUnavailable> {
        if table.is_empty() {
            return Err(DataUnavailable::EmptyTable);
        }
        match self.value_column(table) {
            Some(column) => require_columns(table, &[column]),
            None => Err(DataUnavailable::MissingColumn("<first data column>".to_string())),
        }
    }

    fn score_table(&self, table: &ActivityTable, ctx: &ScoringContext<'_>) -> ActivityScoreSet {
        let mut scores = ActivityScoreSet::new(self.key.clone(), ctx.max_score);
        let Some(column) = self.value_column(table) else {
            return scores;
        };

        let rows = table.first_rows();
        let values: Vec<f64> = rows
            .iter()
            .map(|row| {
                let value = row.number(column);
                if self.policy.population_normalization {
                    per_population(value, ctx.population.population_of(&row.region), 1000.0)
                } else {
                    value
                }
            })
            .collect();

        let Some(extrema) = Extrema::of(values.iter().copied()) else {
            return scores;
        };

        for (row, value) in rows.into_iter().zip(values) {
            let normalized = extrema.normalize(value);
            let base = normalized * ctx.max_score;
            let coefficient = ctx.regions.coefficient(&row.region);
            let adjusted = if self.policy.category_coefficient && coefficient > 1.0 {
                (base * coefficient).min(ctx.max_score)
            } else {
                base
            };

            let mut components = vec![ScoreComponent::new(
                "value",
                base,
                format!("{column} = {value:.3}, normalized {normalized:.3}"),
            )];
            if adjusted > base {
                components.push(ScoreComponent::new(
                    "category_adjustment",
                    adjusted - base,
                    format!("category coefficient {coefficient:.2}"),
                ));
            }

            scores.insert(ActivityScore::from_components(
                row.region.clone(),
                components,
                ctx.max_score,
            ));
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{score, table};
    use super::*;
    use crate::scoring::activity::PopulationTable;

    fn scorer(policy: GenericPolicy) -> GenericScorer {
        GenericScorer::new(ActivityKey::new("youth_events"), policy)
    }

    fn policy(column: &str, population: bool, category: bool) -> GenericPolicy {
        GenericPolicy {
            key_column: Some(column.to_string()),
            population_normalization: population,
            category_coefficient: category,
        }
    }

    #[test]
    fn plain_policy_is_min_max_scaled() {
        let data = table(
            &["İL", "EVENTS"],
            &[&["ANKARA", "10"], &["KONYA", "20"], &["SİVAS", "30"]],
        );
        let set = score(
            &scorer(policy("EVENTS", false, false)),
            &data,
            &PopulationTable::default(),
            10.0,
        );
        assert_eq!(set.get("ANKARA").expect("scored").raw, 0.0);
        assert!((set.get("KONYA").expect("scored").raw - 5.0).abs() < 1e-9);
        assert!((set.get("SİVAS").expect("scored").raw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn identical_values_all_score_max() {
        let data = table(&["İL", "EVENTS"], &[&["ANKARA", "7"], &["KONYA", "7"]]);
        let set = score(
            &scorer(policy("EVENTS", false, false)),
            &data,
            &PopulationTable::default(),
            10.0,
        );
        assert!(set.iter().all(|entry| (entry.raw - 10.0).abs() < 1e-9));
    }

    #[test]
    fn population_normalization_uses_per_thousand_ratio() {
        let population: PopulationTable = [("ANKARA", 5_000_000u64), ("KİLİS", 100_000)]
            .into_iter()
            .collect();
        let data = table(&["İL", "EVENTS"], &[&["ANKARA", "500"], &["KİLİS", "50"]]);
        let set = score(&scorer(policy("EVENTS", true, false)), &data, &population, 10.0);
        // ANKARA 0.1 per 1000, KİLİS 0.5 per 1000.
        assert_eq!(set.get("ANKARA").expect("scored").raw, 0.0);
        assert!((set.get("KİLİS").expect("scored").raw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn category_coefficient_boosts_and_caps() {
        let population: PopulationTable = [("ANKARA", 5_000_000u64), ("KİLİS", 100_000), ("KONYA", 2_000_000)]
            .into_iter()
            .collect();
        let data = table(
            &["İL", "EVENTS"],
            &[&["ANKARA", "0"], &["KONYA", "5"], &["KİLİS", "10"]],
        );
        let set = score(&scorer(policy("EVENTS", false, true)), &data, &population, 10.0);
        assert!((set.get("KONYA").expect("scored").raw - 5.0 * 1.08).abs() < 1e-9);
        assert!((set.get("KİLİS").expect("scored").raw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn default_policy_uses_first_data_column() {
        let data = table(&["İL", "COUNT", "NOTES"], &[&["ANKARA", "1"], &["KONYA", "3"]]);
        let generic = scorer(GenericPolicy::default());
        assert_eq!(generic.check_table(&data), Ok(()));
        let set = score(&generic, &data, &PopulationTable::default(), 10.0);
        assert!((set.get("KONYA").expect("scored").raw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_key_column_is_unavailable() {
        let data = table(&["İL", "COUNT"], &[&["ANKARA", "1"]]);
        assert_eq!(
            scorer(policy("EVENTS", false, false)).check_table(&data),
            Err(DataUnavailable::MissingColumn("EVENTS".to_string()))
        );
    }

    #[test]
    fn non_numeric_values_read_as_zero() {
        let data = table(&["İL", "EVENTS"], &[&["ANKARA", "many"], &["KONYA", "4"]]);
        let set = score(
            &scorer(policy("EVENTS", false, false)),
            &data,
            &PopulationTable::default(),
            10.0,
        );
        assert_eq!(set.get("ANKARA").expect("scored").raw, 0.0);
        assert!((set.get("KONYA").expect("scored").raw - 10.0).abs() < 1e-9);
    }
}
