use super::normalize::Extrema;
use super::{
    per_population, require_columns, ActivityScore, ActivityScoreSet, ActivityScorer,
    ScoreComponent, ScoringContext,
};
use crate::scoring::activity::{ActivityKey, ActivityRow, ActivityTable};
use crate::scoring::DataUnavailable;
use crate::text::turkish_uppercase;

pub const COUNT_COLUMN: &str = "BAYRAK ADEDİ";
pub const ENGAGEMENT_COLUMN: &str = "YAPILAN ÇALIŞMA";

const DISTRIBUTION_SHARE: f64 = 8.0 / 10.0;
const ENGAGEMENT_SHARE: f64 = 2.0 / 10.0;

/// Symbol (flag) distribution per 1000 residents plus the kind of engagement
/// that accompanied it.
#[derive(Debug, Clone)]
pub struct SymbolScorer {
    key: ActivityKey,
}

impl Default for SymbolScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolScorer {
    pub fn new() -> Self {
        Self {
            key: ActivityKey::symbol(),
        }
    }
}

impl ActivityScorer for SymbolScorer {
    fn key(&self) -> &ActivityKey {
        &self.key
    }

    fn check_table(&self, table: &ActivityTable) -> Result<(), DataUnavailable> {
        require_columns(table, &[COUNT_COLUMN])
    }

    fn score_table(&self, table: &ActivityTable, ctx: &ScoringContext<'_>) -> ActivityScoreSet {
        let rows = table.first_rows();
        let per_thousand: Vec<f64> = rows
            .iter()
            .map(|row| {
                per_population(
                    row.number(COUNT_COLUMN),
                    ctx.population.population_of(&row.region),
                    1000.0,
                )
            })
            .collect();

        let mut scores = ActivityScoreSet::new(self.key.clone(), ctx.max_score);
        let Some(extrema) = Extrema::of(per_thousand.iter().copied()) else {
            return scores;
        };

        for (row, ratio) in rows.into_iter().zip(per_thousand) {
            let normalized = extrema.normalize(ratio);
            let engagement = engagement_fraction(row);

            scores.insert(ActivityScore::from_components(
                row.region.clone(),
                vec![
                    ScoreComponent::new(
                        "distribution",
                        normalized * DISTRIBUTION_SHARE * ctx.max_score,
                        format!("{ratio:.3} per 1000 residents, normalized {normalized:.3}"),
                    ),
                    ScoreComponent::new(
                        "engagement",
                        engagement * ENGAGEMENT_SHARE * ctx.max_score,
                        row.cell(ENGAGEMENT_COLUMN)
                            .map(str::trim)
                            .filter(|value| !value.is_empty())
                            .unwrap_or("no engagement recorded"),
                    ),
                ],
                ctx.max_score,
            ));
        }

        scores
    }
}

/// Interactive meetings earn the full engagement share, announcements half.
fn engagement_fraction(row: &ActivityRow) -> f64 {
    let kind = row
        .cell(ENGAGEMENT_COLUMN)
        .map(|value| turkish_uppercase(value.trim()))
        .unwrap_or_default();
    match kind.as_str() {
        "TOPLANTI" => 1.0,
        "DUYURU" => 0.5,
        _ => 0.0,
    }
}
