use super::normalize::Extrema;
use super::tiers::{tier_fraction, Tiers};
use super::{
    per_population, require_columns, ActivityScore, ActivityScoreSet, ActivityScorer,
    ScoreComponent, ScoringContext,
};
use crate::scoring::activity::{try_parse_number, ActivityKey, ActivityRow, ActivityTable};
use crate::scoring::DataUnavailable;

pub const REACHED_COLUMN: &str = "TOPLAM ULAŞILAN KİŞİ";

pub const OUTREACH_TYPE_COLUMNS: [&str; 9] = [
    "GÖNÜL SOFRASI",
    "SAHUR PROGRAMI",
    "İFTAR PROGRAMI",
    "ÇAT KAPI ZİYARET",
    "YARDIM DAĞITIMI",
    "ŞEHİT GAZİ AİLELERİ, STK, ESNAF, KIRAATHANE, YAŞLI, HASTA, ENGELLİ ZİYARETLERİ",
    "CAMİ ÇALIŞMALARI",
    "MAHALLE / KÖY, TAZİYE, MEZARLIK ZİYARETLERİ",
    "ÜYE ARAMA VE MESAJ ÇALIŞMALARI",
];

const REACH_SHARE: f64 = 15.0 / 20.0;
const DIVERSITY_SHARE: f64 = 5.0 / 20.0;

const DIVERSITY_TIERS: Tiers = &[
    (8.0, 1.0),
    (6.0, 0.8),
    (4.0, 0.6),
    (2.0, 0.4),
    (1.0, 0.2),
];

/// Seasonal outreach: people reached relative to population plus the variety
/// of outreach types organized.
#[derive(Debug, Clone)]
pub struct SeasonalScorer {
    key: ActivityKey,
}

impl Default for SeasonalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SeasonalScorer {
    pub fn new() -> Self {
        Self {
            key: ActivityKey::seasonal(),
        }
    }
}

impl ActivityScorer for SeasonalScorer {
    fn key(&self) -> &ActivityKey {
        &self.key
    }

    fn check_table(&self, table: &ActivityTable) -> Result<(), DataUnavailable> {
        require_columns(table, &[REACHED_COLUMN])
    }

    fn score_table(&self, table: &ActivityTable, ctx: &ScoringContext<'_>) -> ActivityScoreSet {
        let rows = table.first_rows();
        let reach: Vec<f64> = rows
            .iter()
            .map(|row| {
                per_population(
                    row.number(REACHED_COLUMN),
                    ctx.population.population_of(&row.region),
                    100.0,
                )
            })
            .collect();

        let mut scores = ActivityScoreSet::new(self.key.clone(), ctx.max_score);
        let Some(extrema) = Extrema::of(reach.iter().copied()) else {
            return scores;
        };

        let type_columns: Vec<&str> = OUTREACH_TYPE_COLUMNS
            .into_iter()
            .filter(|column| table.has_column(column))
            .collect();

        for (row, ratio) in rows.into_iter().zip(reach) {
            let normalized = extrema.normalize(ratio);
            let types = outreach_types(row, &type_columns);
            let reach_points = normalized * REACH_SHARE * ctx.max_score;
            let diversity_points =
                tier_fraction(types as f64, DIVERSITY_TIERS) * DIVERSITY_SHARE * ctx.max_score;

            scores.insert(ActivityScore::from_components(
                row.region.clone(),
                vec![
                    ScoreComponent::new(
                        "reach",
                        reach_points,
                        format!("{ratio:.2}% of residents reached, normalized {normalized:.3}"),
                    ),
                    ScoreComponent::new(
                        "diversity",
                        diversity_points,
                        format!("{types} outreach type(s)"),
                    ),
                ],
                ctx.max_score,
            ));
        }

        scores
    }
}

/// A type counts when its cell holds anything other than blank or a numeric zero.
fn outreach_types(row: &ActivityRow, columns: &[&str]) -> usize {
    columns
        .iter()
        .filter(|column| {
            let cell = row.cell(column).unwrap_or_default().trim();
            !cell.is_empty() && try_parse_number(cell) != Some(0.0)
        })
        .count()
}
