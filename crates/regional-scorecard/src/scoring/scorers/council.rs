use super::tiers::{tier_fraction, Tiers};
use super::{
    require_columns, ActivityScore, ActivityScoreSet, ActivityScorer, ScoreComponent,
    ScoringContext,
};
use crate::scoring::activity::{ActivityKey, ActivityRow, ActivityTable};
use crate::scoring::DataUnavailable;
use crate::text::turkish_uppercase;

pub const UNIT_COLUMN: &str = "İLÇE";
pub const MONTH_COLUMNS: [&str; 3] = ["HAZİRAN", "TEMMUZ", "AĞUSTOS"];

/// Unit value marking the provincial headquarters row.
const HEADQUARTERS_UNIT: &str = "İL";

const DONE: &str = "YAPILDI";
const PLANNED: &str = "PLANLANDI";
const PLANNED_CREDIT: f64 = 0.7;

const COMPLETION_LADDER: Tiers = &[
    (0.95, 1.0),
    (0.90, 0.9),
    (0.80, 0.8),
    (0.70, 0.7),
    (0.60, 0.6),
    (0.50, 0.5),
    (0.40, 0.4),
    (0.30, 0.3),
    (0.20, 0.2),
    (0.10, 0.1),
];

const BONUS_MIN_DISTRICT_RATIO: f64 = 0.5;
const BONUS_CAP_SHARE: f64 = 4.0 / 30.0;
const BONUS_RATE_SHARE: f64 = 16.0 / 30.0;

/// Advisory council meetings, split evenly between the headquarters and the
/// district units of each region.
#[derive(Debug, Clone)]
pub struct CouncilScorer {
    key: ActivityKey,
}

impl Default for CouncilScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CouncilScorer {
    pub fn new() -> Self {
        Self {
            key: ActivityKey::council(),
        }
    }
}

impl ActivityScorer for CouncilScorer {
    fn key(&self) -> &ActivityKey {
        &self.key
    }

    fn check_table(&self, table: &ActivityTable) -> Result<(), DataUnavailable> {
        let mut required = vec![UNIT_COLUMN];
        required.extend(MONTH_COLUMNS);
        require_columns(table, &required)
    }

    fn score_table(&self, table: &ActivityTable, ctx: &ScoringContext<'_>) -> ActivityScoreSet {
        let mut scores = ActivityScoreSet::new(self.key.clone(), ctx.max_score);
        for (region, rows) in table.grouped() {
            let coefficient = ctx.regions.coefficient(region);
            scores.insert(score_region(region, &rows, coefficient, ctx.max_score));
        }
        scores
    }
}

fn score_region(
    region: &str,
    rows: &[&ActivityRow],
    category_coefficient: f64,
    max_score: f64,
) -> ActivityScore {
    let half = max_score / 2.0;
    let (headquarters, districts): (Vec<&ActivityRow>, Vec<&ActivityRow>) =
        rows.iter().copied().partition(|row| is_headquarters(row));

    let headquarters_ratio = headquarters
        .first()
        .map(|row| average(MONTH_COLUMNS.iter().map(|month| month_credit(row, month))))
        .unwrap_or(0.0);

    let district_ratio = if districts.is_empty() {
        0.0
    } else {
        let count = districts.len() as f64;
        average(MONTH_COLUMNS.iter().map(|month| {
            districts
                .iter()
                .map(|row| month_credit(row, month))
                .sum::<f64>()
                / count
        }))
    };

    let headquarters_points = tier_fraction(headquarters_ratio, COMPLETION_LADDER) * half;
    let district_points = tier_fraction(district_ratio, COMPLETION_LADDER) * half;

    let bonus = if category_coefficient > 1.0 && district_ratio >= BONUS_MIN_DISTRICT_RATIO {
        (max_score * BONUS_CAP_SHARE)
            .min((category_coefficient - 1.0) * max_score * BONUS_RATE_SHARE)
    } else {
        0.0
    };
    let district_total = (district_points + bonus).min(half);

    ActivityScore::from_components(
        region,
        vec![
            ScoreComponent::new(
                "headquarters",
                headquarters_points,
                format!("headquarters completion {:.0}%", headquarters_ratio * 100.0),
            ),
            ScoreComponent::new(
                "districts",
                district_points,
                format!(
                    "{} district unit(s), completion {:.0}%",
                    districts.len(),
                    district_ratio * 100.0
                ),
            ),
            ScoreComponent::new(
                "fairness_bonus",
                district_total - district_points,
                format!("category coefficient {category_coefficient:.2}"),
            ),
        ],
        max_score,
    )
}

fn is_headquarters(row: &ActivityRow) -> bool {
    row.cell(UNIT_COLUMN)
        .map(|unit| {
            let unit = turkish_uppercase(unit.trim());
            unit == HEADQUARTERS_UNIT || unit == "IL"
        })
        .unwrap_or(false)
}

fn month_credit(row: &ActivityRow, month: &str) -> f64 {
    let status = row
        .cell(month)
        .map(|value| turkish_uppercase(value.trim()))
        .unwrap_or_default();
    match status.as_str() {
        DONE => 1.0,
        PLANNED => PLANNED_CREDIT,
        _ => 0.0,
    }
}

fn average<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{score, table};
    use super::*;
    use crate::scoring::activity::PopulationTable;

    const HEADERS: [&str; 5] = ["İL", UNIT_COLUMN, "HAZİRAN", "TEMMUZ", "AĞUSTOS"];

    fn mega_population(region: &str) -> PopulationTable {
        [(region, 5_000_000u64)].into_iter().collect()
    }

    #[test]
    fn full_completion_reaches_max() {
        let data = table(
            &HEADERS,
            &[
                &["ANKARA", "İL", "YAPILDI", "YAPILDI", "YAPILDI"],
                &["ANKARA", "ÇANKAYA", "YAPILDI", "yapıldı", "YAPILDI"],
            ],
        );
        let set = score(&CouncilScorer::new(), &data, &mega_population("ANKARA"), 30.0);
        assert!((set.get("ANKARA").expect("scored").raw - 30.0).abs() < 1e-9);
    }

    #[test]
    fn planned_meetings_earn_partial_credit() {
        let data = table(
            &HEADERS,
            &[
                &["ANKARA", "İL", "PLANLANDI", "PLANLANDI", "PLANLANDI"],
                &["ANKARA", "ÇANKAYA", "", "", ""],
            ],
        );
        let set = score(&CouncilScorer::new(), &data, &mega_population("ANKARA"), 30.0);
        let result = set.get("ANKARA").expect("scored");
        assert!((result.components[0].value - 0.7 * 15.0).abs() < 1e-9);
        assert_eq!(result.components[1].value, 0.0);
    }

    #[test]
    fn mixed_done_and_planned_months_reach_inclusive_tiers() {
        let data = table(
            &HEADERS,
            &[
                &["ANKARA", "İL", "YAPILDI", "PLANLANDI", "PLANLANDI"],
                &["ANKARA", "ÇANKAYA", "PLANLANDI", "PLANLANDI", "PLANLANDI"],
            ],
        );
        let set = score(&CouncilScorer::new(), &data, &mega_population("ANKARA"), 30.0);
        let result = set.get("ANKARA").expect("scored");
        assert!((result.components[0].value - 0.8 * 15.0).abs() < 1e-9);
        assert!((result.components[1].value - 0.7 * 15.0).abs() < 1e-9);
    }

    #[test]
    fn districts_average_per_month() {
        let data = table(
            &HEADERS,
            &[
                &["ANKARA", "İL", "", "", ""],
                &["ANKARA", "A", "YAPILDI", "YAPILDI", "YAPILDI"],
                &["ANKARA", "B", "", "", ""],
            ],
        );
        let set = score(&CouncilScorer::new(), &data, &mega_population("ANKARA"), 30.0);
        let result = set.get("ANKARA").expect("scored");
        assert!((result.components[1].value - 0.5 * 15.0).abs() < 1e-9);
        assert_eq!(result.components[2].value, 0.0, "mega regions get no bonus");
    }

    #[test]
    fn small_regions_receive_capped_bonus() {
        let data = table(
            &HEADERS,
            &[
                &["KİLİS", "İL", "", "", ""],
                &["KİLİS", "ELBEYLİ", "YAPILDI", "YAPILDI", "YAPILDI"],
                &["KİLİS", "MUSABEYLİ", "", "", ""],
            ],
        );
        let population: PopulationTable = [("KİLİS", 145_000u64)].into_iter().collect();
        let set = score(&CouncilScorer::new(), &data, &population, 30.0);
        let result = set.get("KİLİS").expect("scored");
        // (1.30 - 1.0) * 16 = 4.8 is capped at 4.
        assert!((result.components[2].value - 4.0).abs() < 1e-9);
        assert!((result.raw - (7.5 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn bonus_never_lifts_districts_above_half() {
        let data = table(
            &HEADERS,
            &[
                &["KİLİS", "İL", "", "", ""],
                &["KİLİS", "ELBEYLİ", "YAPILDI", "YAPILDI", "YAPILDI"],
            ],
        );
        let population: PopulationTable = [("KİLİS", 145_000u64)].into_iter().collect();
        let set = score(&CouncilScorer::new(), &data, &population, 30.0);
        let result = set.get("KİLİS").expect("scored");
        assert!((result.raw - 15.0).abs() < 1e-9);
        assert_eq!(result.components[2].value, 0.0);
    }

    #[test]
    fn requires_month_columns() {
        let data = table(&["İL", UNIT_COLUMN, "HAZİRAN"], &[&["ANKARA", "İL", "YAPILDI"]]);
        assert_eq!(
            CouncilScorer::new().check_table(&data),
            Err(DataUnavailable::MissingColumn("TEMMUZ".to_string()))
        );
    }
}
