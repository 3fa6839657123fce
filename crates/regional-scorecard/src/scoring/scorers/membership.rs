use super::tiers::{tier_fraction, Tiers};
use super::{
    require_columns, ActivityScore, ActivityScoreSet, ActivityScorer, ScoreComponent,
    ScoringContext,
};
use crate::scoring::activity::{ActivityKey, ActivityRow, ActivityTable};
use crate::scoring::DataUnavailable;

pub const ACHIEVEMENT_COLUMN: &str = "HEDEFE ULAŞMA ORANI";
pub const BOARD_TARGET_COLUMN: &str = "YÖNETİM KURULU YAPMASI GEREKEN ÜYE SAYISI";
pub const BOARD_REFERRALS_COLUMN: &str =
    "YÖNETİM KURULU ÜYELERİ TARAFINDAN REFERANS OLUNAN YENİ ÜYE SAYISI";

const BASE_SHARE: f64 = 27.0 / 40.0;
const BONUS_SHARE: f64 = 8.0 / 40.0;
const LEADERSHIP_SHARE: f64 = 5.0 / 40.0;

const BASE_TIERS: Tiers = &[
    (100.0, 27.0 / 27.0),
    (90.0, 25.0 / 27.0),
    (80.0, 23.0 / 27.0),
    (70.0, 21.0 / 27.0),
    (60.0, 19.0 / 27.0),
    (50.0, 17.0 / 27.0),
    (40.0, 15.0 / 27.0),
    (30.0, 12.0 / 27.0),
    (20.0, 9.0 / 27.0),
    (15.0, 6.0 / 27.0),
    (10.0, 3.0 / 27.0),
];

const BONUS_TIERS: Tiers = &[
    (200.0, 8.0 / 8.0),
    (150.0, 6.0 / 8.0),
    (120.0, 4.0 / 8.0),
    (100.0, 2.0 / 8.0),
];

const LEADERSHIP_TIERS: Tiers = &[
    (100.0, 5.0 / 5.0),
    (80.0, 4.0 / 5.0),
    (60.0, 3.0 / 5.0),
    (40.0, 2.0 / 5.0),
    (20.0, 1.0 / 5.0),
];

/// Membership drive: target achievement, over-achievement bonus and board
/// member referral leadership.
#[derive(Debug, Clone)]
pub struct MembershipScorer {
    key: ActivityKey,
}

impl Default for MembershipScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipScorer {
    pub fn new() -> Self {
        Self {
            key: ActivityKey::membership(),
        }
    }
}

impl ActivityScorer for MembershipScorer {
    fn key(&self) -> &ActivityKey {
        &self.key
    }

    fn check_table(&self, table: &ActivityTable) -> Result<(), DataUnavailable> {
        require_columns(table, &[ACHIEVEMENT_COLUMN])
    }

    fn score_table(&self, table: &ActivityTable, ctx: &ScoringContext<'_>) -> ActivityScoreSet {
        let mut scores = ActivityScoreSet::new(self.key.clone(), ctx.max_score);
        for row in table.first_rows() {
            scores.insert(score_row(row, ctx.max_score));
        }
        scores
    }
}

fn score_row(row: &ActivityRow, max_score: f64) -> ActivityScore {
    let achievement = row.number(ACHIEVEMENT_COLUMN);
    let target = row.number(BOARD_TARGET_COLUMN);
    let referrals = row.number(BOARD_REFERRALS_COLUMN);
    let board_success = if target > 0.0 {
        referrals / target * 100.0
    } else {
        0.0
    };

    let base = tier_fraction(achievement, BASE_TIERS) * BASE_SHARE * max_score;
    let bonus = tier_fraction(achievement, BONUS_TIERS) * BONUS_SHARE * max_score;
    let leadership = tier_fraction(board_success, LEADERSHIP_TIERS) * LEADERSHIP_SHARE * max_score;

    ActivityScore::from_components(
        row.region.clone(),
        vec![
            ScoreComponent::new("base", base, format!("target achievement {achievement:.1}%")),
            ScoreComponent::new(
                "bonus",
                bonus,
                format!("over-achievement at {achievement:.1}%"),
            ),
            ScoreComponent::new(
                "leadership",
                leadership,
                format!("board referrals {referrals:.0}/{target:.0} ({board_success:.1}%)"),
            ),
        ],
        max_score,
    )
}
