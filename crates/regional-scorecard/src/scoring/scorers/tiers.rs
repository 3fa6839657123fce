/// Step table of `(inclusive lower bound, fraction)` pairs, highest bound first.
pub(crate) type Tiers = &'static [(f64, f64)];

/// Absorbs rounding in averaged ratios such as `(1 + 0.7 + 0.7) / 3`.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Fraction awarded by the first tier whose lower bound `value` reaches.
pub(crate) fn tier_fraction(value: f64, tiers: Tiers) -> f64 {
    tiers
        .iter()
        .find(|(threshold, _)| value + THRESHOLD_EPSILON >= *threshold)
        .map(|(_, fraction)| *fraction)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: Tiers = &[(100.0, 1.0), (50.0, 0.5), (10.0, 0.1)];

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(tier_fraction(100.0, SAMPLE), 1.0);
        assert_eq!(tier_fraction(99.99, SAMPLE), 0.5);
        assert_eq!(tier_fraction(50.0, SAMPLE), 0.5);
        assert_eq!(tier_fraction(10.0, SAMPLE), 0.1);
        assert_eq!(tier_fraction(9.99, SAMPLE), 0.0);
        assert_eq!(tier_fraction(-5.0, SAMPLE), 0.0);
    }

    #[test]
    fn averaged_ratios_just_below_a_bound_still_reach_it() {
        let ladder: Tiers = &[(0.8, 0.8), (0.7, 0.7), (0.6, 0.6)];
        assert_eq!(tier_fraction((1.0 + 0.7 + 0.7) / 3.0, ladder), 0.8);
        assert_eq!(tier_fraction((0.7 + 0.7 + 0.7) / 3.0, ladder), 0.7);
        assert_eq!(tier_fraction(0.6999, ladder), 0.6);
    }
}
