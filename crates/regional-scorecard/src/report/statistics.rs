use super::views::{CategoryStatistics, ScoreStatistics};
use crate::scoring::{RegionCategory, RegionResult};
use std::collections::BTreeMap;

/// Summary statistics over `(region, value)` pairs. The first region holding
/// the extreme value wins ties.
pub(crate) fn score_statistics(subject: &str, values: &[(&str, f64)]) -> Option<ScoreStatistics> {
    let (first_region, first_value) = *values.first()?;
    let count = values.len();

    let mut best = (first_region, first_value);
    let mut worst = (first_region, first_value);
    for &(region, value) in &values[1..] {
        if value > best.1 {
            best = (region, value);
        }
        if value < worst.1 {
            worst = (region, value);
        }
    }

    let mean = values.iter().map(|(_, value)| value).sum::<f64>() / count as f64;
    let std_dev = if count > 1 {
        let variance = values
            .iter()
            .map(|(_, value)| (value - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    let mut sorted: Vec<f64> = values.iter().map(|(_, value)| *value).collect();
    sorted.sort_by(f64::total_cmp);
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    Some(ScoreStatistics {
        subject: subject.to_string(),
        count,
        max: best.1,
        min: worst.1,
        mean,
        median,
        std_dev,
        best_region: best.0.to_string(),
        worst_region: worst.0.to_string(),
    })
}

/// Per-category aggregates, strongest category first.
pub(crate) fn category_statistics(results: &[RegionResult]) -> Vec<CategoryStatistics> {
    let mut stats: Vec<CategoryStatistics> = RegionCategory::ordered()
        .into_iter()
        .filter_map(|category| {
            let members: Vec<&RegionResult> = results
                .iter()
                .filter(|result| result.category == category)
                .collect();
            let best = members.first()?;
            let count = members.len() as f64;

            let mut activity_totals: BTreeMap<String, f64> = BTreeMap::new();
            for member in &members {
                for activity in &member.activities {
                    *activity_totals
                        .entry(activity.activity.to_string())
                        .or_default() += activity.raw;
                }
            }
            let activity_means = activity_totals
                .into_iter()
                .map(|(activity, total)| (activity, total / count))
                .collect();

            let scores = members.iter().map(|member| member.final_score);
            Some(CategoryStatistics {
                category,
                category_label: category.label(),
                region_count: members.len(),
                mean_final_score: scores.clone().sum::<f64>() / count,
                max_final_score: scores.clone().fold(f64::MIN, f64::max),
                min_final_score: scores.fold(f64::MAX, f64::min),
                best_region: best.region.clone(),
                activity_means,
            })
        })
        .collect();

    stats.sort_by(|a, b| b.mean_final_score.total_cmp(&a.mean_final_score));
    stats
}
