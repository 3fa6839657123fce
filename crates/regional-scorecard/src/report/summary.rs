use super::statistics::{category_statistics, score_statistics};
use super::views::{
    ActivityScoreView, CategoryStatistics, RankingEntry, ReportStatistics, ReportSummary,
};
use crate::scoring::{ActivityWeight, AvailabilityNote, Reallocation, RegionResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Complete, immutable outcome of one scoring run.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<RegionResult>,
    pub weights: Vec<ActivityWeight>,
    pub reallocations: Vec<Reallocation>,
    pub availability: Vec<AvailabilityNote>,
    pub extension_warnings: Vec<String>,
}

impl ScoringReport {
    pub fn new(
        results: Vec<RegionResult>,
        weights: Vec<ActivityWeight>,
        reallocations: Vec<Reallocation>,
        availability: Vec<AvailabilityNote>,
        extension_warnings: Vec<String>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            results,
            weights,
            reallocations,
            availability,
            extension_warnings,
        }
    }

    pub fn result(&self, region: &str) -> Option<&RegionResult> {
        self.results.iter().find(|result| result.region == region)
    }

    /// Weights of the activities that took part, heaviest first.
    pub fn available_weights(&self) -> Vec<&ActivityWeight> {
        let mut weights: Vec<&ActivityWeight> =
            self.weights.iter().filter(|weight| weight.available).collect();
        weights.sort_by(|a, b| b.effective_coefficient.total_cmp(&a.effective_coefficient));
        weights
    }

    pub fn ranking(&self) -> Vec<RankingEntry> {
        self.results.iter().map(ranking_entry).collect()
    }

    pub fn summary(&self, top: usize) -> ReportSummary {
        ReportSummary {
            generated_at: self.generated_at,
            region_count: self.results.len(),
            activity_count: self.weights.len(),
            available_activity_count: self.weights.iter().filter(|w| w.available).count(),
            total_coefficient: self.weights.iter().map(|w| w.declared_coefficient).sum(),
            top: self.results.iter().take(top).map(ranking_entry).collect(),
            weights: self.weights.clone(),
            reallocations: self.reallocations.clone(),
            availability: self.availability.clone(),
            extension_warnings: self.extension_warnings.clone(),
        }
    }

    /// Final score statistics plus raw score statistics per available activity.
    pub fn statistics(&self) -> ReportStatistics {
        let finals: Vec<(&str, f64)> = self
            .results
            .iter()
            .map(|result| (result.region.as_str(), result.final_score))
            .collect();

        let activities = self
            .available_weights()
            .into_iter()
            .filter_map(|weight| {
                let raws: Vec<(&str, f64)> = self
                    .results
                    .iter()
                    .filter_map(|result| {
                        result
                            .contribution(&weight.activity)
                            .map(|entry| (result.region.as_str(), entry.raw))
                    })
                    .collect();
                score_statistics(weight.activity.as_str(), &raws)
            })
            .collect();

        ReportStatistics {
            overall: score_statistics("final_score", &finals),
            activities,
        }
    }

    pub fn category_statistics(&self) -> Vec<CategoryStatistics> {
        category_statistics(&self.results)
    }
}

fn ranking_entry(result: &RegionResult) -> RankingEntry {
    RankingEntry {
        rank: result.rank,
        region: result.region.clone(),
        category: result.category,
        category_label: result.category_label,
        population: result.population,
        final_score: result.final_score,
        activities: result
            .activities
            .iter()
            .map(|entry| ActivityScoreView {
                activity: entry.activity.clone(),
                raw: entry.raw,
                max_score: entry.max_score,
                weight_pct: entry.weight_pct,
                contribution: entry.contribution,
            })
            .collect(),
    }
}
