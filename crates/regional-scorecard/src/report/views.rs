use crate::scoring::{ActivityKey, ActivityWeight, AvailabilityNote, RegionCategory, Reallocation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ActivityScoreView {
    pub activity: ActivityKey,
    pub raw: f64,
    pub max_score: f64,
    pub weight_pct: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub region: String,
    pub category: RegionCategory,
    pub category_label: &'static str,
    pub population: u64,
    pub final_score: f64,
    pub activities: Vec<ActivityScoreView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub region_count: usize,
    pub activity_count: usize,
    pub available_activity_count: usize,
    pub total_coefficient: f64,
    pub top: Vec<RankingEntry>,
    pub weights: Vec<ActivityWeight>,
    pub reallocations: Vec<Reallocation>,
    pub availability: Vec<AvailabilityNote>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension_warnings: Vec<String>,
}

/// Distribution of one score series across regions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreStatistics {
    pub subject: String,
    pub count: usize,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub best_region: String,
    pub worst_region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStatistics {
    pub overall: Option<ScoreStatistics>,
    pub activities: Vec<ScoreStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatistics {
    pub category: RegionCategory,
    pub category_label: &'static str,
    pub region_count: usize,
    pub mean_final_score: f64,
    pub max_final_score: f64,
    pub min_final_score: f64,
    pub best_region: String,
    pub activity_means: BTreeMap<String, f64>,
}
