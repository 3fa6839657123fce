use super::summary::ScoringReport;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const RANKING_FILE: &str = "ranking.csv";
pub const WEIGHTS_FILE: &str = "weights.csv";
pub const STATISTICS_FILE: &str = "statistics.csv";
pub const CATEGORIES_FILE: &str = "categories.csv";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode CSV output: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes the CSV views of a report into an output directory.
#[derive(Debug, Clone)]
pub struct ReportExporter {
    output_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every CSV view and returns the paths written.
    pub fn export(&self, report: &ScoringReport) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ExportError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let outputs: [(&str, fn(&ScoringReport, &mut File) -> Result<(), csv::Error>); 4] = [
            (RANKING_FILE, |report, file| write_ranking(report, file)),
            (WEIGHTS_FILE, |report, file| write_weights(report, file)),
            (STATISTICS_FILE, |report, file| write_statistics(report, file)),
            (CATEGORIES_FILE, |report, file| write_categories(report, file)),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (name, write) in outputs {
            let path = self.output_dir.join(name);
            let io_error = |source| ExportError::Io {
                path: path.clone(),
                source,
            };
            let mut file = File::create(&path).map_err(io_error)?;
            file.write_all(UTF8_BOM).map_err(io_error)?;
            write(report, &mut file)?;
            written.push(path);
        }

        info!(dir = %self.output_dir.display(), files = written.len(), "report exported");
        Ok(written)
    }
}

/// Ranking with per-activity raw score, weighted contribution and weight.
pub fn write_ranking<W: Write>(report: &ScoringReport, writer: W) -> Result<(), csv::Error> {
    let activities = report.available_weights();
    let total_coefficient: f64 = activities
        .iter()
        .map(|weight| weight.effective_coefficient)
        .sum();

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header: Vec<String> = [
        "RANK",
        "REGION",
        "CATEGORY",
        "CATEGORY_COEFFICIENT",
        "POPULATION",
        "FINAL_SCORE",
        "TOTAL_COEFFICIENT",
    ]
    .iter()
    .map(|column| column.to_string())
    .collect();
    for weight in &activities {
        let key = weight.activity.as_str().to_uppercase();
        header.push(format!("{key}_RAW"));
        header.push(format!("{key}_FINAL"));
        header.push(format!("{key}_WEIGHT"));
    }
    csv_writer.write_record(&header)?;

    for result in &report.results {
        let mut record = vec![
            result.rank.to_string(),
            result.region.clone(),
            result.category_label.to_string(),
            format!("{:.2}", result.category_coefficient),
            result.population.to_string(),
            format!("{:.2}", result.final_score),
            format!("{total_coefficient:.2}"),
        ];
        for weight in &activities {
            match result.contribution(&weight.activity) {
                Some(entry) => {
                    record.push(format!("{:.1}", entry.raw));
                    record.push(format!("{:.2}", entry.contribution));
                    record.push(format!("{:.2}", entry.weight_pct));
                }
                None => record.extend(["0.0".to_string(), "0.00".to_string(), "0.00".to_string()]),
            }
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Declared and effective coefficients per activity, with a total row.
pub fn write_weights<W: Write>(report: &ScoringReport, writer: W) -> Result<(), csv::Error> {
    let mut weights: Vec<_> = report.weights.iter().collect();
    weights.sort_by(|a, b| b.effective_coefficient.total_cmp(&a.effective_coefficient));

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "ACTIVITY",
        "DECLARED_COEFFICIENT",
        "EFFECTIVE_COEFFICIENT",
        "WEIGHT_PCT",
        "MAX_RAW_SCORE",
        "AVAILABLE",
    ])?;

    for weight in &weights {
        csv_writer.write_record([
            weight.activity.to_string(),
            format!("{:.2}", weight.declared_coefficient),
            format!("{:.2}", weight.effective_coefficient),
            format!("{:.2}", weight.weight_pct),
            format!("{:.1}", weight.max_score),
            if weight.available { "yes" } else { "no" }.to_string(),
        ])?;
    }

    let declared: f64 = weights.iter().map(|w| w.declared_coefficient).sum();
    let effective: f64 = weights.iter().map(|w| w.effective_coefficient).sum();
    let pct: f64 = weights.iter().map(|w| w.weight_pct).sum();
    let max_score: f64 = weights.iter().map(|w| w.max_score).sum();
    csv_writer.write_record([
        "TOTAL".to_string(),
        format!("{declared:.2}"),
        format!("{effective:.2}"),
        format!("{pct:.2}"),
        format!("{max_score:.1}"),
        String::new(),
    ])?;

    csv_writer.flush()?;
    Ok(())
}

pub fn write_statistics<W: Write>(report: &ScoringReport, writer: W) -> Result<(), csv::Error> {
    let stats = report.statistics();
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "SUBJECT",
        "COUNT",
        "MAX",
        "MIN",
        "MEAN",
        "MEDIAN",
        "STD_DEV",
        "BEST_REGION",
        "WORST_REGION",
    ])?;

    for entry in stats.overall.iter().chain(stats.activities.iter()) {
        csv_writer.write_record([
            entry.subject.clone(),
            entry.count.to_string(),
            format!("{:.2}", entry.max),
            format!("{:.2}", entry.min),
            format!("{:.2}", entry.mean),
            format!("{:.2}", entry.median),
            format!("{:.2}", entry.std_dev),
            entry.best_region.clone(),
            entry.worst_region.clone(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_categories<W: Write>(report: &ScoringReport, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "CATEGORY",
        "REGION_COUNT",
        "MEAN_FINAL_SCORE",
        "MAX_FINAL_SCORE",
        "MIN_FINAL_SCORE",
        "BEST_REGION",
    ])?;

    for entry in report.category_statistics() {
        csv_writer.write_record([
            entry.category_label.to_string(),
            entry.region_count.to_string(),
            format!("{:.2}", entry.mean_final_score),
            format!("{:.2}", entry.max_final_score),
            format!("{:.2}", entry.min_final_score),
            entry.best_region,
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
