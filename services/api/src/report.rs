use crate::infra::{build_engine, ExtensionPlan};
use chrono::SecondsFormat;
use clap::Args;
use regional_scorecard::config::{AppConfig, ScoringSettings};
use regional_scorecard::error::AppError;
use regional_scorecard::ingest::{activity_for_name, DataFolderImporter, IngestError};
use regional_scorecard::report::views::{CategoryStatistics, ReportStatistics, ReportSummary};
use regional_scorecard::report::{ReportExporter, ScoringReport};
use regional_scorecard::scoring::{ExtensionDescriptor, ExtensionRegistry, Registration};
use regional_scorecard::telemetry;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Folder holding the activity and population CSV files
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Folder the CSV exports are written to
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Folder holding `<activity>_config.json` extension descriptors
    #[arg(long)]
    pub(crate) extensions_dir: Option<PathBuf>,
    /// Coefficient override as `activity=value` (repeatable)
    #[arg(long)]
    pub(crate) coefficient: Vec<String>,
    /// Number of regions listed in the ranking
    #[arg(long, default_value_t = 10)]
    pub(crate) top: usize,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
    /// Skip writing CSV exports
    #[arg(long)]
    pub(crate) no_export: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExtensionValidateArgs {
    /// Activity key or data file name the descriptor belongs to
    #[arg(long)]
    pub(crate) activity: String,
    /// Descriptor JSON file
    #[arg(long)]
    pub(crate) descriptor: PathBuf,
    /// Operator supplied importance coefficient
    #[arg(long)]
    pub(crate) coefficient: f64,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    summary: ReportSummary,
    statistics: ReportStatistics,
    categories: Vec<CategoryStatistics>,
    registrations: &'a [Registration],
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_cli(&config.telemetry)?;
    let mut settings = config.scoring;
    apply_score_args(&mut settings, &args)?;

    let importer = DataFolderImporter::new(settings.default_population);
    let input = importer.load_dir(&settings.data_dir)?;
    let extensions = match &settings.extensions_dir {
        Some(dir) => importer.load_extensions(dir)?,
        None => Vec::new(),
    };
    let (engine, registrations) = build_engine(
        settings.coefficients.clone(),
        extensions
            .into_iter()
            .map(|file| ExtensionPlan {
                activity: file.activity,
                descriptor: file.descriptor,
                coefficient: None,
            }),
    );
    let report = engine.run(&input)?;

    if args.json {
        let payload = JsonReport {
            summary: report.summary(args.top),
            statistics: report.statistics(),
            categories: report.category_statistics(),
            registrations: &registrations,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", render_report(&report, args.top));
    }

    if !args.no_export {
        let written = ReportExporter::new(&settings.output_dir).export(&report)?;
        if !args.json {
            println!("\nCSV exports written to {}:", settings.output_dir.display());
            for path in written {
                println!("  - {}", path.display());
            }
        }
    }

    Ok(())
}

pub(crate) fn run_extension_validate(args: ExtensionValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_cli(&config.telemetry)?;
    let raw = std::fs::read_to_string(&args.descriptor).map_err(|source| IngestError::Io {
        path: args.descriptor.clone(),
        source,
    })?;
    let descriptor = ExtensionDescriptor::from_json(&raw).map_err(|source| IngestError::Json {
        path: args.descriptor.clone(),
        source,
    })?;

    let registry = ExtensionRegistry::with_builtins(config.scoring.coefficients);
    let activity = activity_for_name(&args.activity);
    let registration = registry.evaluate(&activity, &descriptor, args.coefficient);
    print!("{}", render_registration(&registration));
    Ok(())
}

fn apply_score_args(settings: &mut ScoringSettings, args: &ScoreArgs) -> Result<(), AppError> {
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.clone();
    }
    if let Some(dir) = &args.extensions_dir {
        settings.extensions_dir = Some(dir.clone());
    }
    settings.apply_overrides(args.coefficient.iter().map(String::as_str))?;
    Ok(())
}

pub(crate) fn render_report(report: &ScoringReport, top: usize) -> String {
    let summary = report.summary(top);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Regional scorecard ({})",
        summary
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let _ = writeln!(
        out,
        "- {} regions | {}/{} activities with data | total coefficient {:.2}",
        summary.region_count,
        summary.available_activity_count,
        summary.activity_count,
        summary.total_coefficient
    );

    let _ = writeln!(out, "\nWeights:");
    for weight in &summary.weights {
        if weight.available {
            let _ = writeln!(
                out,
                "  - {}: declared {:.2} -> effective {:.2} ({:.2}%)",
                weight.activity,
                weight.declared_coefficient,
                weight.effective_coefficient,
                weight.weight_pct
            );
        } else {
            let reason = summary
                .availability
                .iter()
                .find(|note| note.activity == weight.activity)
                .and_then(|note| note.reason.as_ref())
                .map(ToString::to_string)
                .unwrap_or_else(|| "no data".to_string());
            let _ = writeln!(
                out,
                "  - {}: declared {:.2}, unavailable ({reason})",
                weight.activity, weight.declared_coefficient
            );
        }
    }

    let _ = writeln!(out, "\nRanking (top {}):", summary.top.len());
    for entry in &summary.top {
        let _ = writeln!(
            out,
            "  {:>2}. {} ({}, pop {}) {:.2}",
            entry.rank, entry.region, entry.category_label, entry.population, entry.final_score
        );
        let details: Vec<String> = entry
            .activities
            .iter()
            .map(|activity| {
                format!(
                    "{} {:.1}/{:.1} -> {:.2}",
                    activity.activity, activity.raw, activity.max_score, activity.contribution
                )
            })
            .collect();
        let _ = writeln!(out, "      {}", details.join(" | "));
    }

    let statistics = report.statistics();
    let _ = writeln!(out, "\nStatistics:");
    for stats in statistics.overall.iter().chain(statistics.activities.iter()) {
        let _ = writeln!(
            out,
            "  - {}: mean {:.2} | median {:.2} | std {:.2} | best {} ({:.2}) | worst {} ({:.2})",
            stats.subject,
            stats.mean,
            stats.median,
            stats.std_dev,
            stats.best_region,
            stats.max,
            stats.worst_region,
            stats.min
        );
    }

    let _ = writeln!(out, "\nCategories:");
    for category in report.category_statistics() {
        let _ = writeln!(
            out,
            "  - {}: {} regions | mean {:.2} | best {}",
            category.category_label,
            category.region_count,
            category.mean_final_score,
            category.best_region
        );
    }

    if !summary.extension_warnings.is_empty() {
        let _ = writeln!(out, "\nExtension warnings:");
        for warning in &summary.extension_warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }

    out
}

pub(crate) fn render_registration(registration: &Registration) -> String {
    let mut out = String::new();
    let status = if !registration.installed {
        "rejected"
    } else if registration.fail_closed {
        "fail-closed (default policy)"
    } else {
        "accepted"
    };
    let _ = writeln!(out, "Extension '{}': {status}", registration.activity);
    let _ = writeln!(out, "- coefficient {:.2}", registration.coefficient);
    let policy = &registration.policy;
    let _ = writeln!(
        out,
        "- key column: {}",
        policy.key_column.as_deref().unwrap_or("first data column")
    );
    let _ = writeln!(
        out,
        "- population normalization: {} | category coefficient: {}",
        policy.population_normalization, policy.category_coefficient
    );
    if !registration.problems.is_empty() {
        let _ = writeln!(out, "Problems:");
        for problem in &registration.problems {
            let _ = writeln!(out, "  - {problem}");
        }
    }
    out
}
