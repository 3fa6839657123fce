use crate::infra::{build_engine, AppState, ExtensionPlan};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use regional_scorecard::config::ScoringSettings;
use regional_scorecard::error::AppError;
use regional_scorecard::ingest::{activity_for_name, DataFolderImporter};
use regional_scorecard::report::views::{CategoryStatistics, ReportStatistics, ReportSummary};
use regional_scorecard::scoring::{
    ActivityKey, ExtensionDescriptor, ExtensionRegistry, Registration,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

const DEFAULT_TOP: usize = 10;

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    /// CSV text keyed by activity or file name.
    pub(crate) tables: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) population_csv: Option<String>,
    #[serde(default)]
    pub(crate) coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    pub(crate) extensions: BTreeMap<String, ExtensionRequest>,
    #[serde(default)]
    pub(crate) top: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtensionRequest {
    pub(crate) descriptor: ExtensionDescriptor,
    #[serde(default)]
    pub(crate) coefficient: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreResponse {
    pub(crate) summary: ReportSummary,
    pub(crate) statistics: ReportStatistics,
    pub(crate) categories: Vec<CategoryStatistics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) registrations: Vec<Registration>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidateExtensionRequest {
    pub(crate) activity: String,
    pub(crate) descriptor: ExtensionDescriptor,
    pub(crate) coefficient: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CoefficientEntry {
    pub(crate) activity: ActivityKey,
    pub(crate) coefficient: f64,
    pub(crate) weight_pct: f64,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/coefficients", get(coefficients_endpoint))
        .route("/api/v1/score", post(score_endpoint))
        .route(
            "/api/v1/extensions/validate",
            post(validate_extension_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn coefficients_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<Vec<CoefficientEntry>> {
    let registry = ExtensionRegistry::with_builtins(state.scoring.coefficients.clone());
    let declared = registry.declared();
    let total = declared.total();
    let entries = declared
        .iter()
        .map(|(activity, coefficient)| CoefficientEntry {
            activity: activity.clone(),
            coefficient,
            weight_pct: if total > 0.0 {
                coefficient * 100.0 / total
            } else {
                0.0
            },
        })
        .collect();
    Json(entries)
}

pub(crate) async fn score_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let settings = state.scoring.clone();
    let response = tokio::task::spawn_blocking(move || score_payload(&settings, payload))
        .await
        .map_err(axum::Error::new)??;
    Ok(Json(response))
}

pub(crate) async fn validate_extension_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ValidateExtensionRequest>,
) -> Json<Registration> {
    let registry = ExtensionRegistry::with_builtins(state.scoring.coefficients.clone());
    let activity = activity_for_name(&payload.activity);
    Json(registry.evaluate(&activity, &payload.descriptor, payload.coefficient))
}

fn score_payload(
    settings: &ScoringSettings,
    payload: ScoreRequest,
) -> Result<ScoreResponse, AppError> {
    let ScoreRequest {
        tables,
        population_csv,
        coefficients,
        extensions,
        top,
    } = payload;

    let mut settings = settings.clone();
    let overrides: Vec<String> = coefficients
        .iter()
        .map(|(activity, value)| format!("{activity}={value}"))
        .collect();
    settings.apply_overrides(overrides.iter().map(String::as_str))?;

    let extensions = extensions
        .into_iter()
        .map(|(activity, request)| ExtensionPlan {
            activity: activity_for_name(&activity),
            descriptor: Ok(request.descriptor),
            coefficient: request.coefficient,
        });
    let (engine, registrations) = build_engine(settings.coefficients.clone(), extensions);

    let input = DataFolderImporter::new(settings.default_population)
        .from_payloads(&tables, population_csv.as_deref());
    let report = engine.run(&input)?;
    info!(
        tables = tables.len(),
        regions = report.results.len(),
        "scoring request served"
    );

    Ok(ScoreResponse {
        summary: report.summary(top.unwrap_or(DEFAULT_TOP)),
        statistics: report.statistics(),
        categories: report.category_statistics(),
        registrations,
    })
}
