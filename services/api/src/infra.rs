use metrics_exporter_prometheus::PrometheusHandle;
use regional_scorecard::config::ScoringSettings;
use regional_scorecard::scoring::{
    ActivityKey, CoefficientMap, ExtensionDescriptor, ExtensionRegistry, Registration,
    ScoringConfig, ScoringEngine, FALLBACK_COEFFICIENT,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) scoring: Arc<ScoringSettings>,
}

/// An extension to install before a run. `coefficient` is the operator's
/// choice; `None` defers to the declared or descriptor coefficient. A
/// descriptor that could not be loaded carries its error message.
pub(crate) struct ExtensionPlan {
    pub(crate) activity: ActivityKey,
    pub(crate) descriptor: Result<ExtensionDescriptor, String>,
    pub(crate) coefficient: Option<f64>,
}

/// Builds an engine with the built-ins plus the given extensions.
pub(crate) fn build_engine<I>(
    coefficients: CoefficientMap,
    extensions: I,
) -> (ScoringEngine, Vec<Registration>)
where
    I: IntoIterator<Item = ExtensionPlan>,
{
    let mut registry = ExtensionRegistry::with_builtins(coefficients);
    let registrations = extensions
        .into_iter()
        .map(|plan| {
            let coefficient = plan
                .coefficient
                .or_else(|| registry.declared().get(&plan.activity))
                .or_else(|| {
                    plan.descriptor
                        .as_ref()
                        .ok()
                        .and_then(|descriptor| descriptor.importance_coefficient)
                })
                .unwrap_or(FALLBACK_COEFFICIENT);
            match plan.descriptor {
                Ok(descriptor) => registry.register(plan.activity, &descriptor, coefficient),
                Err(message) => registry.register_unreadable(plan.activity, message, coefficient),
            }
        })
        .collect();

    (ScoringEngine::new(ScoringConfig::default(), registry), registrations)
}

#[cfg(test)]
pub(crate) fn test_metrics_handle() -> PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle()
}
