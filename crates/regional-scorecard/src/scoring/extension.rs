use super::activity::ActivityKey;
use super::coefficients::CoefficientMap;
use super::scorers::{builtin_scorers, ActivityScorer, GenericScorer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

pub use super::scorers::GenericPolicy;

/// Coefficient used when neither the operator nor the descriptor supplies a valid one.
pub const FALLBACK_COEFFICIENT: f64 = 1.0;

/// Declarative scoring policy for an operator supplied activity. Unknown
/// fields (free-text methodology notes and the like) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    /// Required in descriptor files; a missing value fails validation.
    #[serde(default)]
    pub importance_coefficient: Option<f64>,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub population_normalization: bool,
    #[serde(default)]
    pub category_coefficient: bool,
}

impl Default for ExtensionDescriptor {
    fn default() -> Self {
        Self {
            importance_coefficient: Some(FALLBACK_COEFFICIENT),
            key_columns: Vec::new(),
            population_normalization: false,
            category_coefficient: false,
        }
    }
}

impl ExtensionDescriptor {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn first_key_column(&self) -> Option<&str> {
        self.key_columns
            .iter()
            .map(|column| column.trim())
            .find(|column| !column.is_empty())
    }
}

/// Problems found while registering an extension activity.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("operator coefficient {value} must be a positive number")]
    NonPositiveCoefficient { value: f64 },
    #[error("descriptor importance coefficient {value} must be a positive number")]
    NonPositiveDescriptorCoefficient { value: f64 },
    #[error("descriptor declares no importance coefficient")]
    MissingDescriptorCoefficient,
    #[error("descriptor lists no key columns")]
    EmptyKeyColumns,
    #[error("descriptor could not be read: {message}")]
    UnreadableDescriptor { message: String },
    #[error("activity '{activity}' is served by a built-in scorer")]
    ReservedActivity { activity: String },
}

/// Outcome of registering one extension activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub activity: ActivityKey,
    pub coefficient: f64,
    pub policy: GenericPolicy,
    /// True when validation failed and the default policy was installed instead.
    pub fail_closed: bool,
    pub installed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<ValidationError>,
}

impl Registration {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Scorers and declared coefficients for every activity known to a run.
#[derive(Clone)]
pub struct ExtensionRegistry {
    declared: CoefficientMap,
    scorers: BTreeMap<ActivityKey, Arc<dyn ActivityScorer>>,
    registrations: Vec<Registration>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("declared", &self.declared)
            .field("scorers", &self.scorers.keys().collect::<Vec<_>>())
            .field("registrations", &self.registrations)
            .finish()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::with_builtins(CoefficientMap::defaults())
    }
}

impl ExtensionRegistry {
    /// Installs the built-in scorers. Built-ins missing from `coefficients`
    /// keep their default weight; other entries are kept as declared
    /// coefficients for activities registered later.
    pub fn with_builtins(coefficients: CoefficientMap) -> Self {
        let defaults = CoefficientMap::defaults();
        let mut declared = CoefficientMap::new();
        for (key, default) in defaults.iter() {
            declared.insert(key.clone(), coefficients.get(key).unwrap_or(default));
        }
        for (key, value) in coefficients.iter() {
            if !declared.contains(key) {
                declared.insert(key.clone(), value);
            }
        }

        let scorers = builtin_scorers()
            .into_iter()
            .map(|scorer| (scorer.key().clone(), scorer))
            .collect();

        Self {
            declared,
            scorers,
            registrations: Vec::new(),
        }
    }

    /// Validates without installing anything.
    pub fn evaluate(
        &self,
        activity: &ActivityKey,
        descriptor: &ExtensionDescriptor,
        operator_coefficient: f64,
    ) -> Registration {
        let mut problems = Vec::new();

        if activity.is_builtin() {
            problems.push(ValidationError::ReservedActivity {
                activity: activity.to_string(),
            });
            return Registration {
                activity: activity.clone(),
                coefficient: self.declared.get(activity).unwrap_or(FALLBACK_COEFFICIENT),
                policy: GenericPolicy::default(),
                fail_closed: false,
                installed: false,
                problems,
            };
        }

        let operator_valid = is_positive(operator_coefficient);
        if !operator_valid {
            problems.push(ValidationError::NonPositiveCoefficient {
                value: operator_coefficient,
            });
        }
        let descriptor_coefficient = match descriptor.importance_coefficient {
            Some(value) if is_positive(value) => Some(value),
            Some(value) => {
                problems.push(ValidationError::NonPositiveDescriptorCoefficient { value });
                None
            }
            None => {
                problems.push(ValidationError::MissingDescriptorCoefficient);
                None
            }
        };
        let key_column = descriptor.first_key_column();
        if key_column.is_none() {
            problems.push(ValidationError::EmptyKeyColumns);
        }

        let fail_closed = !problems.is_empty();
        let policy = match (fail_closed, key_column) {
            (false, Some(column)) => GenericPolicy {
                key_column: Some(column.to_string()),
                population_normalization: descriptor.population_normalization,
                category_coefficient: descriptor.category_coefficient,
            },
            _ => GenericPolicy::default(),
        };
        let coefficient = if operator_valid {
            operator_coefficient
        } else {
            descriptor_coefficient.unwrap_or(FALLBACK_COEFFICIENT)
        };

        Registration {
            activity: activity.clone(),
            coefficient,
            policy,
            fail_closed,
            installed: true,
            problems,
        }
    }

    /// Installs a descriptor-driven scorer. Invalid descriptors fail closed to
    /// the default policy; built-in keys are never replaced.
    pub fn register(
        &mut self,
        activity: ActivityKey,
        descriptor: &ExtensionDescriptor,
        operator_coefficient: f64,
    ) -> Registration {
        let registration = self.evaluate(&activity, descriptor, operator_coefficient);
        self.record(registration)
    }

    /// Installs the default policy for an activity whose descriptor file
    /// could not be read or parsed.
    pub fn register_unreadable(
        &mut self,
        activity: ActivityKey,
        message: impl Into<String>,
        operator_coefficient: f64,
    ) -> Registration {
        let mut registration =
            self.evaluate(&activity, &ExtensionDescriptor::default(), operator_coefficient);
        registration.policy = GenericPolicy::default();
        registration.fail_closed = registration.installed;
        registration.problems = vec![ValidationError::UnreadableDescriptor {
            message: message.into(),
        }];
        self.record(registration)
    }

    /// Installs the default policy for an activity that arrived without a
    /// descriptor. Nothing is wrong with such an activity, so no problems
    /// are recorded.
    pub fn register_default(&mut self, activity: ActivityKey, coefficient: f64) -> Registration {
        let coefficient = if is_positive(coefficient) {
            coefficient
        } else {
            FALLBACK_COEFFICIENT
        };
        let registration = Registration {
            activity,
            coefficient,
            policy: GenericPolicy::default(),
            fail_closed: false,
            installed: true,
            problems: Vec::new(),
        };
        self.record(registration)
    }

    fn record(&mut self, registration: Registration) -> Registration {
        let activity = &registration.activity;
        for problem in &registration.problems {
            warn!(%activity, %problem, "extension registration problem");
        }

        if registration.installed {
            self.install(&registration);
            info!(
                %activity,
                coefficient = registration.coefficient,
                fail_closed = registration.fail_closed,
                "extension activity registered"
            );
        }

        self.registrations.push(registration.clone());
        registration
    }

    fn install(&mut self, registration: &Registration) {
        let scorer = GenericScorer::new(registration.activity.clone(), registration.policy.clone());
        self.scorers
            .insert(registration.activity.clone(), Arc::new(scorer));
        self.declared
            .insert(registration.activity.clone(), registration.coefficient);
    }

    pub fn declared(&self) -> &CoefficientMap {
        &self.declared
    }

    pub fn scorer(&self, activity: &ActivityKey) -> Option<Arc<dyn ActivityScorer>> {
        self.scorers.get(activity).cloned()
    }

    pub fn contains(&self, activity: &ActivityKey) -> bool {
        self.scorers.contains_key(activity)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(columns: &[&str], coefficient: f64) -> ExtensionDescriptor {
        ExtensionDescriptor {
            importance_coefficient: Some(coefficient),
            key_columns: columns.iter().map(|column| column.to_string()).collect(),
            population_normalization: true,
            category_coefficient: true,
        }
    }

    #[test]
    fn valid_descriptor_installs_its_policy() {
        let mut registry = ExtensionRegistry::default();
        let registration = registry.register(
            ActivityKey::new("youth_events"),
            &descriptor(&["EVENTS", "ATTENDEES"], 2.0),
            2.5,
        );

        assert!(registration.is_clean());
        assert!(!registration.fail_closed);
        assert_eq!(registration.coefficient, 2.5);
        assert_eq!(registration.policy.key_column.as_deref(), Some("EVENTS"));
        assert!(registration.policy.population_normalization);
        assert!(registry.contains(&ActivityKey::new("youth_events")));
        assert_eq!(registry.declared().get(&ActivityKey::new("youth_events")), Some(2.5));
        assert_eq!(registry.declared().total(), 12.5);
    }

    #[test]
    fn invalid_operator_coefficient_falls_back_to_descriptor() {
        let mut registry = ExtensionRegistry::default();
        let registration = registry.register(
            ActivityKey::new("youth_events"),
            &descriptor(&["EVENTS"], 3.0),
            0.0,
        );

        assert!(registration.fail_closed);
        assert_eq!(registration.coefficient, 3.0);
        assert_eq!(registration.policy, GenericPolicy::default());
        assert_eq!(
            registration.problems,
            vec![ValidationError::NonPositiveCoefficient { value: 0.0 }]
        );
    }

    #[test]
    fn everything_invalid_uses_fallback_coefficient() {
        let mut registry = ExtensionRegistry::default();
        let registration = registry.register(
            ActivityKey::new("youth_events"),
            &descriptor(&[" "], -1.0),
            f64::NAN,
        );

        assert!(registration.fail_closed);
        assert!(registration.installed);
        assert_eq!(registration.coefficient, FALLBACK_COEFFICIENT);
        assert_eq!(registration.problems.len(), 3);
        assert!(registration
            .problems
            .contains(&ValidationError::EmptyKeyColumns));
    }

    #[test]
    fn descriptor_without_importance_coefficient_fails_closed() {
        let descriptor =
            ExtensionDescriptor::from_json(r#"{"key_columns": ["ETKİNLİK"]}"#).expect("parses");
        assert_eq!(descriptor.importance_coefficient, None);

        let mut registry = ExtensionRegistry::default();
        let registration = registry.register(ActivityKey::new("youth_events"), &descriptor, 2.0);
        assert!(registration.fail_closed);
        assert_eq!(registration.coefficient, 2.0);
        assert_eq!(
            registration.problems,
            vec![ValidationError::MissingDescriptorCoefficient]
        );
    }

    #[test]
    fn default_registration_records_no_problems() {
        let mut registry = ExtensionRegistry::default();
        let registration = registry.register_default(ActivityKey::new("youth_events"), 0.0);
        assert!(registration.is_clean());
        assert!(!registration.fail_closed);
        assert_eq!(registration.coefficient, FALLBACK_COEFFICIENT);
        assert_eq!(registration.policy, GenericPolicy::default());
        assert!(registry.contains(&ActivityKey::new("youth_events")));
    }

    #[test]
    fn unreadable_descriptor_installs_default_policy() {
        let mut registry = ExtensionRegistry::default();
        let registration =
            registry.register_unreadable(ActivityKey::new("clubs"), "expected value at line 1", 1.5);
        assert!(registration.installed);
        assert!(registration.fail_closed);
        assert_eq!(registration.coefficient, 1.5);
        assert!(matches!(
            registration.problems.as_slice(),
            [ValidationError::UnreadableDescriptor { .. }]
        ));
        assert_eq!(registry.declared().get(&ActivityKey::new("clubs")), Some(1.5));
    }

    #[test]
    fn builtin_keys_are_reserved() {
        let mut registry = ExtensionRegistry::default();
        let registration =
            registry.register(ActivityKey::membership(), &descriptor(&["X"], 1.0), 9.0);

        assert!(!registration.installed);
        assert_eq!(registry.declared().get(&ActivityKey::membership()), Some(4.0));
        assert_eq!(registry.registrations().len(), 1);
    }

    #[test]
    fn descriptor_json_ignores_free_text_fields() {
        let descriptor = ExtensionDescriptor::from_json(
            r#"{
                "importance_coefficient": 1.5,
                "key_columns": ["ETKİNLİK SAYISI"],
                "population_normalization": true,
                "scoring_methodology": "events per capita",
                "calculation_logic": "def score(row): ..."
            }"#,
        )
        .expect("descriptor parses");

        assert_eq!(descriptor.importance_coefficient, Some(1.5));
        assert_eq!(descriptor.key_columns, vec!["ETKİNLİK SAYISI".to_string()]);
        assert!(descriptor.population_normalization);
        assert!(!descriptor.category_coefficient);
    }

    #[test]
    fn with_builtins_honors_overrides() {
        let overrides: CoefficientMap = [
            (ActivityKey::council(), 5.0),
            (ActivityKey::new("youth_events"), 2.0),
        ]
        .into_iter()
        .collect();
        let registry = ExtensionRegistry::with_builtins(overrides);
        assert_eq!(registry.declared().get(&ActivityKey::council()), Some(5.0));
        assert_eq!(registry.declared().get(&ActivityKey::membership()), Some(4.0));
        assert_eq!(registry.declared().get(&ActivityKey::new("youth_events")), Some(2.0));
        assert!(!registry.contains(&ActivityKey::new("youth_events")));
    }
}
