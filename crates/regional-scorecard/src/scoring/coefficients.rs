use super::activity::ActivityKey;
use crate::ingest::activity_for_name;
use super::{ScoringError, POINTS_PER_COEFFICIENT};
use serde::Serialize;
use std::collections::BTreeSet;

const TOTAL_TOLERANCE: f64 = 1e-9;

/// Declared importance coefficients in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoefficientMap {
    entries: Vec<(ActivityKey, f64)>,
}

impl CoefficientMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default weighting of the four built-in activities.
    pub fn defaults() -> Self {
        let mut map = Self::new();
        map.insert(ActivityKey::membership(), 4.0);
        map.insert(ActivityKey::council(), 3.0);
        map.insert(ActivityKey::seasonal(), 2.0);
        map.insert(ActivityKey::symbol(), 1.0);
        map
    }

    /// Inserts or replaces a coefficient, keeping the original position on
    /// replacement.
    pub fn insert(&mut self, activity: ActivityKey, coefficient: f64) -> Option<f64> {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == activity) {
            return Some(std::mem::replace(&mut entry.1, coefficient));
        }
        self.entries.push((activity, coefficient));
        None
    }

    pub fn get(&self, activity: &ActivityKey) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == activity)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, activity: &ActivityKey) -> bool {
        self.get(activity).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActivityKey, f64)> {
        self.entries.iter().map(|(key, value)| (key, *value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ActivityKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, value)| value).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ActivityKey, f64)> for CoefficientMap {
    fn from_iter<T: IntoIterator<Item = (ActivityKey, f64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Parses a `key=value` coefficient assignment. Keys are mapped like data
/// file names, so `Üyelik=5` targets membership.
pub fn parse_assignment(raw: &str) -> Result<(ActivityKey, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing activity name in '{raw}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("coefficient for '{key}' must be a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("coefficient for '{key}' must be positive"));
    }
    let activity = activity_for_name(key);
    if activity.as_str().is_empty() {
        return Err(format!("'{key}' does not name an activity"));
    }
    Ok((activity, value))
}

/// How one present activity's coefficient was raised to absorb missing weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reallocation {
    pub activity: ActivityKey,
    pub declared: f64,
    pub share: f64,
    pub effective: f64,
}

/// Coefficients actually used for a run, covering available activities only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveCoefficients {
    reallocations: Vec<Reallocation>,
    declared_total: f64,
    missing_total: f64,
}

impl EffectiveCoefficients {
    pub fn get(&self, activity: &ActivityKey) -> Option<f64> {
        self.reallocations
            .iter()
            .find(|entry| entry.activity == *activity)
            .map(|entry| entry.effective)
    }

    /// Maximum raw points an activity can award in this run.
    pub fn max_score(&self, activity: &ActivityKey) -> Option<f64> {
        self.get(activity)
            .map(|coefficient| coefficient * POINTS_PER_COEFFICIENT)
    }

    pub fn weight_pct(&self, activity: &ActivityKey) -> Option<f64> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        self.get(activity).map(|value| value / total * 100.0)
    }

    pub fn total(&self) -> f64 {
        self.reallocations.iter().map(|entry| entry.effective).sum()
    }

    pub fn declared_total(&self) -> f64 {
        self.declared_total
    }

    pub fn missing_total(&self) -> f64 {
        self.missing_total
    }

    pub fn reallocations(&self) -> &[Reallocation] {
        &self.reallocations
    }

    pub fn activities(&self) -> impl Iterator<Item = &ActivityKey> {
        self.reallocations.iter().map(|entry| &entry.activity)
    }

    pub fn len(&self) -> usize {
        self.reallocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reallocations.is_empty()
    }
}

/// Moves the declared weight of unavailable activities onto the available
/// ones, proportionally to their declared coefficients.
pub fn redistribute(
    declared: &CoefficientMap,
    available: &BTreeSet<ActivityKey>,
) -> Result<EffectiveCoefficients, ScoringError> {
    let present: Vec<(&ActivityKey, f64)> = declared
        .iter()
        .filter(|(key, _)| available.contains(*key))
        .collect();

    let present_total: f64 = present.iter().map(|(_, value)| value).sum();
    if present.is_empty() || present_total <= 0.0 {
        return Err(ScoringError::NoActivityData);
    }

    let declared_total = declared.total();
    let missing_total = declared_total - present_total;

    let reallocations: Vec<Reallocation> = present
        .into_iter()
        .map(|(key, value)| {
            let share = missing_total * value / present_total;
            Reallocation {
                activity: key.clone(),
                declared: value,
                share,
                effective: value + share,
            }
        })
        .collect();

    let effective = EffectiveCoefficients {
        reallocations,
        declared_total,
        missing_total,
    };

    debug_assert!(
        (effective.total() - declared_total).abs() <= TOTAL_TOLERANCE * declared_total.max(1.0),
        "redistribution must preserve the declared total"
    );

    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(keys: &[&str]) -> BTreeSet<ActivityKey> {
        keys.iter().map(|key| ActivityKey::new(*key)).collect()
    }

    #[test]
    fn all_available_keeps_declared_values() {
        let declared = CoefficientMap::defaults();
        let effective = redistribute(
            &declared,
            &available(&["membership", "council", "seasonal", "symbol"]),
        )
        .expect("redistributes");

        assert_eq!(effective.get(&ActivityKey::membership()), Some(4.0));
        assert_eq!(effective.missing_total(), 0.0);
        assert_eq!(effective.total(), 10.0);
    }

    #[test]
    fn missing_symbol_spreads_its_weight() {
        let declared = CoefficientMap::defaults();
        let effective = redistribute(&declared, &available(&["membership", "council", "seasonal"]))
            .expect("redistributes");

        let membership = effective.get(&ActivityKey::membership()).expect("membership");
        let council = effective.get(&ActivityKey::council()).expect("council");
        let seasonal = effective.get(&ActivityKey::seasonal()).expect("seasonal");
        assert!((membership - 40.0 / 9.0).abs() < 1e-9);
        assert!((council - 30.0 / 9.0).abs() < 1e-9);
        assert!((seasonal - 20.0 / 9.0).abs() < 1e-9);
        assert!((effective.total() - 10.0).abs() < 1e-9);
        assert!(effective.get(&ActivityKey::symbol()).is_none());
    }

    #[test]
    fn single_available_activity_takes_everything() {
        let declared = CoefficientMap::defaults();
        let effective =
            redistribute(&declared, &available(&["symbol"])).expect("redistributes");
        assert!((effective.get(&ActivityKey::symbol()).expect("symbol") - 10.0).abs() < 1e-9);
        assert!((effective.weight_pct(&ActivityKey::symbol()).expect("weight") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn preserves_total_for_every_subset() {
        let declared = CoefficientMap::defaults();
        let keys: Vec<ActivityKey> = declared.keys().cloned().collect();
        for mask in 1u32..16 {
            let subset: BTreeSet<ActivityKey> = keys
                .iter()
                .enumerate()
                .filter(|(index, _)| mask & (1 << index) != 0)
                .map(|(_, key)| key.clone())
                .collect();
            let effective = redistribute(&declared, &subset).expect("redistributes");
            assert!((effective.total() - declared.total()).abs() < 1e-9);
            let weights: f64 = effective
                .activities()
                .filter_map(|key| effective.weight_pct(key))
                .sum();
            assert!((weights - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn redistribution_is_idempotent() {
        let declared = CoefficientMap::defaults();
        let subset = available(&["membership", "seasonal"]);
        let first = redistribute(&declared, &subset).expect("first run");
        let second = redistribute(&declared, &subset).expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn nothing_available_is_fatal() {
        let declared = CoefficientMap::defaults();
        let error = redistribute(&declared, &BTreeSet::new()).expect_err("no data");
        assert_eq!(error, ScoringError::NoActivityData);
    }

    #[test]
    fn parse_assignment_accepts_key_value_pairs() {
        let (key, value) = parse_assignment("Youth_Events = 2.5").expect("parses");
        assert_eq!(key.as_str(), "youth_events");
        assert_eq!(value, 2.5);
        assert!(parse_assignment("membership").is_err());
        assert!(parse_assignment("membership=-1").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn assignment_keys_match_file_name_mapping() {
        let (key, _) = parse_assignment("uyelik=5").expect("parses");
        assert_eq!(key, ActivityKey::membership());
        let (key, _) = parse_assignment("Youth Events=2").expect("parses");
        assert_eq!(key.as_str(), "youth_events");
        let (key, _) = parse_assignment("Danışma_Meclisi=3").expect("parses");
        assert_eq!(key, ActivityKey::council());
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map = CoefficientMap::defaults();
        assert_eq!(map.insert(ActivityKey::council(), 5.0), Some(3.0));
        let keys: Vec<&str> = map.keys().map(ActivityKey::as_str).collect();
        assert_eq!(keys, vec!["membership", "council", "seasonal", "symbol"]);
        assert_eq!(map.total(), 12.0);
    }
}
