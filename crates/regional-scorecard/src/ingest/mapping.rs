use crate::scoring::ActivityKey;
use crate::text::ascii_fold;

/// What a data file in the input folder holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataFileKind {
    Population,
    Activity(ActivityKey),
}

const POPULATION_NAMES: &[&str] = &["il_ilce_nufus", "nufus", "population"];

/// Exact slugs of the file stems and keys served by built-in scorers.
const ACTIVITY_NAMES: &[(&str, &str)] = &[
    ("uyelik", ActivityKey::MEMBERSHIP),
    ("membership", ActivityKey::MEMBERSHIP),
    ("danisma_meclisi", ActivityKey::COUNCIL),
    ("council", ActivityKey::COUNCIL),
    ("ramazan_calismalari", ActivityKey::SEASONAL),
    ("seasonal", ActivityKey::SEASONAL),
    ("bayrak_calismasi", ActivityKey::SYMBOL),
    ("symbol", ActivityKey::SYMBOL),
];

/// Classifies a data file by its stem, e.g. `Danışma_Meclisi` or `il_ilçe_nüfus`.
pub fn classify_file_stem(stem: &str) -> DataFileKind {
    let slug = slugify(stem);
    if POPULATION_NAMES.contains(&slug.as_str()) {
        return DataFileKind::Population;
    }
    DataFileKind::Activity(activity_for_name(stem))
}

/// Activity key for a file stem or free-form activity name. Only the exact
/// built-in stems map to built-in keys; every other name becomes its slug.
pub fn activity_for_name(name: &str) -> ActivityKey {
    let slug = slugify(name);
    ACTIVITY_NAMES
        .iter()
        .find(|(known, _)| *known == slug)
        .map(|(_, key)| ActivityKey::new(*key))
        .unwrap_or_else(|| ActivityKey::new(slug))
}

/// Lowercase ASCII slug with `_` separators.
pub fn slugify(name: &str) -> String {
    let folded = ascii_fold(name.trim()).to_lowercase();
    let mut slug = String::with_capacity(folded.len());
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}
