use super::activity::PopulationTable;
use serde::Serialize;
use std::collections::BTreeMap;

const MEGA_THRESHOLD: u64 = 3_000_000;
const LARGE_THRESHOLD: u64 = 1_500_000;
const MEDIUM_THRESHOLD: u64 = 500_000;

/// Population band of a region. Smaller regions receive a larger fairness
/// coefficient to offset their smaller base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionCategory {
    Mega,
    Large,
    Medium,
    Small,
}

impl RegionCategory {
    pub fn from_population(population: u64) -> Self {
        if population >= MEGA_THRESHOLD {
            Self::Mega
        } else if population >= LARGE_THRESHOLD {
            Self::Large
        } else if population >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Small
        }
    }

    pub const fn coefficient(self) -> f64 {
        match self {
            Self::Mega => 1.0,
            Self::Large => 1.08,
            Self::Medium => 1.15,
            Self::Small => 1.30,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Mega => "Mega",
            Self::Large => "Large",
            Self::Medium => "Medium",
            Self::Small => "Small",
        }
    }

    pub const fn ordered() -> [Self; 4] {
        [Self::Mega, Self::Large, Self::Medium, Self::Small]
    }
}

/// Categorization of one region, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProfile {
    pub name: String,
    pub population: u64,
    pub category: RegionCategory,
    pub coefficient: f64,
}

impl RegionProfile {
    pub fn new(name: impl Into<String>, population: u64) -> Self {
        let category = RegionCategory::from_population(population);
        Self {
            name: name.into(),
            population,
            category,
            coefficient: category.coefficient(),
        }
    }
}

/// Every region of a run, categorized once up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCatalog {
    profiles: BTreeMap<String, RegionProfile>,
    default_population: u64,
}

impl RegionCatalog {
    pub fn build<'a, I>(names: I, population: &PopulationTable) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let profiles = names
            .into_iter()
            .map(|name| {
                let profile = RegionProfile::new(name, population.population_of(name));
                (name.to_string(), profile)
            })
            .collect();

        Self {
            profiles,
            default_population: population.default_population(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegionProfile> {
        self.profiles.get(name)
    }

    /// Profile of `name`, categorizing it with the default population when the
    /// region was not part of the catalog.
    pub fn profile_or_default(&self, name: &str) -> RegionProfile {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| RegionProfile::new(name, self.default_population))
    }

    pub fn coefficient(&self, name: &str) -> f64 {
        self.get(name)
            .map(|profile| profile.coefficient)
            .unwrap_or_else(|| RegionCategory::from_population(self.default_population).coefficient())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::activity::DEFAULT_POPULATION;

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(RegionCategory::from_population(3_000_000), RegionCategory::Mega);
        assert_eq!(RegionCategory::from_population(2_999_999), RegionCategory::Large);
        assert_eq!(RegionCategory::from_population(1_500_000), RegionCategory::Large);
        assert_eq!(RegionCategory::from_population(1_499_999), RegionCategory::Medium);
        assert_eq!(RegionCategory::from_population(500_000), RegionCategory::Medium);
        assert_eq!(RegionCategory::from_population(499_999), RegionCategory::Small);
        assert_eq!(RegionCategory::from_population(0), RegionCategory::Small);
    }

    #[test]
    fn coefficients_grow_as_regions_shrink() {
        let coefficients: Vec<f64> = RegionCategory::ordered()
            .into_iter()
            .map(RegionCategory::coefficient)
            .collect();
        assert_eq!(coefficients, vec![1.0, 1.08, 1.15, 1.30]);
    }

    #[test]
    fn missing_population_defaults_to_medium() {
        let population = PopulationTable::default();
        let catalog = RegionCatalog::build(["BAYBURT"], &population);
        let profile = catalog.get("BAYBURT").expect("profile present");
        assert_eq!(profile.population, DEFAULT_POPULATION);
        assert_eq!(profile.category, RegionCategory::Medium);
        assert_eq!(profile.coefficient, 1.15);
        assert_eq!(catalog.coefficient("UNKNOWN"), 1.15);
    }

    #[test]
    fn catalog_uses_population_table() {
        let population: PopulationTable = [("İSTANBUL", 15_600_000u64), ("KİLİS", 145_000)]
            .into_iter()
            .collect();
        let catalog = RegionCatalog::build(["İSTANBUL", "KİLİS"], &population);
        assert_eq!(
            catalog.get("İSTANBUL").map(|p| p.category),
            Some(RegionCategory::Mega)
        );
        assert_eq!(catalog.coefficient("KİLİS"), 1.30);
        assert_eq!(catalog.len(), 2);
    }
}
