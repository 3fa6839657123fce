use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Header used by the upstream exports for the region (province) column.
pub const REGION_COLUMN: &str = "İL";

/// Row label the exports use for their grand total line.
pub const AGGREGATE_ROW: &str = "TOPLAM";

/// Population assumed for regions missing from the population table.
pub const DEFAULT_POPULATION: u64 = 500_000;

const REGION_COLUMN_CANDIDATES: &[&str] = &[
    REGION_COLUMN,
    "IL",
    "Il",
    "İl",
    "il",
    "PROVINCE",
    "Province",
    "province",
];

/// Identifier of an activity category, e.g. `membership` or a slug derived
/// from an operator supplied data file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityKey(String);

impl ActivityKey {
    pub const MEMBERSHIP: &'static str = "membership";
    pub const COUNCIL: &'static str = "council";
    pub const SEASONAL: &'static str = "seasonal";
    pub const SYMBOL: &'static str = "symbol";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn membership() -> Self {
        Self::new(Self::MEMBERSHIP)
    }

    pub fn council() -> Self {
        Self::new(Self::COUNCIL)
    }

    pub fn seasonal() -> Self {
        Self::new(Self::SEASONAL)
    }

    pub fn symbol() -> Self {
        Self::new(Self::SYMBOL)
    }

    /// Keys served by a dedicated scorer rather than a descriptor.
    pub fn builtins() -> [Self; 4] {
        [
            Self::membership(),
            Self::council(),
            Self::seasonal(),
            Self::symbol(),
        ]
    }

    pub fn is_builtin(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::MEMBERSHIP | Self::COUNCIL | Self::SEASONAL | Self::SYMBOL
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One record of an activity table. Cells stay raw; scorers coerce on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityRow {
    pub region: String,
    cells: HashMap<String, String>,
}

impl ActivityRow {
    pub fn new(region: impl Into<String>, cells: HashMap<String, String>) -> Self {
        Self {
            region: region.into(),
            cells,
        }
    }

    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Coerced numeric value of a cell; missing or malformed cells read as 0.
    pub fn number(&self, column: &str) -> f64 {
        self.cell(column).map(parse_number).unwrap_or(0.0)
    }
}

/// Rows of one activity keyed by region name, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTable {
    region_column: String,
    columns: Vec<String>,
    rows: Vec<ActivityRow>,
}

impl ActivityTable {
    /// Builds a table from a header and raw records. Records whose region cell
    /// is blank or the aggregate marker are dropped.
    pub fn from_records<H, R, C>(headers: H, records: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let columns: Vec<String> = headers.into_iter().map(Into::into).collect();
        let region_index = region_column_index(&columns);
        let region_column = region_index
            .map(|index| columns[index].clone())
            .unwrap_or_default();

        let mut rows = Vec::new();
        for record in records {
            let values: Vec<String> = record.into_iter().map(Into::into).collect();
            let Some(index) = region_index else {
                continue;
            };
            let region = values
                .get(index)
                .map(|value| value.trim().to_string())
                .unwrap_or_default();
            if region.is_empty() || is_aggregate_row(&region) {
                continue;
            }

            let cells = columns
                .iter()
                .cloned()
                .zip(values.into_iter().chain(std::iter::repeat(String::new())))
                .collect();
            rows.push(ActivityRow::new(region, cells));
        }

        Self {
            region_column,
            columns,
            rows,
        }
    }

    pub fn region_column(&self) -> &str {
        &self.region_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ActivityRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| candidate == column)
    }

    /// First column that is not the region column.
    pub fn first_data_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .find(|column| *column != self.region_column)
    }

    /// Distinct region names in order of first appearance.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.region.as_str()) {
                seen.push(row.region.as_str());
            }
        }
        seen
    }

    /// The first row recorded for every region.
    pub fn first_rows(&self) -> Vec<&ActivityRow> {
        self.regions()
            .into_iter()
            .filter_map(|region| self.rows.iter().find(|row| row.region == region))
            .collect()
    }

    /// All rows of every region, grouped in order of first appearance.
    pub fn grouped(&self) -> Vec<(&str, Vec<&ActivityRow>)> {
        self.regions()
            .into_iter()
            .map(|region| {
                let rows = self.rows.iter().filter(|row| row.region == region).collect();
                (region, rows)
            })
            .collect()
    }
}

/// Region name to resident count, with a fallback for unknown regions.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationTable {
    entries: HashMap<String, u64>,
    default_population: u64,
}

impl Default for PopulationTable {
    fn default() -> Self {
        Self::new(DEFAULT_POPULATION)
    }
}

impl PopulationTable {
    pub fn new(default_population: u64) -> Self {
        Self {
            entries: HashMap::new(),
            default_population,
        }
    }

    pub fn insert(&mut self, region: impl Into<String>, population: u64) {
        self.entries.insert(region.into(), population);
    }

    pub fn get(&self, region: &str) -> Option<u64> {
        self.entries.get(region).copied()
    }

    pub fn population_of(&self, region: &str) -> u64 {
        self.get(region).unwrap_or(self.default_population)
    }

    pub fn default_population(&self) -> u64 {
        self.default_population
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for PopulationTable {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut table = Self::default();
        for (region, population) in iter {
            table.insert(region, population);
        }
        table
    }
}

/// Parses a locale formatted number (`"1,234"`, `"85%"`, `"\"12\""`).
pub fn try_parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_matches(|ch| ch == '"' || ch == '\'')
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Lenient numeric coercion: anything that does not parse reads as 0.
pub fn parse_number(raw: &str) -> f64 {
    try_parse_number(raw).unwrap_or(0.0)
}

pub(crate) fn is_aggregate_row(region: &str) -> bool {
    crate::text::turkish_uppercase(region.trim()) == AGGREGATE_ROW
}

pub(crate) fn region_column_index(columns: &[String]) -> Option<usize> {
    REGION_COLUMN_CANDIDATES
        .iter()
        .find_map(|candidate| columns.iter().position(|column| column == candidate))
        .or(if columns.is_empty() { None } else { Some(0) })
}
