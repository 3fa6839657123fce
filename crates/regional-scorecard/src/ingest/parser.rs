use super::normalizer::normalize_province;
use crate::scoring::activity::{is_aggregate_row, region_column_index};
use crate::scoring::{try_parse_number, ActivityTable, PopulationTable};
use crate::text::clean;
use serde::{Deserialize, Deserializer};
use std::io::Read;

pub(crate) fn parse_activity_table<R: Read>(reader: R) -> Result<ActivityTable, csv::Error> {
    let mut csv_reader = reader_builder().from_reader(reader);
    let headers = clean_headers(csv_reader.headers()?);
    let region_index = region_column_index(&headers);

    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut values: Vec<String> = record.iter().map(str::to_string).collect();
        if let Some(cell) = region_index.and_then(|index| values.get_mut(index)) {
            *cell = normalize_province(cell);
        }
        records.push(values);
    }

    Ok(ActivityTable::from_records(headers, records))
}

pub(crate) fn parse_population<R: Read>(
    reader: R,
    default_population: u64,
) -> Result<PopulationTable, csv::Error> {
    let mut csv_reader = reader_builder().from_reader(reader);
    let mut headers = clean_headers(csv_reader.headers()?);
    if let Some(index) = region_column_index(&headers) {
        headers[index] = "region".to_string();
    }
    csv_reader.set_headers(csv::StringRecord::from(headers));

    let mut table = PopulationTable::new(default_population);
    for record in csv_reader.deserialize::<PopulationRow>() {
        let row = record?;
        let Some(population) = row.population else {
            continue;
        };
        let region = normalize_province(&row.region);
        if region.is_empty() || is_aggregate_row(&region) {
            continue;
        }
        table.insert(region, population);
    }

    Ok(table)
}

#[derive(Debug, Deserialize)]
struct PopulationRow {
    region: String,
    #[serde(
        rename = "NÜFUS",
        alias = "NUFUS",
        alias = "POPULATION",
        default,
        deserialize_with = "lenient_count"
    )]
    population: Option<u64>,
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All).flexible(true);
    builder
}

fn clean_headers(headers: &csv::StringRecord) -> Vec<String> {
    headers.iter().map(clean).collect()
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .as_deref()
        .and_then(try_parse_number)
        .filter(|value| *value >= 0.0)
        .map(|value| value.round() as u64))
}
