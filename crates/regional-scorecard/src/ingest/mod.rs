//! Loading activity tables, population figures and extension descriptors
//! from CSV/JSON sources.

mod mapping;
mod normalizer;
mod parser;

pub use mapping::{activity_for_name, classify_file_stem, slugify, DataFileKind};
pub use normalizer::{is_known_province, normalize_province};

use crate::scoring::{
    ActivityKey, ActivityTable, BatchInput, ExtensionDescriptor, PopulationTable,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DESCRIPTOR_SUFFIX: &str = "_config.json";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid extension descriptor {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One `<activity>_config.json` file. An unreadable or malformed file keeps
/// its error message so the activity can fail closed on its own.
#[derive(Debug, Clone)]
pub struct ExtensionFile {
    pub activity: ActivityKey,
    pub path: PathBuf,
    pub descriptor: Result<ExtensionDescriptor, String>,
}

/// Parses one activity table.
pub fn read_activity_table<R: Read>(reader: R) -> Result<ActivityTable, IngestError> {
    Ok(parser::parse_activity_table(reader)?)
}

/// Parses a population file (`İL`, `NÜFUS`).
pub fn read_population<R: Read>(
    reader: R,
    default_population: u64,
) -> Result<PopulationTable, IngestError> {
    Ok(parser::parse_population(reader, default_population)?)
}

/// Builds batch inputs from a data folder or from in-memory CSV payloads.
#[derive(Debug, Clone, Copy)]
pub struct DataFolderImporter {
    default_population: u64,
}

impl Default for DataFolderImporter {
    fn default() -> Self {
        Self::new(crate::scoring::DEFAULT_POPULATION)
    }
}

impl DataFolderImporter {
    pub fn new(default_population: u64) -> Self {
        Self { default_population }
    }

    /// Reads every `*.csv` file of `dir`. Files that fail to parse are
    /// recorded as load failures and the run carries on without them.
    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<BatchInput, IngestError> {
        let dir = dir.as_ref();
        let mut paths = csv_files(dir)?;
        paths.sort();

        let mut input = BatchInput::new(PopulationTable::new(self.default_population));
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            let file = fs::File::open(&path).map_err(|source| IngestError::Io {
                path: path.clone(),
                source,
            })?;

            match classify_file_stem(stem) {
                DataFileKind::Population => {
                    match parser::parse_population(file, self.default_population) {
                        Ok(population) => {
                            debug!(file = %path.display(), regions = population.len(), "population loaded");
                            input.population = population;
                        }
                        Err(err) => {
                            warn!(file = %path.display(), error = %err, "population file skipped");
                        }
                    }
                }
                DataFileKind::Activity(activity) => {
                    self.add_table(&mut input, activity, &path.display().to_string(), file)
                }
            }
        }

        info!(
            dir = %dir.display(),
            tables = input.tables.len(),
            failures = input.load_failures.len(),
            populations = input.population.len(),
            "data folder loaded"
        );
        Ok(input)
    }

    /// Same as [`load_dir`](Self::load_dir) for CSV text keyed by activity or
    /// file name. Names are mapped the way file stems are.
    pub fn from_payloads<I, N, C>(&self, tables: I, population_csv: Option<&str>) -> BatchInput
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let population = match population_csv {
            Some(csv) => parser::parse_population(csv.as_bytes(), self.default_population)
                .unwrap_or_else(|err| {
                    warn!(error = %err, "population payload skipped, using default population");
                    PopulationTable::new(self.default_population)
                }),
            None => PopulationTable::new(self.default_population),
        };

        let mut input = BatchInput::new(population);
        for (name, csv) in tables {
            let name = name.as_ref();
            let name = name.strip_suffix(".csv").unwrap_or(name);
            let activity = activity_for_name(name);
            self.add_table(&mut input, activity, name, csv.as_ref().as_bytes());
        }
        input
    }

    fn add_table<R: Read>(
        &self,
        input: &mut BatchInput,
        activity: ActivityKey,
        source: &str,
        reader: R,
    ) {
        if input.has_source(&activity) {
            warn!(%activity, source, "activity already supplied, duplicate source ignored");
            input.record_duplicate(activity, source);
            return;
        }
        match parser::parse_activity_table(reader) {
            Ok(table) => {
                debug!(%activity, source, rows = table.rows().len(), "activity table loaded");
                input.insert_table(activity, table);
            }
            Err(err) => {
                warn!(%activity, source, error = %err, "activity table skipped");
                input.record_failure(activity, err.to_string());
            }
        }
    }

    /// Reads `<activity>_config.json` descriptors from an extensions folder.
    /// A missing folder yields no descriptors. Only failing to list the
    /// folder is an error; bad files are reported per activity.
    pub fn load_extensions<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<Vec<ExtensionFile>, IngestError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no extensions folder");
            return Ok(Vec::new());
        }

        let mut descriptors = Vec::new();
        for path in dir_entries(dir)? {
            let Some(activity) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(DESCRIPTOR_SUFFIX))
                .map(activity_for_name)
            else {
                continue;
            };

            let descriptor = read_descriptor(&path).map_err(|err| err.to_string());
            if let Err(message) = &descriptor {
                warn!(%activity, file = %path.display(), error = %message, "extension descriptor unusable");
            }
            descriptors.push(ExtensionFile {
                activity,
                path,
                descriptor,
            });
        }

        descriptors.sort_by(|a, b| a.activity.cmp(&b.activity));
        info!(dir = %dir.display(), count = descriptors.len(), "extension descriptors loaded");
        Ok(descriptors)
    }
}

fn read_descriptor(path: &Path) -> Result<ExtensionDescriptor, IngestError> {
    let raw = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ExtensionDescriptor::from_json(&raw).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    Ok(dir_entries(dir)?
        .into_iter()
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect())
}

fn dir_entries(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let io_error = |source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}
