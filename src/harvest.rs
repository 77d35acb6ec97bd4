//! Batch harvesting of several CSV exports.
//!
//! Every input is parsed on its own: a file with a bad header or a malformed
//! row is recorded as a failure and the remaining files are still harvested.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    assemble::{EntityDict, StoreOptions, Users},
    config::HarvestConfig,
    io_utils,
    parser::{CsvParser, ParserOptions},
    records::RawDatafileRecord,
};

/// Resolved settings for one batch run.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub options: ParserOptions,
    pub store: StoreOptions,
    pub users: Option<Users>,
    pub processed_files: HashSet<String>,
}

impl HarvestPlan {
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        Ok(Self {
            options: config.parser_options()?,
            store: config.store_options(),
            users: config.users().cloned(),
            processed_files: config.processed_files.iter().cloned().collect(),
        })
    }

    fn already_ingested(&self, record: &RawDatafileRecord) -> bool {
        if self.processed_files.is_empty() {
            return false;
        }
        let joined = Path::new(&record.relative_path).join(&record.file_name);
        self.processed_files.contains(&record.file_name)
            || self
                .processed_files
                .contains(joined.to_string_lossy().as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHarvest {
    pub source: PathBuf,
    pub sha256: String,
    pub experiments: Vec<EntityDict>,
    pub datasets: Vec<EntityDict>,
    pub datafiles: Vec<EntityDict>,
    /// Datafiles omitted because an earlier run already ingested them.
    pub skipped_datafiles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestFailure {
    pub source: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub generated_at: DateTime<Utc>,
    pub files: Vec<FileHarvest>,
    pub failures: Vec<HarvestFailure>,
}

impl HarvestReport {
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let rendered = serde_json::to_string_pretty(self).context("Serializing harvest report")?;
        match path {
            Some(p) if !io_utils::is_dash(p) => {
                fs::write(p, rendered).with_context(|| format!("Writing harvest report {p:?}"))
            }
            _ => {
                println!("{rendered}");
                Ok(())
            }
        }
    }
}

/// Lists CSV/TSV files directly under `root`, sorted by name, skipping the
/// names listed in `processed`.
pub fn discover_inputs(root: &Path, processed: &[String]) -> Result<Vec<PathBuf>> {
    let processed: HashSet<&str> = processed.iter().map(String::as_str).collect();
    let entries = fs::read_dir(root).with_context(|| format!("Listing directory {root:?}"))?;
    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Listing directory {root:?}"))?.path();
        if !path.is_file() {
            continue;
        }
        let is_table = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv"));
        if !is_table {
            continue;
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if processed.contains(name.as_str()) {
            info!("Skipping previously processed {path:?}");
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();
    Ok(inputs)
}

/// Parses one export and assembles its three dictionary lists.
pub fn harvest_file(path: &Path, plan: &HarvestPlan) -> Result<FileHarvest> {
    let bytes = fs::read(path).with_context(|| format!("Opening input file {path:?}"))?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let delimiter = io_utils::resolve_input_delimiter(path, plan.options.delimiter);
    let options = plan.options.clone().with_delimiter(delimiter);
    let parser = CsvParser::from_reader(bytes.as_slice(), &options)
        .with_context(|| format!("Parsing {path:?}"))?;

    let all_datafiles = parser.datafile_dicts(Some(plan.store.in_store), Some(&plan.store.bucket));
    let total = all_datafiles.len();
    let datafiles: Vec<EntityDict> = parser
        .datafiles()
        .iter()
        .zip(all_datafiles)
        .filter(|(record, _)| !plan.already_ingested(record))
        .map(|(_, dict)| dict)
        .collect();

    Ok(FileHarvest {
        source: path.to_path_buf(),
        sha256,
        experiments: parser.experiment_dicts(plan.users.as_ref()),
        datasets: parser.dataset_dicts(),
        skipped_datafiles: total - datafiles.len(),
        datafiles,
    })
}

/// Harvests every input, collecting failures instead of stopping at them.
pub fn run(plan: &HarvestPlan, inputs: &[PathBuf]) -> HarvestReport {
    let mut files = Vec::new();
    let mut failures = Vec::new();
    for input in inputs {
        match harvest_file(input, plan) {
            Ok(harvest) => {
                info!(
                    "✓ {:?}: {} experiment(s), {} dataset(s), {} datafile(s) ({} already ingested)",
                    input,
                    harvest.experiments.len(),
                    harvest.datasets.len(),
                    harvest.datafiles.len(),
                    harvest.skipped_datafiles
                );
                files.push(harvest);
            }
            Err(err) => {
                error!("✗ {input:?}: {err:#}");
                failures.push(HarvestFailure {
                    source: input.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }
    HarvestReport {
        generated_at: Utc::now(),
        files,
        failures,
    }
}

/// Resolves the inputs for a run: the explicit list when given, otherwise the
/// tables discovered under the configured `root_dir`.
pub fn resolve_inputs(config: &HarvestConfig, explicit: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }
    let root = config
        .root_dir
        .as_deref()
        .ok_or_else(|| anyhow!("No inputs given and the config does not set root_dir"))?;
    discover_inputs(root, &config.processed_csvs)
}
