//! Harvest configuration files.
//!
//! A configuration names the schema namespaces, the header declarations for
//! one instrument export format, and the defaults applied when assembling
//! dictionaries. YAML is the primary format; files ending in `.json` are read
//! as JSON.
//!
//! ```yaml
//! root_dir: /data/instrument/exports
//! schemas:
//!   experiment: http://example.org/schemas/experiment
//!   dataset: http://example.org/schemas/dataset
//!   datafile: http://example.org/schemas/datafile
//! headers:
//!   experiment_id: Expt ID
//!   experiment_title: Expt Title
//!   dataset_id: Dataset ID
//!   dataset_description: Dataset Desc
//!   datafile_name: File Name
//!   rel_path: Rel Path
//!   dataset_metadata: [Instrument]
//! bucket: mytardis
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    assemble::{DEFAULT_BUCKET, SchemaNames, StoreOptions, Users},
    classify::HeaderDeclarations,
    cli::parse_delimiter,
    error::HarvestError,
    io_utils,
    parser::ParserOptions,
};

fn default_in_store() -> bool {
    true
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    pub schemas: SchemaNames,
    pub headers: HeaderDeclarations,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub users: Users,
    #[serde(default = "default_in_store")]
    pub in_store: bool,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// CSV file names that were fully ingested by an earlier run.
    #[serde(default)]
    pub processed_csvs: Vec<String>,
    /// Datafile relative paths or names that were already ingested.
    #[serde(default)]
    pub processed_files: Vec<String>,
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: HarvestConfig = if is_json {
            serde_json::from_str(&raw).context("Parsing config JSON")?
        } else {
            serde_yaml::from_str(&raw).context("Parsing config YAML")?
        };
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    /// Rejects blank namespaces and blank required header declarations.
    pub fn validate(&self) -> Result<(), HarvestError> {
        let namespaces = [
            ("experiment", &self.schemas.experiment),
            ("dataset", &self.schemas.dataset),
            ("datafile", &self.schemas.datafile),
        ];
        if let Some((scope, _)) = namespaces.iter().find(|(_, ns)| ns.trim().is_empty()) {
            return Err(HarvestError::configuration(format!(
                "{scope} schema namespace is empty"
            )));
        }
        let required = [
            ("experiment title", &self.headers.experiment_title),
            ("dataset description", &self.headers.dataset_description),
            ("datafile name", &self.headers.datafile_name),
            ("relative path", &self.headers.rel_path),
        ];
        if let Some((role, _)) = required.iter().find(|(_, header)| header.trim().is_empty()) {
            return Err(HarvestError::configuration(format!(
                "{role} header is not declared"
            )));
        }
        Ok(())
    }

    pub fn delimiter(&self) -> Result<Option<u8>> {
        self.delimiter
            .as_deref()
            .map(|value| parse_delimiter(value).map_err(|err| anyhow!("Invalid delimiter: {err}")))
            .transpose()
    }

    pub fn parser_options(&self) -> Result<ParserOptions> {
        let encoding = io_utils::resolve_encoding(self.encoding.as_deref())?;
        let mut options = ParserOptions::new(self.schemas.clone(), self.headers.clone())
            .with_encoding(encoding);
        options.delimiter = self.delimiter()?;
        options.root_dir = self.root_dir.clone();
        Ok(options)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            in_store: self.in_store,
            bucket: self.bucket.clone(),
        }
    }

    pub fn users(&self) -> Option<&Users> {
        (!self.users.is_empty()).then_some(&self.users)
    }
}
