//! The CSV parser consumed by the ingestion factory.
//!
//! Construction runs the whole pipeline eagerly: the header is classified,
//! every row is extracted, experiments and datasets are deduplicated and
//! datasets are merged. A parser therefore either exists with complete record
//! lists or was never built. The dictionary accessors are pure and can be
//! called any number of times.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};

use crate::{
    assemble::{self, EntityDict, SchemaNames, StoreOptions, Users},
    classify::{HeaderDeclarations, classify},
    dedup::dedup_consecutive,
    error::Result,
    extract::{ExtractedRecords, extract},
    io_utils,
    merge::merge_datasets,
    records::{RawDatafileRecord, RawDatasetRecord, RawExperimentRecord},
};

/// Everything a parser needs besides the table itself.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub schemas: SchemaNames,
    pub headers: HeaderDeclarations,
    /// Resolved from the file extension when `None`.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub root_dir: Option<PathBuf>,
}

impl ParserOptions {
    pub fn new(schemas: SchemaNames, headers: HeaderDeclarations) -> Self {
        Self {
            schemas,
            headers,
            delimiter: None,
            encoding: UTF_8,
            root_dir: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CsvParser {
    schemas: SchemaNames,
    root_dir: Option<PathBuf>,
    experiments: Vec<RawExperimentRecord>,
    datasets: Vec<RawDatasetRecord>,
    datafiles: Vec<RawDatafileRecord>,
}

impl CsvParser {
    pub fn from_path(path: &Path, options: &ParserOptions) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        debug!("Parsing {path:?} with delimiter {:?}", delimiter as char);
        Self::from_csv_reader(reader, options)
    }

    /// Parses a table from any reader. Without an explicit delimiter, comma is
    /// assumed.
    pub fn from_reader<R: Read>(reader: R, options: &ParserOptions) -> Result<Self> {
        let delimiter = options
            .delimiter
            .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
        Self::from_csv_reader(io_utils::open_csv_reader(reader, delimiter), options)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>, options: &ParserOptions) -> Result<Self> {
        let headers = io_utils::reader_headers(&mut reader, options.encoding)?;
        let columns = classify(&headers, &options.headers)?;
        let extracted = extract(&columns, io_utils::source_rows(reader, options.encoding))?;
        Ok(Self::from_records(
            extracted,
            options.schemas.clone(),
            options.root_dir.clone(),
        ))
    }

    fn from_records(
        extracted: ExtractedRecords,
        schemas: SchemaNames,
        root_dir: Option<PathBuf>,
    ) -> Self {
        let rows = extracted.len();
        let ExtractedRecords {
            experiments,
            datasets,
            datafiles,
        } = extracted;
        let experiments = dedup_consecutive(experiments);
        let datasets = merge_datasets(dedup_consecutive(datasets));
        info!(
            "Folded {} row(s) into {} experiment(s), {} dataset(s), {} datafile(s)",
            rows,
            experiments.len(),
            datasets.len(),
            datafiles.len()
        );
        Self {
            schemas,
            root_dir,
            experiments,
            datasets,
            datafiles,
        }
    }

    pub fn experiment_dicts(&self, users: Option<&Users>) -> Vec<EntityDict> {
        assemble::experiment_dicts(&self.experiments, &self.schemas, users)
    }

    pub fn dataset_dicts(&self) -> Vec<EntityDict> {
        assemble::dataset_dicts(&self.datasets, &self.schemas)
    }

    /// Datafile dictionaries; `in_store` defaults to `true` and `bucket` to
    /// [`assemble::DEFAULT_BUCKET`].
    pub fn datafile_dicts(&self, in_store: Option<bool>, bucket: Option<&str>) -> Vec<EntityDict> {
        let defaults = StoreOptions::default();
        let store = StoreOptions {
            in_store: in_store.unwrap_or(defaults.in_store),
            bucket: bucket.map(str::to_string).unwrap_or(defaults.bucket),
        };
        assemble::datafile_dicts(&self.datafiles, &self.schemas, &store)
    }

    pub fn experiments(&self) -> &[RawExperimentRecord] {
        &self.experiments
    }

    pub fn datasets(&self) -> &[RawDatasetRecord] {
        &self.datasets
    }

    pub fn datafiles(&self) -> &[RawDatafileRecord] {
        &self.datafiles
    }

    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }
}
