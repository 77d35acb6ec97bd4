//! Projection of folded records into the flat dictionaries handed to the
//! ingestion factory.
//!
//! Experiment and dataset dictionaries keep empty values so that a missing
//! required field is still visible to downstream validation. Datafile
//! dictionaries drop every empty string value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::records::{Metadata, RawDatafileRecord, RawDatasetRecord, RawExperimentRecord};

pub type EntityDict = Map<String, Value>;

/// Access grants attached to every experiment, keyed by user name.
pub type Users = Map<String, Value>;

pub const DEFAULT_BUCKET: &str = "mytardis";

/// Schema namespace identifiers for each object level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNames {
    pub experiment: String,
    pub dataset: String,
    pub datafile: String,
}

/// Storage details attached to datafile dictionaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub in_store: bool,
    pub bucket: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            in_store: true,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

fn extend_with_metadata(dict: &mut EntityDict, metadata: &Metadata) {
    dict.extend(
        metadata
            .iter()
            .map(|(key, value)| (key.clone(), text(value))),
    );
}

pub fn experiment_dict(
    record: &RawExperimentRecord,
    namespace: &str,
    users: Option<&Users>,
) -> EntityDict {
    let mut dict = EntityDict::new();
    dict.insert("title".to_string(), text(&record.title));
    dict.insert("internal_id".to_string(), text(&record.internal_id));
    dict.insert("schema_namespace".to_string(), text(namespace));
    extend_with_metadata(&mut dict, &record.metadata);
    if let Some(users) = users.filter(|users| !users.is_empty()) {
        dict.insert("users".to_string(), Value::Object(users.clone()));
    }
    dict
}

pub fn dataset_dict(record: &RawDatasetRecord, namespace: &str) -> EntityDict {
    let mut dict = EntityDict::new();
    dict.insert("internal_id".to_string(), text(&record.internal_id));
    dict.insert("dataset_id".to_string(), text(&record.dataset_id));
    dict.insert("description".to_string(), text(&record.description));
    dict.insert("schema_namespace".to_string(), text(namespace));
    extend_with_metadata(&mut dict, &record.metadata);
    dict
}

pub fn datafile_dict(record: &RawDatafileRecord, namespace: &str, store: &StoreOptions) -> EntityDict {
    let mut dict = EntityDict::new();
    dict.insert("file_name".to_string(), text(&record.file_name));
    dict.insert("rel_path".to_string(), text(&record.relative_path));
    dict.insert("dataset_id".to_string(), text(&record.dataset_id));
    dict.insert("in_store".to_string(), Value::Bool(store.in_store));
    dict.insert("schema_namespace".to_string(), text(namespace));
    if store.in_store {
        let s3_path = record
            .remote_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .unwrap_or(&record.relative_path);
        dict.insert("s3_path".to_string(), text(s3_path));
        dict.insert("bucket".to_string(), text(&store.bucket));
    }
    extend_with_metadata(&mut dict, &record.metadata);
    dict.retain(|_, value| value.as_str() != Some(""));
    dict
}

pub fn experiment_dicts(
    records: &[RawExperimentRecord],
    schemas: &SchemaNames,
    users: Option<&Users>,
) -> Vec<EntityDict> {
    records
        .iter()
        .map(|record| experiment_dict(record, &schemas.experiment, users))
        .collect()
}

pub fn dataset_dicts(records: &[RawDatasetRecord], schemas: &SchemaNames) -> Vec<EntityDict> {
    records
        .iter()
        .map(|record| dataset_dict(record, &schemas.dataset))
        .collect()
}

pub fn datafile_dicts(
    records: &[RawDatafileRecord],
    schemas: &SchemaNames,
    store: &StoreOptions,
) -> Vec<EntityDict> {
    records
        .iter()
        .map(|record| datafile_dict(record, &schemas.datafile, store))
        .collect()
}
