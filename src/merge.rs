//! Folding of adjacent dataset rows that describe the same dataset.
//!
//! Instrument exports repeat a dataset on every file row, and per-row dataset
//! metadata (instrument, operator, ...) can vary between those rows. Adjacent
//! records sharing `(internal_id, dataset_id)` are folded into one, and a
//! conflicting value is kept by joining both as `"<newer>, <older>"`.
//!
//! Only datasets are folded this way. Experiments and datafiles only get
//! consecutive-duplicate removal.

use std::collections::btree_map::Entry;

use itertools::Itertools;
use log::warn;

use crate::records::{Metadata, RawDatasetRecord};

pub const VALUE_SEPARATOR: &str = ", ";

/// Combines two metadata maps. Keys found in only one map are carried over;
/// a key whose values differ becomes `"<newer>, <older>"`.
pub fn merge_metadata(newer: Metadata, older: Metadata) -> Metadata {
    let mut merged = older;
    for (key, value) in newer {
        match merged.entry(key) {
            Entry::Occupied(mut slot) => {
                if *slot.get() != value {
                    let combined = format!("{value}{VALUE_SEPARATOR}{}", slot.get());
                    slot.insert(combined);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    merged
}

/// Folds runs of adjacent datasets with the same identity into one record.
///
/// The later record of each pair supplies the description; its metadata is
/// merged with the earlier one via [`merge_metadata`].
pub fn merge_datasets(records: Vec<RawDatasetRecord>) -> Vec<RawDatasetRecord> {
    records
        .into_iter()
        .coalesce(|previous, current| {
            if previous.identity() != current.identity() {
                return Err((previous, current));
            }
            if previous.description != current.description {
                warn!(
                    "Dataset '{}' of experiment '{}' has differing descriptions '{}' and '{}'; keeping '{}'",
                    current.dataset_id,
                    current.internal_id,
                    previous.description,
                    current.description,
                    current.description
                );
            }
            Ok(RawDatasetRecord {
                metadata: merge_metadata(current.metadata, previous.metadata),
                ..current
            })
        })
        .collect()
}
