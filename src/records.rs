//! Intermediate records produced from a single CSV pass.
//!
//! Each data row yields one [`RawExperimentRecord`], one [`RawDatasetRecord`]
//! and one [`RawDatafileRecord`]. Metadata keys are namespaced by [`Scope`] so
//! the three levels can later be flattened into one dictionary without
//! colliding.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Metadata values keyed by their normalized, scope-prefixed field name.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Experiment,
    Dataset,
    Datafile,
}

impl Scope {
    pub fn prefix(self) -> &'static str {
        match self {
            Scope::Experiment => "Experiment",
            Scope::Dataset => "Dataset",
            Scope::Datafile => "Datafile",
        }
    }

    /// Builds the `<Scope>_<header>` key for a metadata column, lowercasing the
    /// header and replacing spaces with underscores.
    pub fn metadata_key(self, header: &str) -> String {
        format!(
            "{}_{}",
            self.prefix(),
            header.to_lowercase().replace(' ', "_")
        )
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExperimentRecord {
    pub internal_id: String,
    pub title: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDatasetRecord {
    /// Identifier of the parent experiment.
    pub internal_id: String,
    pub dataset_id: String,
    pub description: String,
    pub metadata: Metadata,
}

impl RawDatasetRecord {
    pub fn identity(&self) -> (&str, &str) {
        (&self.internal_id, &self.dataset_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDatafileRecord {
    pub dataset_id: String,
    pub file_name: String,
    pub metadata: Metadata,
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}
