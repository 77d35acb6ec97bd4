//! Header classification.
//!
//! Resolves the caller's header declarations against the header row of an
//! input file, producing a [`ColumnRoleMap`] that the extractor uses for every
//! data row. All resolution happens up front so a bad header fails before any
//! data row is read.
//!
//! Matching is exact after trimming and lowercasing. A header cell that matches
//! any declared role is never also treated as metadata. When the same header
//! appears more than once, the first occurrence wins for each role.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{HarvestError, Result},
    records::Scope,
};

/// Which header values play each role, as declared by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDeclarations {
    pub experiment_title: String,
    #[serde(default)]
    pub experiment_id: Option<String>,
    pub dataset_description: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    pub datafile_name: String,
    pub rel_path: String,
    /// Object store path for each file; `rel_path` is mirrored when absent.
    #[serde(default)]
    pub remote_path: Option<String>,
    #[serde(default)]
    pub experiment_metadata: Vec<String>,
    #[serde(default)]
    pub dataset_metadata: Vec<String>,
    #[serde(default)]
    pub datafile_metadata: Vec<String>,
}

impl HeaderDeclarations {
    fn role_header(&self, role: ColumnRole) -> Option<&str> {
        match role {
            ColumnRole::ExperimentId => self.experiment_id.as_deref(),
            ColumnRole::ExperimentTitle => Some(self.experiment_title.as_str()),
            ColumnRole::DatasetId => self.dataset_id.as_deref(),
            ColumnRole::DatasetDescription => Some(self.dataset_description.as_str()),
            ColumnRole::DatafileName => Some(self.datafile_name.as_str()),
            ColumnRole::RelativePath => Some(self.rel_path.as_str()),
        }
    }

    fn metadata_headers(&self, scope: Scope) -> &[String] {
        match scope {
            Scope::Experiment => &self.experiment_metadata,
            Scope::Dataset => &self.dataset_metadata,
            Scope::Datafile => &self.datafile_metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    ExperimentId,
    ExperimentTitle,
    DatasetId,
    DatasetDescription,
    DatafileName,
    RelativePath,
}

impl ColumnRole {
    /// Roles in the order header cells are tested against them.
    pub const PRIORITY: [ColumnRole; 6] = [
        ColumnRole::ExperimentId,
        ColumnRole::DatasetId,
        ColumnRole::ExperimentTitle,
        ColumnRole::DatafileName,
        ColumnRole::DatasetDescription,
        ColumnRole::RelativePath,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColumnRole::ExperimentId => "experiment id",
            ColumnRole::ExperimentTitle => "experiment title",
            ColumnRole::DatasetId => "dataset id",
            ColumnRole::DatasetDescription => "dataset description",
            ColumnRole::DatafileName => "datafile name",
            ColumnRole::RelativePath => "relative path",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataColumn {
    pub index: usize,
    pub header: String,
    pub key: String,
}

/// Column positions for every role plus the per-scope metadata columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoleMap {
    experiment_id: usize,
    experiment_title: usize,
    dataset_id: usize,
    dataset_description: usize,
    datafile_name: usize,
    relative_path: usize,
    remote_path: Option<usize>,
    experiment_metadata: Vec<MetadataColumn>,
    dataset_metadata: Vec<MetadataColumn>,
    datafile_metadata: Vec<MetadataColumn>,
    headers: Vec<String>,
}

impl ColumnRoleMap {
    pub fn index(&self, role: ColumnRole) -> usize {
        match role {
            ColumnRole::ExperimentId => self.experiment_id,
            ColumnRole::ExperimentTitle => self.experiment_title,
            ColumnRole::DatasetId => self.dataset_id,
            ColumnRole::DatasetDescription => self.dataset_description,
            ColumnRole::DatafileName => self.datafile_name,
            ColumnRole::RelativePath => self.relative_path,
        }
    }

    pub fn metadata(&self, scope: Scope) -> &[MetadataColumn] {
        match scope {
            Scope::Experiment => &self.experiment_metadata,
            Scope::Dataset => &self.dataset_metadata,
            Scope::Datafile => &self.datafile_metadata,
        }
    }

    /// True when no distinct dataset id column exists, so dataset ids must be
    /// synthesised from the experiment id and the description.
    pub fn uses_composite_dataset_id(&self) -> bool {
        self.dataset_id == self.dataset_description
    }

    /// Column holding an explicit object store path, if one was declared.
    pub fn remote_path(&self) -> Option<usize> {
        self.remote_path
    }

    pub fn experiment_id_aliases_title(&self) -> bool {
        self.experiment_id == self.experiment_title
    }

    /// Highest column index any role or metadata column refers to.
    pub fn max_index(&self) -> usize {
        let roles = ColumnRole::PRIORITY.iter().map(|role| self.index(*role));
        let metadata = [Scope::Experiment, Scope::Dataset, Scope::Datafile]
            .into_iter()
            .flat_map(|scope| self.metadata(scope).iter().map(|column| column.index));
        roles
            .chain(self.remote_path)
            .chain(metadata)
            .max()
            .unwrap_or_default()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

fn normalize_header(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Resolves `declarations` against `headers`.
///
/// Fails with [`HarvestError::Configuration`] naming the first required role
/// or metadata column that could not be located.
pub fn classify(headers: &[String], declarations: &HeaderDeclarations) -> Result<ColumnRoleMap> {
    let wanted: Vec<(ColumnRole, String)> = ColumnRole::PRIORITY
        .iter()
        .filter_map(|role| {
            declarations
                .role_header(*role)
                .map(|header| (*role, normalize_header(header)))
        })
        .collect();
    if let Some((role, _)) = wanted.iter().find(|(_, header)| header.is_empty()) {
        return Err(HarvestError::configuration(format!(
            "{} header is declared but empty",
            role.name()
        )));
    }

    let remote_declared = declarations.remote_path.as_deref().map(normalize_header);
    if remote_declared.as_deref() == Some("") {
        return Err(HarvestError::configuration(
            "remote path header is declared but empty",
        ));
    }

    // Normalized header -> declared spelling, per scope.
    let scopes = [Scope::Experiment, Scope::Dataset, Scope::Datafile];
    let metadata_sets: Vec<(Scope, HashMap<String, &str>)> = scopes
        .iter()
        .map(|scope| {
            let set = declarations
                .metadata_headers(*scope)
                .iter()
                .map(|header| (normalize_header(header), header.trim()))
                .collect();
            (*scope, set)
        })
        .collect();

    let mut resolved: HashMap<ColumnRole, usize> = HashMap::new();
    let mut remote_path: Option<usize> = None;
    let mut metadata: HashMap<Scope, Vec<MetadataColumn>> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let normalized = normalize_header(header);
        let mut is_role = false;
        for (role, declared) in &wanted {
            if *declared == normalized {
                is_role = true;
                resolved.entry(*role).or_insert(idx);
            }
        }
        if remote_declared.as_deref() == Some(normalized.as_str()) {
            is_role = true;
            remote_path.get_or_insert(idx);
        }
        if is_role {
            continue;
        }
        for (scope, set) in &metadata_sets {
            let Some(declared) = set.get(&normalized) else {
                continue;
            };
            let key = scope.metadata_key(declared);
            let columns = metadata.entry(*scope).or_default();
            if columns.iter().any(|column| column.key == key) {
                debug!("Ignoring repeated {scope} metadata column {idx} ('{}')", header.trim());
                continue;
            }
            columns.push(MetadataColumn {
                index: idx,
                header: header.trim().to_string(),
                key,
            });
        }
    }

    let present: HashSet<String> = headers.iter().map(|h| normalize_header(h)).collect();
    for (scope, set) in &metadata_sets {
        let declared = declarations.metadata_headers(*scope);
        if let Some(missing) = declared
            .iter()
            .find(|header| !present.contains(&normalize_header(header)))
        {
            debug!(
                "{scope} metadata set {:?} not satisfied by header {headers:?}",
                set.keys().collect::<Vec<_>>()
            );
            return Err(HarvestError::configuration(format!(
                "{scope} metadata column '{missing}' not found in header"
            )));
        }
    }

    let require = |role: ColumnRole| -> Result<usize> {
        resolved.get(&role).copied().ok_or_else(|| {
            let declared = declarations.role_header(role).unwrap_or_default();
            HarvestError::configuration(format!(
                "{} column '{}' not found in header",
                role.name(),
                declared
            ))
        })
    };

    let experiment_title = require(ColumnRole::ExperimentTitle)?;
    let experiment_id = if declarations.experiment_id.is_some() {
        require(ColumnRole::ExperimentId)?
    } else {
        warn!(
            "No experiment id header declared; using experiment title column '{}' as the identifier. \
             Experiments sharing a title cannot be told apart.",
            declarations.experiment_title
        );
        experiment_title
    };
    let dataset_description = require(ColumnRole::DatasetDescription)?;
    let dataset_id = if declarations.dataset_id.is_some() {
        require(ColumnRole::DatasetId)?
    } else {
        warn!(
            "No dataset id header declared; dataset ids will be built as '<experiment id>-<{}>'",
            declarations.dataset_description
        );
        dataset_description
    };
    let datafile_name = require(ColumnRole::DatafileName)?;
    let relative_path = require(ColumnRole::RelativePath)?;
    if let (Some(declared), None) = (&declarations.remote_path, remote_path) {
        return Err(HarvestError::configuration(format!(
            "remote path column '{declared}' not found in header"
        )));
    }

    let mut take = |scope: Scope| metadata.remove(&scope).unwrap_or_default();
    let map = ColumnRoleMap {
        experiment_id,
        experiment_title,
        dataset_id,
        dataset_description,
        datafile_name,
        relative_path,
        remote_path,
        experiment_metadata: take(Scope::Experiment),
        dataset_metadata: take(Scope::Dataset),
        datafile_metadata: take(Scope::Datafile),
        headers: headers.to_vec(),
    };
    debug!("Resolved column roles: {map:?}");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn declarations() -> HeaderDeclarations {
        HeaderDeclarations {
            experiment_title: "Expt Title".to_string(),
            experiment_id: Some("Expt ID".to_string()),
            dataset_description: "Dataset Desc".to_string(),
            dataset_id: Some("Dataset ID".to_string()),
            datafile_name: "File Name".to_string(),
            rel_path: "Rel Path".to_string(),
            remote_path: None,
            experiment_metadata: Vec::new(),
            dataset_metadata: vec!["Instrument".to_string()],
            datafile_metadata: Vec::new(),
        }
    }

    #[test]
    fn classify_resolves_roles_case_insensitively() {
        let header = headers(&[
            "expt id",
            "EXPT TITLE",
            " Dataset ID ",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
        ]);
        let map = classify(&header, &declarations()).expect("classify");
        assert_eq!(map.index(ColumnRole::ExperimentId), 0);
        assert_eq!(map.index(ColumnRole::ExperimentTitle), 1);
        assert_eq!(map.index(ColumnRole::DatasetId), 2);
        assert_eq!(map.index(ColumnRole::DatasetDescription), 3);
        assert_eq!(map.index(ColumnRole::DatafileName), 4);
        assert_eq!(map.index(ColumnRole::RelativePath), 5);
        assert_eq!(
            map.metadata(Scope::Dataset),
            &[MetadataColumn {
                index: 6,
                header: "Instrument".to_string(),
                key: "Dataset_instrument".to_string(),
            }]
        );
        assert_eq!(map.max_index(), 6);
        assert!(!map.uses_composite_dataset_id());
    }

    #[test]
    fn role_columns_are_not_duplicated_into_metadata() {
        let mut decl = declarations();
        decl.experiment_metadata = vec!["Expt Title".to_string(), "PI".to_string()];
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
            "PI",
        ]);
        let map = classify(&header, &decl).expect("classify");
        let keys: Vec<&str> = map
            .metadata(Scope::Experiment)
            .iter()
            .map(|column| column.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Experiment_pi"]);
    }

    #[test]
    fn missing_identifiers_fall_back_to_title_and_description() {
        let mut decl = declarations();
        decl.experiment_id = None;
        decl.dataset_id = None;
        let header = headers(&[
            "Expt Title",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
        ]);
        let map = classify(&header, &decl).expect("classify");
        assert!(map.experiment_id_aliases_title());
        assert!(map.uses_composite_dataset_id());
        assert_eq!(map.index(ColumnRole::ExperimentId), 0);
        assert_eq!(map.index(ColumnRole::DatasetId), 1);
    }

    #[test]
    fn first_occurrence_of_a_repeated_header_wins() {
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
            "Expt ID",
        ]);
        let map = classify(&header, &declarations()).expect("classify");
        assert_eq!(map.index(ColumnRole::ExperimentId), 0);
    }

    #[test]
    fn repeated_metadata_header_keeps_its_first_column() {
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
            "INSTRUMENT",
        ]);
        let map = classify(&header, &declarations()).expect("classify");
        let columns = map.metadata(Scope::Dataset);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].index, 6);
    }

    #[test]
    fn metadata_keys_come_from_the_declared_header() {
        let mut decl = declarations();
        decl.dataset_metadata = vec!["Run Temp".to_string()];
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "  RUN TEMP\t",
        ]);
        let map = classify(&header, &decl).expect("classify");
        let column = &map.metadata(Scope::Dataset)[0];
        assert_eq!(column.key, "Dataset_run_temp");
        assert_eq!(column.key, Scope::Dataset.metadata_key("Run Temp"));
        assert_eq!(column.header, "RUN TEMP");
    }

    #[test]
    fn remote_path_column_is_optional_and_never_metadata() {
        let mut decl = declarations();
        decl.remote_path = Some("Store Path".to_string());
        decl.datafile_metadata = vec!["Store Path".to_string()];
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
            "Store Path",
        ]);
        let map = classify(&header, &decl).expect("classify");
        assert_eq!(map.remote_path(), Some(7));
        assert!(map.metadata(Scope::Datafile).is_empty());
        assert_eq!(map.max_index(), 7);

        let without = classify(&header[..7], &declarations()).expect("classify");
        assert_eq!(without.remote_path(), None);
    }

    #[test]
    fn declared_remote_path_must_be_present() {
        let mut decl = declarations();
        decl.remote_path = Some("Store Path".to_string());
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
        ]);
        let err = classify(&header, &decl).expect_err("store path absent");
        assert!(err.to_string().contains("remote path column 'Store Path'"));
    }

    #[test]
    fn classify_names_the_missing_role() {
        let header = headers(&["Expt ID", "Expt Title", "Dataset ID", "Dataset Desc", "Rel Path"]);
        let mut decl = declarations();
        decl.dataset_metadata.clear();
        let err = classify(&header, &decl).expect_err("file name column is absent");
        match err {
            HarvestError::Configuration { role } => {
                assert!(role.contains("datafile name"), "unexpected role: {role}");
                assert!(role.contains("File Name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn classify_rejects_declared_but_absent_identifier() {
        let header = headers(&[
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
        ]);
        let err = classify(&header, &declarations()).expect_err("experiment id absent");
        assert!(err.to_string().contains("experiment id"));
    }

    #[test]
    fn classify_rejects_missing_metadata_column() {
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
        ]);
        let err = classify(&header, &declarations()).expect_err("instrument absent");
        assert!(err.to_string().contains("Dataset metadata column 'Instrument'"));
    }

    #[test]
    fn classify_rejects_empty_declarations() {
        let mut decl = declarations();
        decl.rel_path = "  ".to_string();
        let err = classify(&headers(&["a"]), &decl).expect_err("empty rel path");
        assert!(err.to_string().contains("relative path header is declared but empty"));
    }

    #[test]
    fn metadata_header_may_belong_to_several_scopes() {
        let mut decl = declarations();
        decl.datafile_metadata = vec!["Instrument".to_string()];
        let header = headers(&[
            "Expt ID",
            "Expt Title",
            "Dataset ID",
            "Dataset Desc",
            "File Name",
            "Rel Path",
            "Instrument",
        ]);
        let map = classify(&header, &decl).expect("classify");
        assert_eq!(map.metadata(Scope::Dataset)[0].key, "Dataset_instrument");
        assert_eq!(map.metadata(Scope::Datafile)[0].key, "Datafile_instrument");
    }
}
