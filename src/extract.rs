use crate::{
    classify::{ColumnRole, ColumnRoleMap, MetadataColumn},
    error::{HarvestError, Result},
    io_utils::SourceRow,
    records::{Metadata, RawDatafileRecord, RawDatasetRecord, RawExperimentRecord, Scope},
};

/// The three parallel record lists produced by one pass over an input.
///
/// Index `i` of each list came from the `i`-th data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRecords {
    pub experiments: Vec<RawExperimentRecord>,
    pub datasets: Vec<RawDatasetRecord>,
    pub datafiles: Vec<RawDatafileRecord>,
}

impl ExtractedRecords {
    pub fn len(&self) -> usize {
        self.datafiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datafiles.is_empty()
    }
}

/// Slices every row into an experiment, dataset and datafile record, keeping
/// input order. Stops at the first row that cannot be sliced.
pub fn extract<I>(map: &ColumnRoleMap, rows: I) -> Result<ExtractedRecords>
where
    I: IntoIterator<Item = Result<SourceRow>>,
{
    let required_width = map.max_index() + 1;
    let composite = map.uses_composite_dataset_id();
    let mut records = ExtractedRecords::default();

    for row in rows {
        let row = row?;
        if row.cells.len() < required_width {
            return Err(HarvestError::malformed(
                row.line,
                format!(
                    "expected at least {required_width} column(s) but found {}",
                    row.cells.len()
                ),
            ));
        }
        let cell = |role: ColumnRole| row.cells[map.index(role)].as_str();

        let experiment_id = cell(ColumnRole::ExperimentId);
        let description = cell(ColumnRole::DatasetDescription);
        let dataset_id = if composite {
            format!("{experiment_id}-{description}")
        } else {
            cell(ColumnRole::DatasetId).to_string()
        };

        records.experiments.push(RawExperimentRecord {
            internal_id: experiment_id.to_string(),
            title: cell(ColumnRole::ExperimentTitle).to_string(),
            metadata: collect_metadata(map.metadata(Scope::Experiment), &row.cells),
        });
        records.datasets.push(RawDatasetRecord {
            internal_id: experiment_id.to_string(),
            dataset_id: dataset_id.clone(),
            description: description.to_string(),
            metadata: collect_metadata(map.metadata(Scope::Dataset), &row.cells),
        });
        records.datafiles.push(RawDatafileRecord {
            dataset_id,
            file_name: cell(ColumnRole::DatafileName).to_string(),
            metadata: collect_metadata(map.metadata(Scope::Datafile), &row.cells),
            relative_path: cell(ColumnRole::RelativePath).to_string(),
            remote_path: map.remote_path().map(|idx| row.cells[idx].clone()),
        });
    }
    Ok(records)
}

fn collect_metadata(columns: &[MetadataColumn], cells: &[String]) -> Metadata {
    columns
        .iter()
        .map(|column| (column.key.clone(), cells[column.index].clone()))
        .collect()
}
