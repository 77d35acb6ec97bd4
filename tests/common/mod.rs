#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use csv_harvester::assemble::SchemaNames;
use csv_harvester::classify::HeaderDeclarations;
use csv_harvester::ParserOptions;
use tempfile::{tempdir, TempDir};

pub const SCENARIO_HEADER: &str =
    "Expt ID,Expt Title,Dataset ID,Dataset Desc,File Name,Rel Path,Instrument";

/// Scratch directory that removes its files on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` under the workspace and returns the file path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }
}

pub fn schemas() -> SchemaNames {
    SchemaNames {
        experiment: "http://ns/experiment".to_string(),
        dataset: "http://ns/dataset".to_string(),
        datafile: "http://ns/datafile".to_string(),
    }
}

/// Declarations matching [`SCENARIO_HEADER`], with "Instrument" as dataset metadata.
pub fn scenario_declarations() -> HeaderDeclarations {
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

pub fn scenario_options() -> ParserOptions {
    ParserOptions::new(schemas(), scenario_declarations())
}

/// A YAML config for the scenario header rooted at `root`.
pub fn scenario_config_yaml(root: &Path) -> String {
    format!(
        r#"root_dir: "{}"
schemas:
  experiment: http://ns/experiment
  dataset: http://ns/dataset
  datafile: http://ns/datafile
headers:
  experiment_id: Expt ID
  experiment_title: Expt Title
  dataset_id: Dataset ID
  dataset_description: Dataset Desc
  datafile_name: File Name
  rel_path: Rel Path
  dataset_metadata: [Instrument]
bucket: test-bucket
"#,
        root.display()
    )
}
