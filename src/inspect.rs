//! Header inspection.
//!
//! Classifies only the header row of an export and prints which role or
//! metadata key each column maps to, so a configuration can be checked
//! against a new instrument export before harvesting it.

use anyhow::{Context, Result};
use log::info;

use crate::{
    classify::{ColumnRole, ColumnRoleMap, classify},
    cli::InspectArgs,
    config::HarvestConfig,
    io_utils,
    records::Scope,
    table,
};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let config = HarvestConfig::load(&args.config)?;
    let encoding = io_utils::resolve_encoding(
        args.input_encoding
            .as_deref()
            .or(config.encoding.as_deref()),
    )?;
    let delimiter = match args.delimiter {
        Some(delimiter) => Some(delimiter),
        None => config.delimiter()?,
    };
    let delimiter = io_utils::resolve_input_delimiter(&args.input, delimiter);
    let mut reader = io_utils::open_csv_reader_from_path(&args.input, delimiter)
        .with_context(|| format!("Opening input file {:?}", args.input))?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading header of {:?}", args.input))?;
    let map = classify(&headers, &config.headers)
        .with_context(|| format!("Classifying header of {:?}", args.input))?;

    let table_headers = vec![
        "index".to_string(),
        "header".to_string(),
        "role".to_string(),
        "metadata key".to_string(),
    ];
    table::print_table(&table_headers, &describe(&map));
    if map.uses_composite_dataset_id() {
        info!("Dataset ids will be synthesised as '<experiment id>-<dataset description>'");
    }
    info!("Classified {} column(s) from {:?}", headers.len(), args.input);
    Ok(())
}

/// One row per header column: its index, header text, roles and metadata keys.
pub fn describe(map: &ColumnRoleMap) -> Vec<Vec<String>> {
    map.headers()
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let mut roles: Vec<&str> = ColumnRole::PRIORITY
                .iter()
                .filter(|role| map.index(**role) == idx)
                .map(|role| role.name())
                .collect();
            if map.remote_path() == Some(idx) {
                roles.push("remote path");
            }
            let keys: Vec<&str> = [Scope::Experiment, Scope::Dataset, Scope::Datafile]
                .into_iter()
                .flat_map(|scope| map.metadata(scope).iter())
                .filter(|column| column.index == idx)
                .map(|column| column.key.as_str())
                .collect();
            let role = if roles.is_empty() && keys.is_empty() {
                "(ignored)".to_string()
            } else {
                roles.join(", ")
            };
            vec![idx.to_string(), header.clone(), role, keys.join(", ")]
        })
        .collect()
}
