pub mod assemble;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod inspect;
pub mod io_utils;
pub mod merge;
pub mod parser;
pub mod records;
pub mod table;

pub use error::HarvestError;
pub use parser::{CsvParser, ParserOptions};

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_harvester", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Harvest(args) => handle_harvest(&args),
        Commands::Inspect(args) => inspect::execute(&args),
    }
}

fn handle_harvest(args: &cli::HarvestArgs) -> Result<()> {
    let config = config::HarvestConfig::load(&args.config)
        .with_context(|| format!("Loading config from {:?}", args.config))?;
    let mut plan = harvest::HarvestPlan::from_config(&config)?;
    if let Some(delimiter) = args.delimiter {
        plan.options.delimiter = Some(delimiter);
    }
    if let Some(label) = args.input_encoding.as_deref() {
        plan.options.encoding = io_utils::resolve_encoding(Some(label))?;
    }
    if let Some(bucket) = &args.bucket {
        plan.store.bucket = bucket.clone();
    }
    if args.no_store {
        plan.store.in_store = false;
    }
    debug!("Harvest plan: {plan:?}");

    let inputs = harvest::resolve_inputs(&config, &args.inputs)?;
    if inputs.is_empty() {
        info!("No CSV files to harvest");
    }
    let report = harvest::run(&plan, &inputs);
    report.save(args.output.as_deref())?;
    info!(
        "Harvested {} of {} file(s)",
        report.files.len(),
        inputs.len()
    );
    if !report.failures.is_empty() {
        bail!(
            "{} of {} file(s) failed to harvest",
            report.failures.len(),
            inputs.len()
        );
    }
    Ok(())
}
