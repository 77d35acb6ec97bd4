use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fold instrument CSV exports into experiment, dataset and datafile records",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse one or more CSV exports and write the ingestion dictionaries as JSON
    Harvest(HarvestArgs),
    /// Show how a CSV header resolves against the configured column roles
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct HarvestArgs {
    /// Harvest configuration file (YAML, or JSON by extension)
    #[arg(short, long)]
    pub config: PathBuf,
    /// CSV files to harvest (defaults to every CSV/TSV file under the configured root_dir)
    #[arg(short = 'i', long = "input", action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Object store bucket recorded on datafiles
    #[arg(long)]
    pub bucket: Option<String>,
    /// Mark datafiles as not yet present in the object store
    #[arg(long = "no-store")]
    pub no_store: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Harvest configuration file (YAML, or JSON by extension)
    #[arg(short, long)]
    pub config: PathBuf,
    /// CSV file whose header should be classified
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
