use std::io;

use thiserror::Error;

/// Failures raised while turning a CSV export into ingestion records.
///
/// `Configuration` is only ever produced before the first data row is read;
/// `MalformedRow` always carries the 1-based line of the offending input row.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("configuration error: {role}")]
    Configuration { role: String },
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HarvestError {
    pub(crate) fn configuration(role: impl Into<String>) -> Self {
        HarvestError::Configuration { role: role.into() }
    }

    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        HarvestError::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;
