//! CSV input plumbing shared by the parser and the CLI.
//!
//! - **Delimiter resolution**: `.tsv` inputs default to tab, everything else to
//!   comma, with a manual override.
//! - **Encoding**: inputs are decoded with `encoding_rs`, defaulting to UTF-8.
//! - **Rows**: data rows are surfaced lazily as [`SourceRow`]s carrying the
//!   1-based line they started on, so later stages can report precise
//!   locations.
//!
//! Readers are built `flexible` on purpose: short rows must reach the
//! extractor, which reports them as malformed with their line number.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::anyhow;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{HarvestError, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// One data row and the input line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub line: u64,
    pub cells: Vec<String>,
}

impl SourceRow {
    pub fn new(line: u64, cells: Vec<String>) -> Self {
        Self { line, cells }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> anyhow::Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .quote(b'"')
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    line: u64,
) -> Result<Vec<String>> {
    record
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let (text, _, had_errors) = encoding.decode(field);
            if had_errors {
                Err(HarvestError::malformed(
                    line,
                    format!(
                        "column {} is not valid {} text",
                        idx + 1,
                        encoding.name()
                    ),
                ))
            } else {
                Ok(text.into_owned())
            }
        })
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding, 1)
}

/// Lazily decodes the remaining records of `reader` into [`SourceRow`]s.
pub fn source_rows<R>(
    reader: csv::Reader<R>,
    encoding: &'static Encoding,
) -> impl Iterator<Item = Result<SourceRow>>
where
    R: Read,
{
    reader
        .into_byte_records()
        .enumerate()
        .map(move |(idx, record)| {
            let record = record?;
            let line = record
                .position()
                .map(|position| position.line())
                .unwrap_or(idx as u64 + 2);
            let cells = decode_record(&record, encoding, line)?;
            Ok(SourceRow::new(line, cells))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn delimiter_defaults_follow_extension() {
        assert_eq!(resolve_input_delimiter(&PathBuf::from("runs.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(&PathBuf::from("runs.CSV"), None), b',');
        assert_eq!(resolve_input_delimiter(&PathBuf::from("runs.tsv"), Some(b';')), b';');
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(resolve_encoding(Some("not-a-charset")).is_err());
        assert_eq!(resolve_encoding(Some("latin1")).expect("latin1").name(), "windows-1252");
    }

    #[test]
    fn source_rows_report_starting_lines_and_keep_short_rows() {
        let data = "a,b,c\n1,2,3\n\"multi\nline\",5,6\n7,8\n";
        let mut reader = open_csv_reader(data.as_bytes(), b',');
        let headers = reader_headers(&mut reader, UTF_8).expect("headers");
        assert_eq!(headers, vec!["a", "b", "c"]);
        let rows = source_rows(reader, UTF_8)
            .collect::<Result<Vec<_>>>()
            .expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 3);
        assert_eq!(rows[1].cells[0], "multi\nline");
        assert_eq!(rows[2].line, 5);
        assert_eq!(rows[2].cells, vec!["7", "8"]);
    }

    #[test]
    fn latin1_input_is_decoded() {
        let mut data = b"name\n".to_vec();
        data.extend_from_slice(&[0x63, 0x61, 0x66, 0xE9, b'\n']);
        let encoding = resolve_encoding(Some("latin1")).expect("encoding");
        let mut reader = open_csv_reader(data.as_slice(), b',');
        reader_headers(&mut reader, encoding).expect("headers");
        let rows = source_rows(reader, encoding)
            .collect::<Result<Vec<_>>>()
            .expect("rows");
        assert_eq!(rows[0].cells, vec!["café"]);
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let mut data = b"name\nok\n".to_vec();
        data.extend_from_slice(&[0xFF, 0xFE, b'\n']);
        let mut reader = open_csv_reader(data.as_slice(), b',');
        reader_headers(&mut reader, UTF_8).expect("headers");
        let err = source_rows(reader, UTF_8)
            .collect::<Result<Vec<_>>>()
            .expect_err("invalid utf-8");
        match err {
            HarvestError::MalformedRow { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
