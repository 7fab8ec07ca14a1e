//! Readers for the flat CSV inputs
//!
//! - raw inventory: header + ragged rows (row length varies per node)
//! - hardware detail: headerless `node,key,value` triples
//! - summary tables: header + fixed-width rows, re-read by the public extractor

use crate::csv_output::CsvTable;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while reading pipeline inputs
#[derive(Error, Debug)]
pub enum InputError {
    #[error("{stage}: required input file not found: {}", .path.display())]
    MissingFile { stage: &'static str, path: PathBuf },

    #[error("Failed to read CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is empty (expected a header row)", .path.display())]
    EmptyFile { path: PathBuf },

    #[error("{}:{line}: expected at least {expected} fields, found {found}", .path.display())]
    ShortRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Result type for input readers
pub type Result<T> = std::result::Result<T, InputError>;

/// One raw inventory row as reported, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub fields: Vec<String>,
}

/// Raw inventory dump: header plus ragged rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInventory {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// A headerless `node,key,value` detail row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub node: String,
    pub key: String,
    pub value: String,
}

/// Fail with [`InputError::MissingFile`] unless `path` exists
pub fn require_file(stage: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(InputError::MissingFile {
            stage,
            path: path.to_path_buf(),
        })
    }
}

fn records(path: &Path) -> Result<Vec<(u64, StringRecord)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        out.push((line, record));
    }
    Ok(out)
}

fn fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

/// Read the raw inventory dump, keeping every row's reported length
pub fn read_inventory(path: &Path) -> Result<RawInventory> {
    let mut records = records(path)?.into_iter();
    let (_, header) = records.next().ok_or_else(|| InputError::EmptyFile {
        path: path.to_path_buf(),
    })?;

    Ok(RawInventory {
        header: fields(&header),
        rows: records
            .map(|(line, record)| RawRow {
                line,
                fields: fields(&record),
            })
            .collect(),
    })
}

/// Read a headerless three-column detail table
///
/// Unquoted values may contain commas (lscpu prints lists such as
/// `0-23,48-71`); fields past the second are joined back into the value.
pub fn read_detail_rows(path: &Path) -> Result<Vec<DetailRow>> {
    records(path)?
        .into_iter()
        .map(|(line, record)| {
            if record.len() < 3 {
                return Err(InputError::ShortRow {
                    path: path.to_path_buf(),
                    line,
                    expected: 3,
                    found: record.len(),
                });
            }
            let value = record.iter().skip(2).collect::<Vec<_>>().join(",");
            Ok(DetailRow {
                node: record[0].to_string(),
                key: record[1].to_string(),
                value,
            })
        })
        .collect()
}

/// Read a summary table written by this crate (header + rows)
pub fn read_table(path: &Path) -> Result<CsvTable> {
    let mut records = records(path)?.into_iter();
    let (_, header) = records.next().ok_or_else(|| InputError::EmptyFile {
        path: path.to_path_buf(),
    })?;

    let mut table = CsvTable::new(fields(&header));
    for (_, record) in records {
        table.add_row(fields(&record));
    }
    Ok(table)
}
