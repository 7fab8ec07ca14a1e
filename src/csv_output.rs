//! CSV output for summary tables
//!
//! Tables are rendered in memory and written with a temp-file-then-rename
//! step, so a failed run never leaves a half-written table behind. Several
//! tables can be staged first and renamed only once all of them are on disk.

use anyhow::{Context, Result};
use csv::Writer;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A header row plus data rows, all cells as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Create an empty table with the given header
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Add a data row; cells beyond the header width are kept as-is
    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header label
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (`row`, column named `name`), if both exist
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let column = self.column_index(name)?;
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Render as CSV text (quoting handled by the `csv` writer)
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = Writer::from_writer(vec![]);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("CSV writer error: {}", e))?;
        String::from_utf8(data).context("CSV output is not valid UTF-8")
    }

    /// Render into a temp file next to `path`; nothing is visible at `path`
    /// until [`StagedTable::commit`]
    pub fn stage(&self, path: &Path) -> Result<StagedTable> {
        let csv = self.to_csv()?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(csv.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(StagedTable {
            tmp,
            path: path.to_path_buf(),
            rows: self.rows.len(),
        })
    }

    /// Write to `path` atomically: temp file in the same directory, then rename
    pub fn write_atomic(&self, path: &Path) -> Result<PathBuf> {
        self.stage(path)?.commit()
    }
}

/// A fully written temp file waiting to be renamed into place
///
/// Dropping it without committing removes the temp file.
#[derive(Debug)]
pub struct StagedTable {
    tmp: NamedTempFile,
    path: PathBuf,
    rows: usize,
}

impl StagedTable {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temp file over the destination
    pub fn commit(self) -> Result<PathBuf> {
        self.tmp
            .persist(&self.path)
            .with_context(|| format!("Failed to move output into place: {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), rows = self.rows, "wrote table");
        Ok(self.path)
    }
}
