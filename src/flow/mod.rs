//! Flow-record table access
//!
//! Flow tables are CSV files whose column headers embed a type token ahead of
//! the logical name (`uint16 TLS_VERSION`, `string DNS_NAME`). The table is
//! opened with an explicit schema map from bare logical names to column
//! indices, built once from the header row; extractors select columns by
//! logical name and fail fast if an expected column is absent.

use crate::error::{HarvestError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// An open flow-record table with its header schema resolved
#[derive(Debug)]
pub struct FlowTable {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: HashMap<String, usize>,
}

impl FlowTable {
    /// Open a table and build the header schema map.
    ///
    /// An unopenable or headerless file is an unreadable artifact (the run
    /// skips it); missing expected columns surface later from [`column`].
    ///
    /// [`column`]: FlowTable::column
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| HarvestError::ArtifactUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| HarvestError::ArtifactUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut columns = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            columns.entry(bare_name(header).to_string()).or_insert(index);
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
        })
    }

    /// Resolve a logical column name to its index
    pub fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| HarvestError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    /// Consume the table as a row iterator. Rows the CSV reader cannot
    /// decode are dropped, matching the tolerance policy for noisy captures.
    pub fn into_rows(self) -> FlowRows {
        FlowRows {
            path: self.path,
            inner: self.reader.into_records(),
        }
    }
}

/// Row iterator over a flow table, silently skipping undecodable rows
pub struct FlowRows {
    path: PathBuf,
    inner: csv::StringRecordsIntoIter<File>,
}

impl Iterator for FlowRows {
    type Item = csv::StringRecord;

    fn next(&mut self) -> Option<csv::StringRecord> {
        loop {
            match self.inner.next()? {
                Ok(row) => return Some(row),
                Err(e) => {
                    tracing::debug!("Dropping undecodable row in {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// Strip the type token from a raw column header (`string DNS_NAME` →
/// `DNS_NAME`). Headers without a type token map to themselves.
fn bare_name(header: &str) -> &str {
    header.split_whitespace().last().unwrap_or(header)
}
