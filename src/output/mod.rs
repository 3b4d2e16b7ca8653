//! CSV output sink
//!
//! Serializes a result set as `os_family,os_type,os_version,<protocol
//! fields…>` rows in the set's deterministic order, so repeated runs over
//! unchanged input reproduce the file byte for byte. The destination is
//! probed before any extraction work starts, and the final content is
//! written to a temporary path and renamed into place; a half-written
//! destination is never observable.

use crate::aggregate::{Label, Labeled, ResultSet};
use crate::error::{HarvestError, Result};
use crate::extract::FieldRecord;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Label columns preceding the protocol fields in every output
pub const LABEL_FIELDS: &[&str] = &["os_family", "os_type", "os_version"];

/// What to do when the destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the destination exists. Fleet-wide runs and single-machine
    /// runs on the default destination use this.
    CreateNew,
    /// Replace any existing content. Single-machine runs with an explicit
    /// destination use this.
    Overwrite,
    /// Union the existing rows with the new result set, then rewrite the
    /// whole file. Never a byte-append: the dedup invariant and the single
    /// sorted header-plus-rows layout must survive the merge.
    MergeAppend,
}

/// A CSV destination bound to a write mode
pub struct CsvSink {
    path: PathBuf,
    mode: WriteMode,
}

impl CsvSink {
    pub fn new(path: PathBuf, mode: WriteMode) -> Self {
        Self { path, mode }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pre-flight check, run before any extraction work: exists check for
    /// exclusive creation, then an open-for-write-then-discard probe so a
    /// doomed run fails before wasting computation.
    pub fn prepare(&self) -> Result<()> {
        let exists = self.path.exists();

        if exists && self.mode == WriteMode::CreateNew {
            return Err(HarvestError::DestinationExists {
                path: self.path.clone(),
            });
        }

        if exists {
            OpenOptions::new()
                .write(true)
                .open(&self.path)
                .map_err(|e| HarvestError::DestinationUnwritable {
                    path: self.path.clone(),
                    source: e,
                })?;
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
                .map_err(|e| HarvestError::DestinationUnwritable {
                    path: self.path.clone(),
                    source: e,
                })?;
            fs::remove_file(&self.path).map_err(|e| HarvestError::Io {
                source: e,
                context: format!("Failed to remove probe file: {}", self.path.display()),
            })?;
        }

        Ok(())
    }

    /// Serialize the result set (merged with prior content in merge mode)
    /// and atomically move it into place. Returns the number of rows written.
    pub fn commit<R: FieldRecord>(&self, mut rows: ResultSet<R>) -> Result<usize> {
        if self.mode == WriteMode::MergeAppend && self.path.exists() {
            self.merge_existing(&mut rows)?;
        }

        let data = serialize(&rows)?;
        let tmp = temp_path(&self.path);

        let mut file = fs::File::create(&tmp).map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to create temp output file: {}", tmp.display()),
        })?;
        file.write_all(&data).map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to write output: {}", tmp.display()),
        })?;
        file.sync_all().map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to sync output file: {}", tmp.display()),
        })?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| HarvestError::Io {
            source: e,
            context: format!(
                "Failed to move output into place: {} -> {}",
                tmp.display(),
                self.path.display()
            ),
        })?;

        Ok(rows.len())
    }

    /// Fold the destination's prior labeled rows into the result set. Rows
    /// that no longer parse are dropped; a foreign header is fatal.
    fn merge_existing<R: FieldRecord>(&self, rows: &mut ResultSet<R>) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let expected = header::<R>();
        let found: Vec<&str> = reader.headers()?.iter().collect();
        if found != expected {
            return Err(HarvestError::MergeHeader {
                path: self.path.clone(),
                expected: expected.join(","),
            });
        }

        for row in reader.records() {
            let Ok(row) = row else {
                continue;
            };
            let cells: Vec<&str> = row.iter().collect();
            if cells.len() != expected.len() {
                continue;
            }
            let (label_cells, field_cells) = cells.split_at(LABEL_FIELDS.len());
            let Some(record) = R::from_values(field_cells) else {
                continue;
            };
            rows.insert(Labeled {
                label: Label {
                    os_family: label_cells[0].to_string(),
                    os_type: label_cells[1].to_string(),
                    os_version: label_cells[2].to_string(),
                },
                record,
            });
        }

        Ok(())
    }
}

/// Header row for a protocol's output
fn header<R: FieldRecord>() -> Vec<&'static str> {
    LABEL_FIELDS.iter().chain(R::FIELDS.iter()).copied().collect()
}

fn serialize<R: FieldRecord>(rows: &ResultSet<R>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header::<R>())?;
    for row in rows.iter() {
        let mut cells = vec![
            row.label.os_family.clone(),
            row.label.os_type.clone(),
            row.label.os_version.clone(),
        ];
        cells.extend(row.record.values());
        writer.write_record(&cells)?;
    }
    writer.into_inner().map_err(|e| HarvestError::Io {
        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        context: "Failed to flush CSV buffer".to_string(),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}
