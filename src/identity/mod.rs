//! Machine identity resolution
//!
//! Each labeled machine has one JSON record at `<identity.dir>/<name>.json`
//! carrying its OS labels and the root directory its capture artifacts live
//! under. Additional provenance fields (`source`, `vagrant_box`, `hash`,
//! `link`) are passed through untouched for the registry listing.

use crate::aggregate::Label;
use crate::error::{HarvestError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Identity record for one machine, immutable once loaded
#[derive(Debug, Clone)]
pub struct MachineIdentity {
    /// Machine name (the record's file stem)
    pub name: String,
    pub os_family: String,
    pub os_type: String,
    pub os_version: String,
    /// Root directory searched for this machine's capture artifacts
    pub artifact_root: PathBuf,
    /// Provenance fields, not consumed by the extraction core
    pub source: Option<String>,
    pub vagrant_box: Option<String>,
    pub hash: Option<String>,
    pub link: Option<String>,
}

impl MachineIdentity {
    /// The label triple attached to every record extracted for this machine
    pub fn label(&self) -> Label {
        Label {
            os_family: self.os_family.clone(),
            os_type: self.os_type.clone(),
            os_version: self.os_version.clone(),
        }
    }
}

/// On-disk shape of an identity record; every field optional so required-field
/// checks produce a precise error instead of a serde message
#[derive(Debug, Deserialize)]
struct RawIdentity {
    os_family: Option<String>,
    os_type: Option<String>,
    os_version: Option<String>,
    artifact_root: Option<PathBuf>,
    source: Option<String>,
    vagrant_box: Option<String>,
    hash: Option<String>,
    link: Option<String>,
}

/// Resolves machine names against the identity record directory.
/// Performs no caching; callers reuse the resolved value.
pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    /// Create a store over the given identity directory
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Path of the record for a machine name
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load the identity record for `name`
    pub fn resolve(&self, name: &str) -> Result<MachineIdentity> {
        let path = self.record_path(name);

        if !path.exists() {
            return Err(HarvestError::IdentityNotFound {
                name: name.to_string(),
                path,
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to read identity record: {}", path.display()),
        })?;
        let raw: RawIdentity =
            serde_json::from_str(&content).map_err(|e| HarvestError::IdentityParse {
                path: path.clone(),
                source: e,
            })?;

        Ok(MachineIdentity {
            name: name.to_string(),
            os_family: require(&path, "os_family", raw.os_family)?,
            os_type: require(&path, "os_type", raw.os_type)?,
            os_version: require(&path, "os_version", raw.os_version)?,
            artifact_root: raw.artifact_root.filter(|p| !p.as_os_str().is_empty()).ok_or_else(
                || HarvestError::IdentityField {
                    path: path.clone(),
                    field: "artifact_root".to_string(),
                },
            )?,
            source: raw.source,
            vagrant_box: raw.vagrant_box,
            hash: raw.hash,
            link: raw.link,
        })
    }
}

fn require(path: &Path, field: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| HarvestError::IdentityField {
            path: path.to_path_buf(),
            field: field.to_string(),
        })
}
