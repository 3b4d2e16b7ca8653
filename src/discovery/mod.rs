//! Artifact discovery
//!
//! A machine's capture artifacts sit anywhere under its artifact root, one
//! directory per recording session. Discovery is a single lazy recursive walk
//! matching on the configured file name for the artifact kind; it makes no
//! ordering guarantee (the aggregator imposes determinism later). Callers
//! holding an explicit artifact list bypass the walk entirely.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// The two artifact representations extractors consume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Pre-parsed flow-record table with typed, named columns
    FlowTable,
    /// Raw packet capture
    PacketCapture,
}

/// Lazy, finite, non-restartable walk over one artifact root.
///
/// Unreadable directories are skipped with a warning rather than failing the
/// walk; a machine with a missing artifact root simply yields nothing.
pub struct ArtifactWalk {
    file_name: OsString,
    stack: Vec<fs::ReadDir>,
}

impl ArtifactWalk {
    fn push_dir(&mut self, dir: &Path) {
        match fs::read_dir(dir) {
            Ok(entries) => self.stack.push(entries),
            Err(e) => tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), e),
        }
    }
}

impl Iterator for ArtifactWalk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        while let Some(entries) = self.stack.last_mut() {
            let Some(entry) = entries.next() else {
                self.stack.pop();
                continue;
            };
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if path.is_dir() {
                self.push_dir(&path);
            } else if entry.file_name() == self.file_name {
                return Some(path);
            }
        }
        None
    }
}

/// Walk `root` recursively for files named `file_name`
pub fn discover(root: &Path, file_name: &str) -> ArtifactWalk {
    let mut walk = ArtifactWalk {
        file_name: OsString::from(file_name),
        stack: Vec::new(),
    };
    walk.push_dir(root);
    walk
}
