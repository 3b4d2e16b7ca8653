//! Machine registry listing
//!
//! Resolves every hypervisor-known machine against the identity store and
//! writes the result as a Markdown pipe table, one row per machine, sorted by
//! name. Machines with a missing or broken identity record are skipped with a
//! warning; the listing is informational and should survive a half-maintained
//! identity directory.

use crate::error::{HarvestError, Result};
use crate::hypervisor::MachineRef;
use crate::identity::{IdentityStore, MachineIdentity};
use std::path::Path;

const COLUMNS: &[&str] = &[
    "name",
    "vm_hash",
    "os_family",
    "os_type",
    "os_version",
    "artifact_root",
    "source",
    "vagrant_box",
    "hash",
    "link",
];

/// One row of the registry table
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub vm_hash: String,
    pub identity: MachineIdentity,
}

impl RegistryEntry {
    fn cells(&self) -> Vec<String> {
        let id = &self.identity;
        vec![
            id.name.clone(),
            self.vm_hash.clone(),
            id.os_family.clone(),
            id.os_type.clone(),
            id.os_version.clone(),
            id.artifact_root.display().to_string(),
            id.source.clone().unwrap_or_default(),
            id.vagrant_box.clone().unwrap_or_default(),
            id.hash.clone().unwrap_or_default(),
            id.link.clone().unwrap_or_default(),
        ]
    }
}

/// Resolve identities for all enumerated machines, sorted by name
pub fn collect_entries(machines: &[MachineRef], store: &IdentityStore) -> Vec<RegistryEntry> {
    let mut entries: Vec<RegistryEntry> = machines
        .iter()
        .filter_map(|machine| match store.resolve(&machine.name) {
            Ok(identity) => Some(RegistryEntry {
                vm_hash: machine.uuid.clone(),
                identity,
            }),
            Err(e) => {
                tracing::warn!("Skipping machine in registry listing: {}", e);
                None
            }
        })
        .collect();

    entries.sort_by(|a, b| a.identity.name.cmp(&b.identity.name));
    entries
}

/// Write the entries as a Markdown pipe table
pub fn write_table(entries: &[RegistryEntry], dest: &Path) -> Result<()> {
    let mut table = String::new();
    table.push('|');
    table.push_str(&COLUMNS.join("|"));
    table.push_str("|\n|");
    table.push_str(&vec!["---"; COLUMNS.len()].join("|"));
    table.push_str("|\n");

    for entry in entries {
        table.push_str("| ");
        table.push_str(&entry.cells().join(" | "));
        table.push_str(" |\n");
    }

    std::fs::write(dest, table).map_err(|e| HarvestError::Io {
        source: e,
        context: format!("Failed to write registry table: {}", dest.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_record(dir: &Path, name: &str, json: &str) {
        std::fs::write(dir.join(format!("{}.json", name)), json).unwrap();
    }

    fn machine(name: &str, uuid: &str) -> MachineRef {
        MachineRef {
            name: name.to_string(),
            uuid: uuid.to_string(),
        }
    }

    #[test]
    fn test_entries_sorted_and_broken_records_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write_record(
            temp_dir.path(),
            "zeta",
            r#"{"os_family":"linux","os_type":"debian","os_version":"12",
                "artifact_root":"/t/zeta","source":"vagrant","vagrant_box":"debian/bookworm64"}"#,
        );
        write_record(
            temp_dir.path(),
            "alpha",
            r#"{"os_family":"windows","os_type":"desktop","os_version":"10",
                "artifact_root":"/t/alpha","source":"iso","hash":"cafe","link":"https://example.com/win10.iso"}"#,
        );
        write_record(temp_dir.path(), "broken", "{}");

        let store = IdentityStore::new(temp_dir.path().to_path_buf());
        let machines = [
            machine("zeta", "z-1"),
            machine("broken", "b-1"),
            machine("alpha", "a-1"),
            machine("ghost", "g-1"),
        ];

        let entries = collect_entries(&machines, &store);
        let names: Vec<&str> = entries.iter().map(|e| e.identity.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_table_layout() {
        let temp_dir = TempDir::new().unwrap();
        write_record(
            temp_dir.path(),
            "debian12",
            r#"{"os_family":"linux","os_type":"debian","os_version":"12","artifact_root":"/t"}"#,
        );
        let store = IdentityStore::new(temp_dir.path().to_path_buf());
        let entries = collect_entries(&[machine("debian12", "1f6a")], &store);

        let dest = temp_dir.path().join("machines.md");
        write_table(&entries, &dest).unwrap();

        let text = std::fs::read_to_string(&dest).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("|{}|", COLUMNS.join("|")));
        assert_eq!(lines[1], format!("|{}|", vec!["---"; COLUMNS.len()].join("|")));
        assert!(lines[2].starts_with("| debian12 | 1f6a | linux |"));
    }
}
