//! Hypervisor machine enumeration
//!
//! External collaborator boundary: the configured listing command prints one
//! machine per line as `"name" {uuid}`. Only the parsed names and uuids cross
//! into the core; everything about the hypervisor itself stays behind the
//! command.

use crate::error::{HarvestError, Result};
use std::process::Command;

/// One machine known to the hypervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRef {
    pub name: String,
    pub uuid: String,
}

/// Run the listing command and parse its output
pub fn list_machines(command: &[String]) -> Result<Vec<MachineRef>> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| HarvestError::Config("Hypervisor listing command is empty".to_string()))?;

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to run hypervisor command '{}'", program),
        })?;

    if !output.status.success() {
        return Err(HarvestError::Hypervisor(format!(
            "'{}' exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `"name" {uuid}` lines; blank lines are ignored
fn parse_listing(text: &str) -> Vec<MachineRef> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?.trim_matches('"');
            if name.is_empty() {
                return None;
            }
            let uuid = parts
                .next()
                .unwrap_or("")
                .trim_matches(|c| c == '{' || c == '}');
            Some(MachineRef {
                name: name.to_string(),
                uuid: uuid.to_string(),
            })
        })
        .collect()
}
