//! Configuration management for vmharvest
//!
//! Holds the locations the harvester works from: the identity record
//! directory, the artifact file names discovery matches on, the fleet output
//! directory, and the hypervisor listing command.

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub identity: IdentityConfig,
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,
    pub hypervisor: HypervisorConfig,
}

/// Where per-machine identity records live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Directory containing one `<machine>.json` record per machine
    pub dir: PathBuf,
}

/// File names the recursive artifact walk matches on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Flow-record table file name (DNS and TLS extraction)
    pub flow_file: String,
    /// Packet capture file name (HTTP extraction)
    pub capture_file: String,
}

/// Output destinations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for fleet-wide merged outputs
    pub fleet_dir: PathBuf,
}

/// Hypervisor machine enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypervisorConfig {
    /// Command that lists all known machines, one `"name" {uuid}` per line
    pub list_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: IdentityConfig {
                dir: PathBuf::from("/data/virtual_machines/vm_info"),
            },
            discovery: DiscoveryConfig {
                flow_file: "flows.csv".to_string(),
                capture_file: "traffic.pcap".to_string(),
            },
            output: OutputConfig {
                fleet_dir: PathBuf::from("/data/virtual_machines/traffic"),
            },
            hypervisor: HypervisorConfig {
                list_command: vec![
                    "sudo".to_string(),
                    "-u".to_string(),
                    "vmuser".to_string(),
                    "VBoxManage".to_string(),
                    "list".to_string(),
                    "vms".to_string(),
                ],
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HarvestError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| HarvestError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Default config file location (~/.config/vmharvest/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HarvestError::Config("Cannot determine config directory".to_string()))?;
        Ok(config_dir.join("vmharvest").join("config.toml"))
    }
}
