//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vmharvest",
    version,
    about = "Extract labeled DNS/HTTP/TLS metadata from recorded VM traffic",
    long_about = "vmharvest discovers the capture artifacts recorded for labeled virtual machines, \
                  projects protocol metadata out of them (DNS query names, HTTP request fields, \
                  TLS handshake fields), deduplicates the results, and writes OS-labeled CSV \
                  datasets for traffic fingerprinting."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/vmharvest/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract DNS query names from flow-record tables
    Dns {
        /// Machine to process; omit to aggregate over every known machine
        #[arg(short, long)]
        name: Option<String>,

        /// Output CSV path (defaults to <artifact root>/dns.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Explicit flow table(s) instead of searching the artifact root
        #[arg(short, long, num_args = 1.., value_name = "FILE", requires = "name")]
        flows: Option<Vec<PathBuf>>,
    },

    /// Extract HTTP request metadata from packet captures
    Http {
        /// Machine to process; omit to aggregate over every known machine
        #[arg(short, long)]
        name: Option<String>,

        /// Output CSV path (defaults to <artifact root>/http.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Explicit capture file(s) instead of searching the artifact root
        #[arg(short = 'p', long, num_args = 1.., value_name = "FILE", requires = "name")]
        captures: Option<Vec<PathBuf>>,

        /// Merge with an existing output instead of requiring a fresh file
        #[arg(short, long, requires = "name")]
        append: bool,
    },

    /// Extract TLS handshake fields from flow-record tables
    Tls {
        /// Machine to process; omit to aggregate over every known machine
        #[arg(short, long)]
        name: Option<String>,

        /// Output CSV path (defaults to <artifact root>/tls.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Explicit flow table(s) instead of searching the artifact root
        #[arg(short, long, num_args = 1.., value_name = "FILE", requires = "name")]
        flows: Option<Vec<PathBuf>>,
    },

    /// Write the machine registry as a Markdown table
    Machines {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
