use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the vmharvest application
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// No identity record exists for the requested machine
    #[error("No identity record for machine '{name}' at {}", path.display())]
    IdentityNotFound { name: String, path: PathBuf },

    /// Identity record exists but a required field is missing or empty
    #[error("Identity record {} is missing required field '{field}'", path.display())]
    IdentityField { path: PathBuf, field: String },

    /// Identity record exists but is not valid JSON
    #[error("Identity record {} is not valid JSON: {source}", path.display())]
    IdentityParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Artifact cannot be opened or decoded; recoverable per artifact
    #[error("Cannot read artifact {}: {reason}", path.display())]
    ArtifactUnreadable { path: PathBuf, reason: String },

    /// Flow-record table lacks an expected column
    #[error("Flow table {} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// Destination exists and the write mode forbids overwriting it
    #[error("Output file already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    /// Destination cannot be opened for writing
    #[error("Output file is not writable: {}: {source}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Existing output has a header incompatible with the merge target
    #[error("Existing output {} has an unexpected header (expected '{expected}')", path.display())]
    MergeHeader { path: PathBuf, expected: String },

    /// Hypervisor machine enumeration failed
    #[error("Hypervisor error: {0}")]
    Hypervisor(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarvestError {
    /// Whether the pipeline may skip the current artifact and continue.
    /// Everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HarvestError::ArtifactUnreadable { .. })
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for vmharvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;
