//! vmharvest - VM Traffic Metadata Harvester
//!
//! Extracts protocol-level metadata (DNS queries, HTTP requests, TLS handshake
//! fields) from recorded virtual machine traffic, attaches OS identity labels,
//! deduplicates the results, and writes them as CSV datasets for traffic
//! fingerprinting work.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod flow;
pub mod hypervisor;
pub mod identity;
pub mod output;
pub mod pipeline;
pub mod registry;

pub use error::{HarvestError, Result};
