//! Protocol field extractors
//!
//! One extractor per supported protocol, each projecting a normalized record
//! shape out of its artifact representation: DNS and TLS read flow-record
//! tables, HTTP decodes raw packet captures. All three sit behind the
//! [`Extract`] trait so the pipeline drivers are generic over protocol.

pub mod dns;
pub mod http;
pub mod tls;

pub use dns::{DnsExtractor, DnsRecord};
pub use http::{HttpExtractor, HttpRecord};
pub use tls::{TlsExtractor, TlsRecord};

use crate::discovery::ArtifactKind;
use crate::error::Result;
use std::path::Path;

/// A protocol-specific record shape as it appears in CSV output
pub trait FieldRecord: Ord + Clone {
    /// Protocol column names, appended to the label columns in the header
    const FIELDS: &'static [&'static str];

    /// Cell values in `FIELDS` order; absent optional fields are empty
    fn values(&self) -> Vec<String>;

    /// Rebuild a record from cells in `FIELDS` order (used when merging a
    /// pre-existing output). Returns None for rows that cannot form a record.
    fn from_values(values: &[&str]) -> Option<Self>;
}

/// Field extraction from one artifact
pub trait Extract {
    type Record: FieldRecord;

    /// Protocol tag, used for default output names (`<protocol>.csv`)
    const PROTOCOL: &'static str;

    /// Which artifact representation this extractor consumes
    const KIND: ArtifactKind;

    /// Project all records out of one artifact.
    ///
    /// A structurally unreadable artifact fails with a recoverable error;
    /// malformed individual records are dropped without failing the artifact.
    fn extract(&self, artifact: &Path) -> Result<Vec<Self::Record>>;
}
