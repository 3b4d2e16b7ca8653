//! TLS extractor: handshake fields from flow-record tables

use crate::discovery::ArtifactKind;
use crate::error::Result;
use crate::extract::{Extract, FieldRecord};
use crate::flow::FlowTable;
use std::collections::BTreeSet;
use std::path::Path;

/// Handshake-derived fields of one TLS flow. All four fields are optional;
/// a record exists as long as at least one of them was observed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TlsRecord {
    pub version: Option<String>,
    pub alpn: Option<String>,
    pub ja3: Option<String>,
    pub sni: Option<String>,
}

impl TlsRecord {
    fn is_empty(&self) -> bool {
        self.version.is_none() && self.alpn.is_none() && self.ja3.is_none() && self.sni.is_none()
    }
}

impl FieldRecord for TlsRecord {
    const FIELDS: &'static [&'static str] = &["TLS_VERSION", "TLS_ALPN", "TLS_JA3", "TLS_SNI"];

    fn values(&self) -> Vec<String> {
        [&self.version, &self.alpn, &self.ja3, &self.sni]
            .iter()
            .map(|field| field.as_deref().unwrap_or("").to_string())
            .collect()
    }

    fn from_values(values: &[&str]) -> Option<Self> {
        let [version, alpn, ja3, sni] = values else {
            return None;
        };
        let record = Self {
            version: normalize_version(version),
            alpn: normalize(alpn),
            ja3: normalize(ja3),
            sni: normalize(sni),
        };
        (!record.is_empty()).then_some(record)
    }
}

/// Empty cells are absent fields
fn normalize(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty()).then(|| cell.to_string())
}

/// A version value of zero means the probe recorded no handshake version;
/// normalize it to absent before the any-field-present check
fn normalize_version(cell: &str) -> Option<String> {
    let cell = cell.trim();
    match cell.parse::<u64>() {
        Ok(0) => None,
        Ok(n) => Some(n.to_string()),
        Err(_) => (!cell.is_empty()).then(|| cell.to_string()),
    }
}

/// Projects the four TLS columns out of flow tables
pub struct TlsExtractor;

impl Extract for TlsExtractor {
    type Record = TlsRecord;
    const PROTOCOL: &'static str = "tls";
    const KIND: ArtifactKind = ArtifactKind::FlowTable;

    fn extract(&self, artifact: &Path) -> Result<Vec<TlsRecord>> {
        let table = FlowTable::open(artifact)?;
        let version_idx = table.column("TLS_VERSION")?;
        let alpn_idx = table.column("TLS_ALPN")?;
        let ja3_idx = table.column("TLS_JA3")?;
        let sni_idx = table.column("TLS_SNI")?;

        let mut unique = BTreeSet::new();
        for row in table.into_rows() {
            let record = TlsRecord {
                version: row.get(version_idx).and_then(normalize_version),
                alpn: row.get(alpn_idx).and_then(normalize),
                ja3: row.get(ja3_idx).and_then(normalize),
                sni: row.get(sni_idx).and_then(normalize),
            };
            if record.is_empty() {
                continue;
            }
            unique.insert(record);
        }

        Ok(unique.into_iter().collect())
    }
}
