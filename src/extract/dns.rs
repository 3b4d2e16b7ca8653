//! DNS extractor: queried domain names from flow-record tables

use crate::discovery::ArtifactKind;
use crate::error::Result;
use crate::extract::{Extract, FieldRecord};
use crate::flow::FlowTable;
use std::collections::BTreeSet;
use std::path::Path;

/// One observed DNS query
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DnsRecord {
    pub queried_name: String,
}

impl FieldRecord for DnsRecord {
    const FIELDS: &'static [&'static str] = &["DNS_NAME"];

    fn values(&self) -> Vec<String> {
        vec![self.queried_name.clone()]
    }

    fn from_values(values: &[&str]) -> Option<Self> {
        match values {
            [name] if !name.is_empty() => Some(Self {
                queried_name: name.to_string(),
            }),
            _ => None,
        }
    }
}

/// Projects the `DNS_NAME` column out of flow tables
pub struct DnsExtractor;

impl Extract for DnsExtractor {
    type Record = DnsRecord;
    const PROTOCOL: &'static str = "dns";
    const KIND: ArtifactKind = ArtifactKind::FlowTable;

    fn extract(&self, artifact: &Path) -> Result<Vec<DnsRecord>> {
        let table = FlowTable::open(artifact)?;
        let name_idx = table.column("DNS_NAME")?;

        // Dedup within the artifact; the aggregator re-dedups globally.
        let mut unique = BTreeSet::new();
        for row in table.into_rows() {
            let Some(value) = row.get(name_idx) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            unique.insert(DnsRecord {
                queried_name: value.to_string(),
            });
        }

        Ok(unique.into_iter().collect())
    }
}
