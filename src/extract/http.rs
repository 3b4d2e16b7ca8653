//! HTTP extractor: request metadata from raw packet captures
//!
//! Walks a legacy pcap file frame by frame, decodes Ethernet/IPv4/TCP far
//! enough to reach the payload, and projects `(user_agent, host, uri)` out of
//! packets that begin an HTTP request. Every frame classifies to an explicit
//! outcome — a record, or a typed skip reason — so the tolerance policy for
//! noisy captures is an inspectable branch rather than a swallowed error.

use crate::discovery::ArtifactKind;
use crate::error::{HarvestError, Result};
use crate::extract::{Extract, FieldRecord};
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const READER_BUFFER: usize = 65536;

/// One observed HTTP request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpRecord {
    pub user_agent: String,
    pub host: String,
    pub uri: String,
}

impl FieldRecord for HttpRecord {
    const FIELDS: &'static [&'static str] = &["user-agent", "host", "uri"];

    fn values(&self) -> Vec<String> {
        vec![self.user_agent.clone(), self.host.clone(), self.uri.clone()]
    }

    fn from_values(values: &[&str]) -> Option<Self> {
        match values {
            [user_agent, host, uri]
                if !user_agent.is_empty() && !host.is_empty() && !uri.is_empty() =>
            {
                Some(Self {
                    user_agent: user_agent.to_string(),
                    host: host.to_string(),
                    uri: uri.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Outcome of classifying one captured frame
#[derive(Debug, PartialEq, Eq)]
enum PacketOutcome {
    Request(HttpRecord),
    Skip(SkipReason),
}

/// Why a frame produced no record. Skips are expected in any capture; they
/// are tallied for debug logging, never treated as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    /// Not an IPv4/TCP frame
    NotTcp,
    /// TCP payload does not begin an HTTP request
    NotRequest,
    /// Request headers are not fully contained in this segment
    TruncatedHeaders,
    /// Decoded request lacks a required field
    MissingField(&'static str),
}

#[derive(Debug, Default)]
struct SkipTally {
    not_tcp: u64,
    not_request: u64,
    truncated: u64,
    missing_field: u64,
}

impl SkipTally {
    fn note(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NotTcp => self.not_tcp += 1,
            SkipReason::NotRequest => self.not_request += 1,
            SkipReason::TruncatedHeaders => self.truncated += 1,
            SkipReason::MissingField(_) => self.missing_field += 1,
        }
    }
}

/// Projects request metadata out of packet captures
pub struct HttpExtractor;

impl Extract for HttpExtractor {
    type Record = HttpRecord;
    const PROTOCOL: &'static str = "http";
    const KIND: ArtifactKind = ArtifactKind::PacketCapture;

    fn extract(&self, artifact: &Path) -> Result<Vec<HttpRecord>> {
        let file = File::open(artifact).map_err(|e| HarvestError::ArtifactUnreadable {
            path: artifact.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut reader = LegacyPcapReader::new(READER_BUFFER, BufReader::new(file))
            .map_err(|e| unreadable(artifact, format!("not a valid pcap file: {:?}", e)))?;

        let mut requests = BTreeSet::new();
        let mut tally = SkipTally::default();
        let mut ng_blocks: u64 = 0;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    match block {
                        PcapBlockOwned::LegacyHeader(_) => {}
                        PcapBlockOwned::Legacy(ref pkt) => match classify(pkt.data) {
                            PacketOutcome::Request(record) => {
                                requests.insert(record);
                            }
                            PacketOutcome::Skip(reason) => tally.note(reason),
                        },
                        PcapBlockOwned::NG(_) => ng_blocks += 1,
                    }
                    drop(block);
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| unreadable(artifact, format!("refill error: {:?}", e)))?;
                }
                Err(e) => {
                    return Err(unreadable(artifact, format!("pcap parse error: {:?}", e)));
                }
            }
        }

        if ng_blocks > 0 {
            tracing::warn!(
                "{}: {} pcapng blocks ignored (only legacy pcap is decoded)",
                artifact.display(),
                ng_blocks
            );
        }
        tracing::debug!(
            "{}: {} requests, skipped {} non-tcp / {} non-request / {} truncated / {} incomplete",
            artifact.display(),
            requests.len(),
            tally.not_tcp,
            tally.not_request,
            tally.truncated,
            tally.missing_field
        );

        Ok(requests.into_iter().collect())
    }
}

fn unreadable(path: &Path, reason: String) -> HarvestError {
    HarvestError::ArtifactUnreadable {
        path: path.to_path_buf(),
        reason,
    }
}

fn classify(frame: &[u8]) -> PacketOutcome {
    let Some(payload) = tcp_payload(frame) else {
        return PacketOutcome::Skip(SkipReason::NotTcp);
    };
    if !starts_request(payload) {
        return PacketOutcome::Skip(SkipReason::NotRequest);
    }
    parse_request(payload)
}

const METHODS: &[&[u8]] = &[
    b"GET ", b"POST ", b"PUT ", b"HEAD ", b"DELETE ", b"OPTIONS ", b"PATCH ", b"TRACE ",
    b"CONNECT ",
];

fn starts_request(payload: &[u8]) -> bool {
    METHODS.iter().any(|m| payload.starts_with(m))
}

/// Ethernet (optionally 802.1Q-tagged) → IPv4 → TCP payload
fn tcp_payload(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 14 {
        return None;
    }
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    let (ip_off, ethertype) = if ethertype == 0x8100 && frame.len() >= 18 {
        (18, u16::from_be_bytes([frame[16], frame[17]]))
    } else {
        (14, ethertype)
    };
    if ethertype != 0x0800 || frame.len() < ip_off + 20 {
        return None;
    }

    let ihl = ((frame[ip_off] & 0x0f) as usize) * 4;
    if frame[ip_off + 9] != 6 {
        return None;
    }
    let tcp_off = ip_off + ihl;
    if frame.len() < tcp_off + 13 {
        return None;
    }
    let data_off = ((frame[tcp_off + 12] >> 4) as usize) * 4;
    let payload_off = tcp_off + data_off;
    if payload_off >= frame.len() {
        return None;
    }
    Some(&frame[payload_off..])
}

fn parse_request(payload: &[u8]) -> PacketOutcome {
    let Some(end) = payload.windows(4).position(|w| w == b"\r\n\r\n") else {
        return PacketOutcome::Skip(SkipReason::TruncatedHeaders);
    };
    let head = String::from_utf8_lossy(&payload[..end]);
    let mut lines = head.lines();

    // Request line: METHOD SP URI SP VERSION
    let request_line = lines.next().unwrap_or("");
    let uri = request_line.split_whitespace().nth(1).unwrap_or("");
    if uri.is_empty() {
        return PacketOutcome::Skip(SkipReason::MissingField("request_uri"));
    }

    let mut host = None;
    let mut user_agent = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if name.eq_ignore_ascii_case("host") {
            host.get_or_insert_with(|| value.to_string());
        } else if name.eq_ignore_ascii_case("user-agent") {
            user_agent.get_or_insert_with(|| value.to_string());
        }
    }

    let Some(host) = host else {
        return PacketOutcome::Skip(SkipReason::MissingField("host"));
    };
    let Some(user_agent) = user_agent else {
        return PacketOutcome::Skip(SkipReason::MissingField("user_agent"));
    };

    PacketOutcome::Request(HttpRecord {
        user_agent,
        host,
        uri: uri.to_string(),
    })
}
