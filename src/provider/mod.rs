pub mod client;
pub mod cloudflare;
pub mod record;
pub mod zone;

#[cfg(test)]
pub mod testing;

use std::fmt;

use serde::{Deserialize, Serialize};

/// TTL given to records this tool creates
pub const DEFAULT_TTL: u32 = 3600;

/// Address record types this tool manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    pub fn for_family(ipv6: bool) -> Self {
        if ipv6 {
            Self::Aaaa
        } else {
            Self::A
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
        }
    }
}

impl TryFrom<&str> for RecordType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side container of all records under a registrable root
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Body of a create (POST) or update (PUT) call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub comment: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// Final record state of a successful run, as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Created(DnsRecord),
    Updated(DnsRecord),
}

impl ReconciliationOutcome {
    pub fn record(&self) -> &DnsRecord {
        match self {
            Self::Created(record) | Self::Updated(record) => record,
        }
    }
}

/// Every provider response wraps its payload in `result`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
}
