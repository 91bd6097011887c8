use log::debug;
use reqwest::Method;
use serde::Deserialize;

use super::client::{decode, ApiClient, Transport};
use super::{DnsRecord, Envelope, RecordType};
use crate::error::{LogicError, ReconcileError};

/// A zone listing holds every record type, not just the ones we manage
#[derive(Debug, Clone, Deserialize)]
struct ListedRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    proxied: bool,
    #[serde(default)]
    comment: Option<String>,
}

impl TryFrom<ListedRecord> for DnsRecord {
    type Error = LogicError;

    fn try_from(listed: ListedRecord) -> Result<Self, Self::Error> {
        let record_type = RecordType::try_from(listed.record_type.as_str()).map_err(|record_type| {
            LogicError::UnsupportedRecordType {
                name: listed.name.clone(),
                record_type,
            }
        })?;

        Ok(DnsRecord {
            id: listed.id,
            record_type,
            name: listed.name,
            content: listed.content,
            ttl: listed.ttl,
            proxied: listed.proxied,
            comment: listed.comment,
        })
    }
}

pub fn records_path(zone_id: &str) -> String {
    format!("/zones/{}/dns_records", zone_id)
}

/// Find the record named exactly `domain` in `zone_id`, if there is one.
///
/// Names are compared verbatim: no case folding, no trailing-dot handling.
/// When several records share the name the last one listed wins.
pub async fn resolve_record<T: Transport>(
    client: &ApiClient<T>,
    zone_id: &str,
    domain: &str,
) -> Result<Option<DnsRecord>, ReconcileError> {
    let path = records_path(zone_id);
    let response = client.get(&path).await?;
    let listing: Envelope<Vec<ListedRecord>> = decode(Method::GET, &path, response)?;

    let found = listing
        .result
        .into_iter()
        .filter(|record| record.name == domain)
        .last();

    match found {
        Some(listed) => {
            let record = DnsRecord::try_from(listed)?;
            debug!(
                "Fetched DNS record ({}/{}), last comment: {}",
                record.name,
                record.content,
                record.comment.as_deref().unwrap_or("-")
            );
            Ok(Some(record))
        }
        None => {
            debug!("No record named {} in zone {}", domain, zone_id);
            Ok(None)
        }
    }
}
