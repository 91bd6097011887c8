use log::info;
use reqwest::Method;
use time::macros::format_description;
use time::OffsetDateTime;

use super::client::{decode, ApiClient, Transport};
use super::record::{records_path, resolve_record};
use super::zone::resolve_zone;
use super::{DnsRecord, Envelope, RecordPayload, RecordType, ReconciliationOutcome, DEFAULT_TTL};
use crate::error::{ApiError, ReconcileError};

/// What the caller wants `domain` to point at
#[derive(Debug, Clone)]
pub struct Target<'a> {
    pub domain: &'a str,
    pub ip: &'a str,
    /// Type of a newly created record
    pub ipv6: bool,
    /// Proxy flag of a newly created record
    pub proxy: bool,
}

/// Point `target.domain` at `target.ip`, creating the record if the zone has
/// none by that name.
pub async fn reconcile<T: Transport>(
    client: &ApiClient<T>,
    target: &Target<'_>,
) -> Result<ReconciliationOutcome, ReconcileError> {
    let zone_id = resolve_zone(client, target.domain).await?;
    let comment = change_comment(now());

    match resolve_record(client, &zone_id, target.domain).await? {
        Some(existing) => {
            info!(
                "Updating existing record {} from {} to {}",
                existing.name, existing.content, target.ip
            );
            let payload = update_payload(&existing, target.ip, comment);
            let record = update_existing_record(client, &zone_id, &existing.id, &payload).await?;
            Ok(ReconciliationOutcome::Updated(record))
        }
        None => {
            let payload = create_payload(target, comment);
            info!(
                "Creating new {} record {} with IP {}",
                payload.record_type, payload.name, payload.content
            );
            let record = create_record(client, &zone_id, &payload).await?;
            Ok(ReconciliationOutcome::Created(record))
        }
    }
}

/// Only the content changes; type, TTL and proxying stay as they were.
pub fn update_payload(existing: &DnsRecord, ip: &str, comment: String) -> RecordPayload {
    RecordPayload {
        record_type: existing.record_type,
        name: existing.name.clone(),
        content: ip.to_string(),
        comment,
        ttl: existing.ttl,
        proxied: existing.proxied,
    }
}

pub fn create_payload(target: &Target<'_>, comment: String) -> RecordPayload {
    RecordPayload {
        record_type: RecordType::for_family(target.ipv6),
        name: target.domain.to_string(),
        content: target.ip.to_string(),
        comment,
        ttl: DEFAULT_TTL,
        proxied: target.proxy,
    }
}

pub fn change_comment(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let stamp = at
        .format(&format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("Automatic by DDNS - Set {}", stamp)
}

// Local time when the offset is knowable, UTC otherwise
fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

async fn create_record<T: Transport>(
    client: &ApiClient<T>,
    zone_id: &str,
    payload: &RecordPayload,
) -> Result<DnsRecord, ReconcileError> {
    let path = records_path(zone_id);
    write_record(client, Method::POST, &path, payload).await
}

async fn update_existing_record<T: Transport>(
    client: &ApiClient<T>,
    zone_id: &str,
    record_id: &str,
    payload: &RecordPayload,
) -> Result<DnsRecord, ReconcileError> {
    let path = format!("{}/{}", records_path(zone_id), record_id);
    write_record(client, Method::PUT, &path, payload).await
}

async fn write_record<T: Transport>(
    client: &ApiClient<T>,
    method: Method,
    path: &str,
    payload: &RecordPayload,
) -> Result<DnsRecord, ReconcileError> {
    let body = serde_json::to_value(payload).map_err(|e| ApiError::Decode {
        method: method.clone(),
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let response = client.request(method.clone(), path, Some(body)).await?;
    let envelope: Envelope<DnsRecord> = decode(method, path, response)?;
    Ok(envelope.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogicError;
    use crate::provider::testing::FakeTransport;
    use serde_json::{json, Value};
    use time::macros::datetime;

    const ZONES: &str = r#"{"result":[{"id":"Z1","name":"example.com"}]}"#;

    fn target<'a>(ip: &'a str, ipv6: bool, proxy: bool) -> Target<'a> {
        Target {
            domain: "home.example.com",
            ip,
            ipv6,
            proxy,
        }
    }

    /// Echo the written payload back as the provider would
    fn echo(id: &str, body: &Value) -> Value {
        let mut record = body.clone();
        record["id"] = json!(id);
        json!({ "result": record })
    }

    fn sent_body(transport: &FakeTransport, index: usize) -> Value {
        transport.requests()[index].body.clone().unwrap()
    }

    #[test]
    fn test_change_comment_format() {
        let comment = change_comment(datetime!(2024-03-05 07:08:09 UTC));
        assert_eq!(comment, "Automatic by DDNS - Set 2024-03-05 07:08:09");
    }

    #[test]
    fn test_create_payload_follows_request_flags() {
        let v4 = create_payload(&target("203.0.113.9", false, false), "c".to_string());
        assert_eq!(v4.record_type, RecordType::A);
        assert_eq!(v4.ttl, 3600);
        assert!(!v4.proxied);

        let v6 = create_payload(&target("2001:db8::2", true, true), "c".to_string());
        assert_eq!(v6.record_type, RecordType::Aaaa);
        assert_eq!(v6.ttl, 3600);
        assert!(v6.proxied);
    }

    #[test]
    fn test_update_payload_keeps_existing_settings() {
        let existing = DnsRecord {
            id: "R1".to_string(),
            record_type: RecordType::Aaaa,
            name: "home.example.com".to_string(),
            content: "2001:db8::1".to_string(),
            ttl: 120,
            proxied: true,
            comment: None,
        };

        let payload = update_payload(&existing, "2001:db8::2", "c".to_string());

        assert_eq!(payload.record_type, RecordType::Aaaa);
        assert_eq!(payload.name, "home.example.com");
        assert_eq!(payload.content, "2001:db8::2");
        assert_eq!(payload.ttl, 120);
        assert!(payload.proxied);
    }

    #[tokio::test]
    async fn test_creates_missing_record() {
        let transport = FakeTransport::new();
        transport.push(200, ZONES);
        transport.push_json(200, json!({ "result": [] }));
        transport.push_json(
            200,
            json!({ "result": {
                "id": "R9", "type": "A", "name": "home.example.com",
                "content": "203.0.113.9", "ttl": 3600, "proxied": false,
                "comment": "Automatic by DDNS - Set 2024-01-01 00:00:00"
            } }),
        );
        let client = ApiClient::new(&transport, "https://api.test", "token");

        let outcome = reconcile(&client, &target("203.0.113.9", false, false))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[1].method, Method::GET);
        assert_eq!(requests[2].method, Method::POST);
        assert_eq!(requests[2].url, "https://api.test/zones/Z1/dns_records");

        let body = sent_body(&transport, 2);
        assert_eq!(body["type"], "A");
        assert_eq!(body["name"], "home.example.com");
        assert_eq!(body["content"], "203.0.113.9");
        assert_eq!(body["ttl"], 3600);
        assert_eq!(body["proxied"], false);
        assert!(body["comment"]
            .as_str()
            .unwrap()
            .starts_with("Automatic by DDNS - Set "));

        match outcome {
            ReconciliationOutcome::Created(record) => {
                assert_eq!(record.id, "R9");
                assert_eq!(record.content, "203.0.113.9");
            }
            other => panic!("expected a created record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_creates_proxied_aaaa_record() {
        let transport = FakeTransport::new();
        transport.push(200, ZONES);
        transport.push_json(200, json!({ "result": [] }));
        transport.push_json(
            200,
            json!({ "result": {
                "id": "R9", "type": "AAAA", "name": "home.example.com",
                "content": "2001:db8::2", "ttl": 3600, "proxied": true
            } }),
        );
        let client = ApiClient::new(&transport, "https://api.test", "token");

        let outcome = reconcile(&client, &target("2001:db8::2", true, true))
            .await
            .unwrap();

        let body = sent_body(&transport, 2);
        assert_eq!(body["type"], "AAAA");
        assert_eq!(body["ttl"], 3600);
        assert_eq!(body["proxied"], true);
        assert!(matches!(outcome, ReconciliationOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_updates_existing_record_content_only() {
        let transport = FakeTransport::new();
        transport.push(200, ZONES);
        transport.push_json(
            200,
            json!({ "result": [{
                "id": "R1", "type": "AAAA", "name": "home.example.com",
                "content": "2001:db8::1", "ttl": 120, "proxied": true
            }] }),
        );
        let expected = json!({
            "type": "AAAA", "name": "home.example.com", "content": "2001:db8::2",
            "ttl": 120, "proxied": true, "comment": "stamp"
        });
        transport.push_json(200, echo("R1", &expected));
        let client = ApiClient::new(&transport, "https://api.test", "token");

        // Request flags only matter when creating
        let outcome = reconcile(&client, &target("2001:db8::2", false, false))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[2].method, Method::PUT);
        assert_eq!(requests[2].url, "https://api.test/zones/Z1/dns_records/R1");

        let body = sent_body(&transport, 2);
        assert_eq!(body["type"], "AAAA");
        assert_eq!(body["name"], "home.example.com");
        assert_eq!(body["content"], "2001:db8::2");
        assert_eq!(body["ttl"], 120);
        assert_eq!(body["proxied"], true);

        match outcome {
            ReconciliationOutcome::Updated(record) => {
                assert_eq!(record.id, "R1");
                assert_eq!(record.content, "2001:db8::2");
            }
            other => panic!("expected an updated record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zone_not_found_stops_before_record_lookup() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({ "result": [{ "id": "Z1", "name": "example.org" }] }));
        let client = ApiClient::new(&transport, "https://api.test", "token");

        let err = reconcile(&client, &target("203.0.113.9", false, false))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Logic(LogicError::ZoneNotFound { .. })
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_write_is_communication_error() {
        let transport = FakeTransport::new();
        transport.push(200, ZONES);
        transport.push_json(200, json!({ "result": [] }));
        transport.push(
            400,
            r#"{"errors":[{"code":9005,"message":"Content for A record is invalid."}]}"#,
        );
        let client = ApiClient::new(&transport, "https://api.test", "token");

        let err = reconcile(&client, &target("not-an-ip", false, false))
            .await
            .unwrap_err();

        match err {
            ReconcileError::Communication(api) => {
                assert!(api.is_write());
                assert_eq!(api.detail().unwrap().code, 9005);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_record_lookup_failure_skips_write() {
        let transport = FakeTransport::new();
        transport.push(200, ZONES);
        transport.push(500, "oops");
        let client = ApiClient::new(&transport, "https://api.test", "token");

        let err = reconcile(&client, &target("203.0.113.9", false, false))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Communication(ApiError::Status { status: 500, .. })
        ));
        assert_eq!(transport.requests().len(), 2);
    }
}
