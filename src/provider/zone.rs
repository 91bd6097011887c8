use log::debug;
use reqwest::Method;

use super::client::{decode, ApiClient, Transport};
use super::{Envelope, Zone};
use crate::error::{LogicError, ReconcileError};

const ZONES_PATH: &str = "/zones/";

/// The last two dot-separated labels of `domain`.
///
/// No public suffix list is consulted, so `foo.example.co.uk` yields `co.uk`.
pub fn registrable_root(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

/// Id of the zone named `root`. When several zones share the name the last
/// one listed wins.
pub fn find_zone<'a>(zones: &'a [Zone], root: &str) -> Option<&'a Zone> {
    zones
        .iter()
        .fold(None, |found, zone| if zone.name == root { Some(zone) } else { found })
}

/// Look up the provider's zone id for the zone containing `domain`.
pub async fn resolve_zone<T: Transport>(
    client: &ApiClient<T>,
    domain: &str,
) -> Result<String, ReconcileError> {
    let root = registrable_root(domain);
    debug!("Looking up zone for {} (root {})", domain, root);

    let response = client.get(ZONES_PATH).await?;
    let zones: Envelope<Vec<Zone>> = decode(Method::GET, ZONES_PATH, response)?;

    match find_zone(&zones.result, &root) {
        Some(zone) => {
            debug!("Fetched zone token {}", zone.id);
            Ok(zone.id.clone())
        }
        None => Err(LogicError::ZoneNotFound {
            domain: domain.to_string(),
            root,
        }
        .into()),
    }
}
