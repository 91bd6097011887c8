use std::net::IpAddr;

use log::debug;
use reqwest::Method;

use crate::error::IpDiscoveryError;
use crate::provider::client::{HttpRequest, Transport};

pub const DEFAULT_IPV4_URL: &str = "https://4.ident.me/";
pub const DEFAULT_IPV6_URL: &str = "https://6.ident.me/";

/// Ask an echo service for this machine's public address.
///
/// The body must be a bare address of the requested family.
pub async fn discover<T: Transport>(
    transport: &T,
    url: &str,
    ipv6: bool,
) -> Result<IpAddr, IpDiscoveryError> {
    let request = HttpRequest {
        method: Method::GET,
        url: url.to_string(),
        headers: Vec::new(),
        body: None,
    };

    let response = transport
        .send(request)
        .await
        .map_err(|e| IpDiscoveryError::Transport {
            url: url.to_string(),
            message: format!("{:#}", e),
        })?;

    if response.status != 200 {
        return Err(IpDiscoveryError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }

    let text = response.body.trim();
    let family = if ipv6 { "IPv6" } else { "IPv4" };
    let invalid = || IpDiscoveryError::Invalid {
        url: url.to_string(),
        body: text.to_string(),
        family,
    };

    let ip: IpAddr = text.parse().map_err(|_| invalid())?;
    if ip.is_ipv6() != ipv6 {
        return Err(invalid());
    }

    debug!("Current IP address: {}", ip);
    Ok(ip)
}
