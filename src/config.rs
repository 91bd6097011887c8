use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::Error;
use crate::ip::{DEFAULT_IPV4_URL, DEFAULT_IPV6_URL};
use crate::provider::client::CLOUDFLARE_API_BASE;

const MISSING_CREDENTIALS: &str = "Please specify a Cloudflare token using -t/--token and a \
domain using -d/--domain, or set CF_TOKEN and CF_DOMAIN. Tokens can be created at \
https://dash.cloudflare.com/profile/api-tokens and only need the Zone.DNS permission.";

/// Contents of the optional TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    #[serde(default)]
    pub ip: IpConfig,
}

#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudflareConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default)]
    pub proxy: bool,
}

impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("domain", &self.domain)
            .field("ipv6", &self.ipv6)
            .field("proxy", &self.proxy)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpConfig {
    #[serde(default)]
    pub ipv4_url: Option<String>,
    #[serde(default)]
    pub ipv6_url: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

/// Values given on the command line or through the environment
#[derive(Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub domain: Option<String>,
    pub ipv6: bool,
    pub proxy: bool,
    pub debug: bool,
}

/// Everything a run needs, after merging overrides over the config file
#[derive(Clone)]
pub struct Settings {
    /// NEVER log this value
    pub token: String,
    pub domain: String,
    pub ipv6: bool,
    pub proxy: bool,
    pub log_level: String,
    pub api_base: String,
    pub ipv4_url: String,
    pub ipv6_url: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("ipv6", &self.ipv6)
            .field("proxy", &self.proxy)
            .field("log_level", &self.log_level)
            .field("api_base", &self.api_base)
            .field("ipv4_url", &self.ipv4_url)
            .field("ipv6_url", &self.ipv6_url)
            .finish()
    }
}

impl Settings {
    /// Flags win over the file; the file wins over built-in defaults.
    pub fn resolve(overrides: Overrides, config: Config) -> Result<Self, Error> {
        let token = non_empty(overrides.token).or(non_empty(config.cloudflare.token));
        let domain = non_empty(overrides.domain).or(non_empty(config.cloudflare.domain));

        let (token, domain) = match (token, domain) {
            (Some(token), Some(domain)) => (token, domain),
            _ => return Err(Error::config(MISSING_CREDENTIALS)),
        };

        let log_level = if overrides.debug {
            "debug".to_string()
        } else {
            config.log_level.unwrap_or_else(|| "info".to_string())
        };

        Ok(Self {
            token,
            domain,
            ipv6: overrides.ipv6 || config.cloudflare.ipv6,
            proxy: overrides.proxy || config.cloudflare.proxy,
            log_level,
            api_base: config
                .api_base
                .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string()),
            ipv4_url: config
                .ip
                .ipv4_url
                .unwrap_or_else(|| DEFAULT_IPV4_URL.to_string()),
            ipv6_url: config
                .ip
                .ipv6_url
                .unwrap_or_else(|| DEFAULT_IPV6_URL.to_string()),
        })
    }

    /// Echo endpoint for the configured address family
    pub fn ip_url(&self) -> &str {
        if self.ipv6 {
            &self.ipv6_url
        } else {
            &self.ipv4_url
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
