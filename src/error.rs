//! Error types for cddns
//!
//! Every failure of a run ends up as one of the variants of [`Error`], which
//! maps onto a distinct process exit code.

use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

/// Provider error code for a malformed or revoked API token
const INVALID_TOKEN_CODE: i64 = 9109;

/// First entry of the provider's `errors` array, when the error body parses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderErrorDetail {
    pub code: i64,
    pub message: String,
}

/// Communication failure talking to the provider API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response
    #[error("{method} {path} failed: {message}")]
    Transport {
        method: Method,
        path: String,
        message: String,
    },

    /// The provider answered with something other than HTTP 200
    #[error("{method} {path} failed with HTTP {status}{}", detail_suffix(.detail))]
    Status {
        method: Method,
        path: String,
        status: u16,
        detail: Option<ProviderErrorDetail>,
    },

    /// HTTP 200, but the body was not the JSON we expected
    #[error("{method} {path} returned an unreadable response: {message}")]
    Decode {
        method: Method,
        path: String,
        message: String,
    },
}

fn detail_suffix(detail: &Option<ProviderErrorDetail>) -> String {
    match detail {
        Some(d) => format!(": {}: {}", d.code, d.message),
        None => String::new(),
    }
}

impl ApiError {
    pub fn method(&self) -> &Method {
        match self {
            Self::Transport { method, .. }
            | Self::Status { method, .. }
            | Self::Decode { method, .. } => method,
        }
    }

    /// HTTP status, if the provider answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Decode { .. } => Some(200),
            Self::Transport { .. } => None,
        }
    }

    pub fn detail(&self) -> Option<&ProviderErrorDetail> {
        match self {
            Self::Status { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// Whether the failed call was writing a record rather than looking one up
    pub fn is_write(&self) -> bool {
        *self.method() != Method::GET
    }
}

/// Well-formed provider answers that still leave nothing to reconcile.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogicError {
    #[error(
        "no zone named {root} was found for {domain} - does the token have clearance to the DNS?"
    )]
    ZoneNotFound { domain: String, root: String },

    #[error("{name} is a {record_type} record, only A and AAAA records can be managed")]
    UnsupportedRecordType { name: String, record_type: String },
}

/// Anything that stops the reconciler from reaching a final record state.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Communication(#[from] ApiError),

    #[error(transparent)]
    Logic(#[from] LogicError),
}

/// Failure fetching the machine's public address.
#[derive(Error, Debug)]
pub enum IpDiscoveryError {
    #[error("failure retrieving IP address from {url}: {message}")]
    Transport { url: String, message: String },

    #[error("failure retrieving IP address from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned {body:?}, which is not an {family} address")]
    Invalid {
        url: String,
        body: String,
        family: &'static str,
    },
}

/// Top-level error of a run
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    IpDiscovery(#[from] IpDiscoveryError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(anyhow::anyhow!(msg.into()))
    }

    /// Extra guidance for failures that usually mean a bad or under-scoped token
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Reconcile(ReconcileError::Communication(e))
                if !e.is_write()
                    && (matches!(e.status(), Some(400 | 401 | 403))
                        || matches!(e.detail(), Some(d) if d.code == INVALID_TOKEN_CODE)) =>
            {
                Some("is your token correct?")
            }
            _ => None,
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Reconcile(ReconcileError::Logic(_)) => 4,
            Self::Reconcile(ReconcileError::Communication(e)) if e.is_write() => 6,
            Self::Reconcile(ReconcileError::Communication(_)) => 5,
            Self::IpDiscovery(_) => 7,
        }
    }
}
