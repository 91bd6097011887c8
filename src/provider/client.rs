use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ProviderErrorDetail};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// A single outbound HTTP call
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests over the wire. Only transport failures are errors here,
/// every HTTP status comes back as a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cddns/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", request.url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", request.url))?;

        Ok(HttpResponse { status, body })
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ProviderErrorDetail>,
}

/// Authenticated JSON client for the provider's REST API
pub struct ApiClient<T> {
    transport: T,
    base_url: String,
    /// NEVER log this value
    token: String,
}

// Hide the token from debug output
impl<T> fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Issue `method path` with an optional JSON body and return the parsed
    /// response body. Anything but HTTP 200 is an [`ApiError`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let request = HttpRequest {
            method: method.clone(),
            url: format!("{}{}", self.base_url, path),
            headers: vec![
                ("Authorization", format!("Bearer {}", self.token)),
                ("Content-Type", "application/json".to_string()),
            ],
            body,
        };

        debug!("{} {}", method, path);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ApiError::Transport {
                method: method.clone(),
                path: path.to_string(),
                message: format!("{:#}", e),
            })?;

        if response.status != 200 {
            // Only the first provider error is surfaced
            let detail = serde_json::from_str::<ErrorEnvelope>(&response.body)
                .ok()
                .and_then(|envelope| envelope.errors.into_iter().next());

            return Err(ApiError::Status {
                method,
                path: path.to_string(),
                status: response.status,
                detail,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode {
            method,
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None).await
    }
}

/// Interpret a 200 response body as `T`, blaming `method path` if it doesn't fit.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    method: Method,
    path: &str,
    value: Value,
) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode {
        method,
        path: path.to_string(),
        message: e.to_string(),
    })
}
