//! RDAP (Registration Data Access Protocol) implementation.
//!
//! RDAP is the JSON-over-HTTPS successor to WHOIS. The client here performs a
//! single GET against a registry base URL and returns the document untouched;
//! field extraction happens in [`crate::normalize`].

use super::LookupClient;
use crate::error::LookupError;
use crate::types::{Endpoint, Protocol, QueryTarget, RawResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// RDAP client over a shared, keep-alive HTTP connection pool.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
}

impl RdapClient {
    /// Create a new RDAP client with default settings.
    pub fn new() -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("domain-checker/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                LookupError::config(format!("Failed to create RDAP HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }

    /// Reuse an existing HTTP client (and its connection pool).
    pub fn with_http_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn fetch(&self, url: &str, target: &QueryTarget) -> Result<RawResponse, LookupError> {
        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, RDAP_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(url = %url, status = %status, bytes = body.len(), "RDAP response");

        interpret_response(url, target, status, body)
    }
}

#[async_trait]
impl LookupClient for RdapClient {
    fn protocol(&self) -> Protocol {
        Protocol::Rdap
    }

    async fn lookup(
        &self,
        endpoint: &Endpoint,
        target: &QueryTarget,
        timeout: Duration,
    ) -> Result<RawResponse, LookupError> {
        let Endpoint::Rdap { base_url } = endpoint else {
            return Err(LookupError::internal(format!(
                "RDAP client cannot use endpoint {}",
                endpoint
            )));
        };

        let url = object_url(base_url, target);
        tracing::debug!(url = %url, "RDAP query");

        match tokio::time::timeout(timeout, self.fetch(&url, target)).await {
            Ok(result) => result.map_err(|e| e.with_budget(timeout)),
            Err(_) => Err(LookupError::timeout(format!("RDAP request to {}", url), timeout)),
        }
    }
}

/// Full object URL under a base: `domain/`, `ip/` or `autnum/`.
pub fn object_url(base_url: &str, target: &QueryTarget) -> String {
    let base = base_url.trim_end_matches('/');
    match target {
        QueryTarget::Domain(name) => format!("{}/domain/{}", base, name),
        QueryTarget::Ip(ip) => format!("{}/ip/{}", base, ip),
        QueryTarget::Asn(asn) => format!("{}/autnum/{}", base, asn),
    }
}

/// Map an HTTP status and body onto a raw response or a typed error.
fn interpret_response(
    url: &str,
    target: &QueryTarget,
    status: StatusCode,
    body: String,
) -> Result<RawResponse, LookupError> {
    match status {
        StatusCode::NOT_FOUND => Err(LookupError::not_found(
            target.to_string(),
            format!("RDAP server returned HTTP 404 for {}", url),
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(LookupError::protocol(
            url,
            "HTTP 429: server is rate limiting queries",
        )),
        s if s.is_success() => {
            let json: serde_json::Value = serde_json::from_str(&body)
                .map_err(|e| LookupError::protocol(url, format!("Invalid JSON: {}", e)))?;

            if !json.is_object() {
                return Err(LookupError::protocol(url, "Expected a JSON object"));
            }
            // Some servers answer 200 with an RDAP error document.
            if json.get("errorCode").and_then(|c| c.as_u64()) == Some(404) {
                return Err(LookupError::not_found(
                    target.to_string(),
                    error_title(&json).unwrap_or_else(|| "RDAP errorCode 404".to_string()),
                ));
            }

            Ok(RawResponse::Rdap {
                url: url.to_string(),
                body,
                json,
            })
        }
        s => {
            let json = serde_json::from_str::<serde_json::Value>(&body).ok();
            let detail = json.as_ref().and_then(error_title);
            if json
                .as_ref()
                .and_then(|j| j.get("errorCode"))
                .and_then(|c| c.as_u64())
                == Some(404)
            {
                return Err(LookupError::not_found(
                    target.to_string(),
                    detail.unwrap_or_else(|| format!("RDAP errorCode 404 with HTTP {}", s.as_u16())),
                ));
            }
            Err(LookupError::protocol(
                url,
                match detail {
                    Some(title) => format!("HTTP {}: {}", s.as_u16(), title),
                    None => format!("HTTP {}", s.as_u16()),
                },
            ))
        }
    }
}

fn error_title(json: &serde_json::Value) -> Option<String> {
    json.get("title")
        .and_then(|t| t.as_str())
        .or_else(|| {
            json.get("description")
                .and_then(|d| d.as_array())
                .and_then(|d| d.first())
                .and_then(|d| d.as_str())
        })
        .map(String::from)
}
