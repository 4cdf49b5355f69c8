//! WHOIS protocol implementation.
//!
//! Speaks the RFC 3912 text protocol directly: connect to port 43, send one
//! query line, read until the server closes the connection. Responses are
//! returned as-is; field extraction happens in the normalizer.

use super::registry::IANA_WHOIS_SERVER;
use super::LookupClient;
use crate::error::LookupError;
use crate::types::{Endpoint, Protocol, QueryTarget, RawResponse};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// Responses larger than this are rejected.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Throttling notices are short; full records that mention these words are not.
const RATE_LIMIT_NOTICE_MAX_LEN: usize = 512;

/// WHOIS client over raw TCP.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    max_response_bytes: usize,
    follow_referrals: bool,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self {
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            follow_referrals: true,
        }
    }

    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    /// Whether IANA `refer:` answers for IP and ASN queries are followed (one hop).
    pub fn with_referrals(mut self, follow: bool) -> Self {
        self.follow_referrals = follow;
        self
    }

    /// Run one query against `host:port`, reading until the server closes.
    ///
    /// Data followed by a timeout instead of a close is a truncated answer and
    /// is reported as a protocol error.
    async fn query(
        &self,
        host: &str,
        port: u16,
        query: &str,
        deadline: Instant,
        budget: Duration,
    ) -> Result<String, LookupError> {
        let endpoint = format!("{}:{}", host, port);

        let mut stream = match timeout_at(deadline, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(LookupError::connection(&endpoint, e.to_string())),
            Err(_) => {
                return Err(LookupError::timeout(
                    format!("WHOIS connect to {}", endpoint),
                    budget,
                ))
            }
        };

        let line = format!("{}\r\n", query);
        match timeout_at(deadline, stream.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(LookupError::connection(&endpoint, e.to_string())),
            Err(_) => {
                return Err(LookupError::timeout(
                    format!("WHOIS query to {}", endpoint),
                    budget,
                ))
            }
        }

        let mut response = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match timeout_at(deadline, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&chunk[..n]);
                    if response.len() > self.max_response_bytes {
                        return Err(LookupError::protocol(
                            &endpoint,
                            format!("Response exceeds {} bytes", self.max_response_bytes),
                        ));
                    }
                }
                Ok(Err(e)) if response.is_empty() => {
                    return Err(LookupError::connection(&endpoint, e.to_string()))
                }
                Ok(Err(e)) => {
                    return Err(LookupError::protocol(
                        &endpoint,
                        format!("Connection lost after partial response: {}", e),
                    ))
                }
                Err(_) if response.is_empty() => {
                    return Err(LookupError::timeout(
                        format!("WHOIS response from {}", endpoint),
                        budget,
                    ))
                }
                Err(_) => {
                    return Err(LookupError::protocol(
                        &endpoint,
                        format!(
                            "Incomplete response: {} bytes received, connection not closed",
                            response.len()
                        ),
                    ))
                }
            }
        }

        if response.iter().all(u8::is_ascii_whitespace) {
            return Err(LookupError::protocol(&endpoint, "Empty response"));
        }

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupClient for WhoisClient {
    fn protocol(&self) -> Protocol {
        Protocol::Whois
    }

    async fn lookup(
        &self,
        endpoint: &Endpoint,
        target: &QueryTarget,
        timeout: Duration,
    ) -> Result<RawResponse, LookupError> {
        let Endpoint::Whois { host, port } = endpoint else {
            return Err(LookupError::internal(format!(
                "WHOIS client cannot use endpoint {}",
                endpoint
            )));
        };

        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Err(LookupError::config(format!(
                "WHOIS timeout {:?} is too large",
                timeout
            )));
        };
        let query = query_line(host, target);
        tracing::debug!(server = %host, query = %query, "WHOIS query");

        let mut server = host.clone();
        let mut text = self
            .query(host, *port, &query, deadline, timeout)
            .await
            .map_err(|e| e.with_budget(timeout))?;

        if self.follow_referrals && host == IANA_WHOIS_SERVER && !target.is_domain() {
            if let Some(refer) = parse_iana_refer_response(&text) {
                if refer != *host {
                    tracing::debug!(referral = %refer, "following IANA referral");
                    match self
                        .query(&refer, Endpoint::WHOIS_PORT, &query, deadline, timeout)
                        .await
                    {
                        Ok(referred) => {
                            server = refer;
                            text = referred;
                        }
                        Err(e) => {
                            tracing::warn!(referral = %refer, error = %e, "WHOIS referral failed, keeping IANA answer");
                        }
                    }
                }
            }
        }

        if is_rate_limited(&text) {
            return Err(LookupError::protocol(
                format!("{}:{}", server, port),
                "Server is rate limiting queries",
            ));
        }

        Ok(RawResponse::Whois { server, text })
    }
}

/// The query line for a target. Some registries need extra flags.
fn query_line(host: &str, target: &QueryTarget) -> String {
    match target {
        QueryTarget::Domain(name) if host == "whois.denic.de" => format!("-T dn,ace {}", name),
        QueryTarget::Domain(name) if host == "whois.verisign-grs.com" => format!("domain {}", name),
        other => other.to_string(),
    }
}

/// Check if a WHOIS response is a throttling notice rather than data.
fn is_rate_limited(output: &str) -> bool {
    if output.len() > RATE_LIMIT_NOTICE_MAX_LEN {
        return false;
    }
    let output_lower = output.to_lowercase();
    let rate_limit_patterns = [
        "rate limit exceeded",
        "too many requests",
        "try again later",
        "quota exceeded",
        "limit exceeded",
        "throttled",
        "rate-limited",
    ];

    rate_limit_patterns
        .iter()
        .any(|pattern| output_lower.contains(pattern))
}

/// Parse an IANA WHOIS response for the authoritative WHOIS server.
///
/// IANA answers with either `refer:` or `whois:`; `refer:` wins when both
/// are present.
///
/// ```text
/// whois:        whois.arin.net
/// refer:        whois.arin.net
/// ```
pub fn parse_iana_refer_response(response: &str) -> Option<String> {
    let mut whois_server = None;

    for line in response.lines() {
        let line_trimmed = line.trim();
        if let Some(server) = line_trimmed.strip_prefix("refer:") {
            let server = server.trim();
            if !server.is_empty() {
                return Some(server.to_string());
            }
        } else if let Some(server) = line_trimmed.strip_prefix("whois:") {
            let server = server.trim();
            if !server.is_empty() {
                whois_server = Some(server.to_string());
            }
        }
    }

    whois_server
}
