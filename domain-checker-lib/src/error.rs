//! Error handling for lookup operations.
//!
//! Every failure mode of the engine maps onto one [`LookupError`] variant. Protocol
//! failures never escape a lookup: they end up inside a [`crate::LookupOutcome`].
//! Only configuration mistakes are returned as hard `Err` values.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Coarse error category, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    EndpointResolution,
    UnsupportedTld,
    Connection,
    Timeout,
    Protocol,
    NotFound,
    Config,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::EndpointResolution => "endpoint_resolution",
            Self::UnsupportedTld => "unsupported_tld",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
            Self::NotFound => "not_found",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main error type for lookup operations.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupError {
    /// Bad input (empty target, malformed label, invalid TLD). Never retried.
    #[error("Invalid target '{target}': {reason}")]
    Validation { target: String, reason: String },

    /// No authoritative server could be determined for the target.
    #[error("Cannot resolve {protocol} endpoint for '{target}': {message}")]
    EndpointResolution {
        target: String,
        protocol: String,
        message: String,
    },

    /// The TLD has no known server for the requested protocol.
    #[error("No {protocol} server known for TLD '.{tld}'")]
    UnsupportedTld { tld: String, protocol: String },

    /// Network-layer failure (refused, reset, DNS failure of the server name).
    #[error("Connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    /// The time budget ran out.
    #[error("Timeout{} during: {operation}", budget_suffix(.duration))]
    Timeout {
        operation: String,
        #[serde(with = "crate::types::duration_secs")]
        duration: Duration,
    },

    /// The server answered, but not with something we can use.
    #[error("Protocol error from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },

    /// The server explicitly said the object does not exist.
    #[error("'{target}' not found: {message}")]
    NotFound { target: String, message: String },

    /// Auto mode: RDAP failed and so did the WHOIS fallback.
    #[error("{primary} (WHOIS fallback: {fallback})")]
    Fallback {
        primary: Box<LookupError>,
        fallback: Box<LookupError>,
    },

    /// Invalid settings.
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LookupError {
    pub fn validation<T: Into<String>, R: Into<String>>(target: T, reason: R) -> Self {
        Self::Validation {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn endpoint_resolution<T, P, M>(target: T, protocol: P, message: M) -> Self
    where
        T: Into<String>,
        P: Into<String>,
        M: Into<String>,
    {
        Self::EndpointResolution {
            target: target.into(),
            protocol: protocol.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_tld<T: Into<String>, P: Into<String>>(tld: T, protocol: P) -> Self {
        Self::UnsupportedTld {
            tld: tld.into(),
            protocol: protocol.into(),
        }
    }

    pub fn connection<E: Into<String>, M: Into<String>>(endpoint: E, message: M) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn protocol<E: Into<String>, M: Into<String>>(endpoint: E, message: M) -> Self {
        Self::Protocol {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn not_found<T: Into<String>, M: Into<String>>(target: T, message: M) -> Self {
        Self::NotFound {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Attach a WHOIS fallback failure to the primary RDAP failure.
    pub fn with_fallback(primary: LookupError, fallback: LookupError) -> Self {
        Self::Fallback {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The taxonomy kind. A fallback chain reports its primary failure's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::EndpointResolution { .. } => ErrorKind::EndpointResolution,
            Self::UnsupportedTld { .. } => ErrorKind::UnsupportedTld,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Fallback { primary, .. } => primary.kind(),
            Self::Config { .. } => ErrorKind::Config,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Fill in the budget of a timeout converted from a lower-level error.
    pub fn with_budget(self, budget: Duration) -> Self {
        match self {
            Self::Timeout {
                operation,
                duration,
            } if duration.is_zero() => Self::Timeout {
                operation,
                duration: budget,
            },
            other => other,
        }
    }

    /// Whether auto mode may move on to WHOIS after this RDAP failure.
    ///
    /// Bad input is the only thing the fallback cannot fix.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(self, Self::Validation { .. } | Self::Config { .. })
    }

    /// Check if this error is an explicit negative answer from a server.
    pub fn indicates_not_registered(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Fallback { primary, fallback } => {
                primary.indicates_not_registered() || fallback.indicates_not_registered()
            }
            _ => false,
        }
    }
}

fn budget_suffix(duration: &Duration) -> String {
    if duration.is_zero() {
        String::new()
    } else {
        format!(" after {:?}", duration)
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "RDAP server".to_string());
        if err.is_timeout() {
            Self::timeout(format!("HTTP request to {}", endpoint), Duration::ZERO)
        } else if err.is_decode() || err.is_body() {
            Self::protocol(endpoint, format!("Unreadable response body: {}", err))
        } else {
            Self::connection(endpoint, err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::protocol("RDAP server", format!("Invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for LookupError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::timeout("socket I/O", Duration::ZERO),
            _ => Self::connection("socket", err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_reports_primary_kind() {
        let err = LookupError::with_fallback(
            LookupError::unsupported_tld("zz", "RDAP"),
            LookupError::connection("whois.nic.zz:43", "refused"),
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedTld);
        assert!(err.to_string().contains("WHOIS fallback"));
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(LookupError::timeout("rdap", Duration::from_secs(1)).is_fallback_eligible());
        assert!(LookupError::not_found("a.com", "404").is_fallback_eligible());
        assert!(!LookupError::validation("", "empty").is_fallback_eligible());
    }

    #[test]
    fn test_not_registered_signal() {
        assert!(LookupError::not_found("a.com", "404").indicates_not_registered());
        assert!(!LookupError::connection("x", "y").indicates_not_registered());
        let chained = LookupError::with_fallback(
            LookupError::not_found("a.com", "404"),
            LookupError::connection("x", "y"),
        );
        assert!(chained.indicates_not_registered());
    }

    #[test]
    fn test_converted_timeout_gets_budget() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err = LookupError::from(io);
        assert_eq!(err.to_string(), "Timeout during: socket I/O");

        let err = err.with_budget(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Timeout after 5s during: socket I/O");

        // An explicit duration is left alone.
        let err = LookupError::timeout("rdap", Duration::from_secs(2))
            .with_budget(Duration::from_secs(30));
        assert!(matches!(err, LookupError::Timeout { duration, .. } if duration == Duration::from_secs(2)));
        assert!(!err.to_string().contains("0ns"));
    }

    #[test]
    fn test_serialize_tagged() {
        let err = LookupError::timeout("whois", Duration::from_millis(1500));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["duration"], 1.5);
    }
}
