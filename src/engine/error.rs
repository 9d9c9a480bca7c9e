//! Shared error type for fetch and extraction.
//!
//! Four failure categories cover every capability operation: `NotFound`
//! (remote resource gone), `Unreachable` (transport failure, caller may
//! retry), `ParseFailure` (response shape violates the extraction rule,
//! retrying cannot help), and `Timeout` (bound exceeded). The core never
//! retries; resilience policy belongs to the caller.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    /// Remote resource no longer exists (HTTP 404-class). Terminal for the
    /// item; not worth retrying.
    #[error("Resource not found (HTTP {status}) at {url}")]
    NotFound { url: String, status: u16 },

    /// Transport could not complete the request (DNS, connect, reset, 5xx).
    /// Eligible for caller-driven retry with backoff.
    #[error("Network error: could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Response is structurally unparsable by the expected extraction rule
    /// (selector matched nothing where a match was required, JSON shape
    /// mismatch, script returned the wrong type).
    #[error("Could not parse response from {url}: {reason}")]
    ParseFailure { url: String, reason: String },

    /// Operation exceeded its wall-clock bound. Partial pagination results
    /// are discarded; the operation as a whole fails.
    #[error("{operation} timed out after {limit:?}")]
    Timeout { operation: String, limit: Duration },

    /// A capability no layer of the decoration chain bound. Registry
    /// admission checks reject such plugins, so this never surfaces for a
    /// registered plugin; it exists as the chain terminator.
    #[error("Plugin {plugin}: no strategy provides {capability}")]
    Unsupported { plugin: String, capability: &'static str },
}

impl ScrapeError {
    /// Map a non-success HTTP status: 4xx means the resource does not exist
    /// at the remote site, 5xx means the transport/host failed.
    pub fn from_status(status: u16, url: &str) -> Self {
        if (400..500).contains(&status) {
            ScrapeError::NotFound {
                url: url.to_string(),
                status,
            }
        } else {
            ScrapeError::Unreachable {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            }
        }
    }

    /// Map a reqwest transport error, classifying timeouts separately.
    pub fn from_transport(err: reqwest::Error, url: &str, limit: Duration) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout {
                operation: format!("request to {}", url),
                limit,
            }
        } else {
            ScrapeError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
