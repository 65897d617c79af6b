//! Resolver error types.

/// Errors from an envelope lookup.
///
/// These never reach the host; the resolver logs them and hands the
/// continuation `None`.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The request did not complete within the configured timeout.
    #[error("{endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },
    /// The endpoint returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Reading the response body failed.
    #[error("failed to read response body from {endpoint}: {source}")]
    Body {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
