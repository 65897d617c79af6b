//! # Transport Invoker
//!
//! One GET per resolution. The request carries credentials (the shared cookie
//! jar) and a per-request timeout. There is no retry: a failed lookup is
//! simply a lookup without an envelope.
//!
//! ## Error mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | timeout | [`ResolveError::Timeout`] |
//! | connect / protocol failure | [`ResolveError::Http`] |
//! | non-2xx status | [`ResolveError::ApiError`] |
//! | body read failure | [`ResolveError::Body`] |

use std::sync::Arc;
use std::time::Duration;

use acrossid_core::QueryParams;
use async_trait::async_trait;
use reqwest::cookie::Jar;
use url::Url;

use crate::error::ResolveError;

/// Everything the transport needs for one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: Url,
    pub params: QueryParams,
    pub timeout: Duration,
    /// Attach cookies from (and store cookies into) the shared jar.
    pub with_credentials: bool,
}

impl TransportRequest {
    /// `"GET /v1/envelope"`-style label for logs and errors.
    pub fn endpoint(&self) -> String {
        format!("GET {}", self.url.path())
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Performs the envelope GET and returns the raw body text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &TransportRequest) -> Result<String, ResolveError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    credentialed: reqwest::Client,
    anonymous: reqwest::Client,
}

impl HttpTransport {
    /// Transport with a fresh, empty cookie jar.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_cookie_jar(Arc::new(Jar::default()))
    }

    /// Transport sharing `jar` with the caller, e.g. to pre-seed cookies the
    /// host already holds for the endpoint's domain.
    pub fn with_cookie_jar(jar: Arc<Jar>) -> Result<Self, ResolveError> {
        let build_error = |e| ResolveError::Http {
            endpoint: "client_init".into(),
            source: e,
        };
        let credentialed = reqwest::Client::builder()
            .cookie_provider(jar)
            .build()
            .map_err(build_error)?;
        let anonymous = reqwest::Client::builder().build().map_err(build_error)?;
        Ok(Self {
            credentialed,
            anonymous,
        })
    }

    fn client_for(&self, request: &TransportRequest) -> &reqwest::Client {
        if request.with_credentials {
            &self.credentialed
        } else {
            &self.anonymous
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &TransportRequest) -> Result<String, ResolveError> {
        let endpoint = request.endpoint();
        let map_send_error = |e: reqwest::Error| {
            if e.is_timeout() {
                ResolveError::Timeout {
                    endpoint: endpoint.clone(),
                    timeout_ms: request.timeout_ms(),
                }
            } else {
                ResolveError::Http {
                    endpoint: endpoint.clone(),
                    source: e,
                }
            }
        };

        tracing::debug!(endpoint = %endpoint, params = request.params.len(), "sending envelope request");

        let resp = self
            .client_for(request)
            .get(request.url.clone())
            .query(&request.params)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ResolveError::ApiError {
                endpoint,
                status,
                body,
            });
        }

        resp.text().await.map_err(|e| {
            if e.is_timeout() {
                ResolveError::Timeout {
                    endpoint: endpoint.clone(),
                    timeout_ms: request.timeout_ms(),
                }
            } else {
                ResolveError::Body {
                    endpoint: endpoint.clone(),
                    source: e,
                }
            }
        })
    }
}
