//! Resolver configuration.
//!
//! Built per call from the host's submodule params, or once from the
//! environment for command-line use. Immutable for the call's lifetime.

use std::time::Duration;

use acrossid_core::{ConsentStringPolicy, GeometryPolicy, ParamPolicy, PartnerId};
use serde::{Deserialize, Serialize};
use url::Url;

/// Production envelope endpoint.
pub const DEFAULT_API_URL: &str = "https://lexicon.33across.com/v1/envelope";

/// Request timeout applied to every envelope lookup.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Log level policy for unsuccessful responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSeverity {
    /// Known benign errors (an already identified user) log at info,
    /// everything else at error.
    #[default]
    Classified,
    /// Every unsuccessful response logs at error.
    ErrorOnly,
}

/// Configuration for a single resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub pid: PartnerId,
    /// Default: <https://lexicon.33across.com/v1/envelope>
    pub api_url: Url,
    pub timeout_ms: u64,
    pub consent_string_policy: ConsentStringPolicy,
    pub geometry_policy: GeometryPolicy,
    pub failure_severity: FailureSeverity,
}

impl ResolverConfig {
    /// Configuration with every default except the partner id.
    pub fn new(pid: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            pid: PartnerId::new(pid),
            api_url: parse_url("apiUrl", DEFAULT_API_URL)?,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            consent_string_policy: ConsentStringPolicy::default(),
            geometry_policy: GeometryPolicy::default(),
            failure_severity: FailureSeverity::default(),
        })
    }

    /// Read the host's submodule params.
    ///
    /// Recognised keys: `pid` (required string), `apiUrl`, `timeoutMs`,
    /// `consentStringPolicy`, `geometryPolicy`, `failureSeverity`.
    pub fn from_params(params: &serde_json::Value) -> Result<Self, ConfigError> {
        let pid = match params.get("pid") {
            None | Some(serde_json::Value::Null) => return Err(ConfigError::MissingPartnerId),
            Some(serde_json::Value::String(pid)) => pid.clone(),
            Some(other) => return Err(ConfigError::InvalidPartnerId(json_kind(other))),
        };

        let mut config = Self::new(pid)?;

        if let Some(raw) = params.get("apiUrl").and_then(|v| v.as_str()) {
            config.api_url = parse_url("apiUrl", raw)?;
        }
        if let Some(ms) = params.get("timeoutMs") {
            config.timeout_ms = ms.as_u64().ok_or_else(|| ConfigError::InvalidParam {
                name: "timeoutMs".into(),
                reason: "expected a non-negative integer".into(),
            })?;
        }
        if let Some(v) = params.get("consentStringPolicy") {
            config.consent_string_policy = parse_enum("consentStringPolicy", v)?;
        }
        if let Some(v) = params.get("geometryPolicy") {
            config.geometry_policy = parse_enum("geometryPolicy", v)?;
        }
        if let Some(v) = params.get("failureSeverity") {
            config.failure_severity = parse_enum("failureSeverity", v)?;
        }

        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ACROSSID_PID` (required)
    /// - `ACROSSID_API_URL` (default: `https://lexicon.33across.com/v1/envelope`)
    /// - `ACROSSID_TIMEOUT_MS` (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let pid = std::env::var("ACROSSID_PID").map_err(|_| ConfigError::MissingPartnerId)?;
        let mut config = Self::new(pid)?;
        config.api_url = env_url("ACROSSID_API_URL", DEFAULT_API_URL)?;
        config.timeout_ms = std::env::var("ACROSSID_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn param_policy(&self) -> ParamPolicy {
        ParamPolicy {
            consent_string: self.consent_string_policy,
            geometry: self.geometry_policy,
        }
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn parse_enum<T: serde::de::DeserializeOwned>(
    name: &str,
    value: &serde_json::Value,
) -> Result<T, ConfigError> {
    serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidParam {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("partner id (pid) is required")]
    MissingPartnerId,
    #[error("partner id (pid) must be a string, got {0}")]
    InvalidPartnerId(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {name}: {reason}")]
    InvalidParam { name: String, reason: String },
}
