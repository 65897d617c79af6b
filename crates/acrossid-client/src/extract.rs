//! # Envelope Extractor
//!
//! Interprets the response body. Every deviation from "succeeded with an
//! envelope" is classified and logged, never raised.

use acrossid_core::identity::MODULE_NAME;
use acrossid_core::{Envelope, IdentityResponse, PartnerId};

use crate::config::FailureSeverity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Outcome of interpreting one response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Envelope(Envelope),
    /// `succeeded: false`.
    Declined {
        error: Option<String>,
        level: LogLevel,
    },
    /// `succeeded: true` without an envelope.
    NoEnvelope,
    /// Body was not a valid response document.
    Malformed { reason: String },
}

pub fn extract_envelope(body: &str, severity: FailureSeverity) -> Extraction {
    let response: IdentityResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            return Extraction::Malformed {
                reason: e.to_string(),
            }
        }
    };

    if !response.succeeded {
        let level = match severity {
            FailureSeverity::Classified if response.is_known_benign_failure() => LogLevel::Info,
            _ => LogLevel::Error,
        };
        return Extraction::Declined {
            error: response.error,
            level,
        };
    }

    match response.envelope() {
        Some(envelope) => Extraction::Envelope(Envelope::new(envelope)),
        None => Extraction::NoEnvelope,
    }
}

impl Extraction {
    /// Level the outcome is logged at; `None` for a delivered envelope.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Self::Envelope(_) => None,
            Self::Declined { level, .. } => Some(*level),
            Self::NoEnvelope => Some(LogLevel::Info),
            Self::Malformed { .. } => Some(LogLevel::Error),
        }
    }

    pub fn log(&self, pid: &PartnerId) {
        match self {
            Self::Envelope(_) => {
                tracing::debug!(module = MODULE_NAME, pid = %pid.as_str(), "envelope received");
            }
            Self::Declined { error, level } => {
                let error = error.as_deref().unwrap_or("");
                match level {
                    LogLevel::Info => {
                        tracing::info!(module = MODULE_NAME, pid = %pid.as_str(), error, "unsuccessful response")
                    }
                    LogLevel::Error => {
                        tracing::error!(module = MODULE_NAME, pid = %pid.as_str(), error, "unsuccessful response")
                    }
                }
            }
            Self::NoEnvelope => {
                tracing::info!(module = MODULE_NAME, pid = %pid.as_str(), "no envelope was received");
            }
            Self::Malformed { reason } => {
                tracing::error!(module = MODULE_NAME, pid = %pid.as_str(), reason = %reason, "envelope response could not be parsed");
            }
        }
    }

    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(body: &str) -> Extraction {
        extract_envelope(body, FailureSeverity::Classified)
    }

    #[test]
    fn envelope_is_returned() {
        let ex = classify(r#"{"succeeded":true,"data":{"envelope":"E1"}}"#);
        assert_eq!(ex.log_level(), None);
        assert_eq!(ex.into_envelope(), Some(Envelope::new("E1")));
    }

    #[test]
    fn cookied_user_logs_at_info() {
        let ex = classify(r#"{"succeeded":false,"error":"Cookied User"}"#);
        assert_eq!(
            ex,
            Extraction::Declined {
                error: Some("Cookied User".into()),
                level: LogLevel::Info
            }
        );
        assert_eq!(ex.into_envelope(), None);
    }

    #[test]
    fn other_failures_log_at_error() {
        let ex = classify(r#"{"succeeded":false,"error":"Invalid pid"}"#);
        assert_eq!(ex.log_level(), Some(LogLevel::Error));
    }

    #[test]
    fn failure_without_error_text_logs_at_error() {
        let ex = classify(r#"{"succeeded":false}"#);
        assert_eq!(
            ex,
            Extraction::Declined {
                error: None,
                level: LogLevel::Error
            }
        );
    }

    #[test]
    fn error_only_severity_ignores_benign_classification() {
        let ex = extract_envelope(
            r#"{"succeeded":false,"error":"Cookied User"}"#,
            FailureSeverity::ErrorOnly,
        );
        assert_eq!(ex.log_level(), Some(LogLevel::Error));
    }

    #[test]
    fn missing_envelope_logs_at_info() {
        for body in [
            r#"{"succeeded":true,"data":{}}"#,
            r#"{"succeeded":true}"#,
            r#"{"succeeded":true,"data":{"envelope":""}}"#,
        ] {
            let ex = classify(body);
            assert_eq!(ex, Extraction::NoEnvelope, "body: {body}");
            assert_eq!(ex.log_level(), Some(LogLevel::Info));
        }
    }

    #[test]
    fn unparsable_body_is_malformed() {
        for body in ["", "not json", "{\"succeeded\":", "[]"] {
            let ex = classify(body);
            assert!(matches!(ex, Extraction::Malformed { .. }), "body: {body:?}");
            assert_eq!(ex.log_level(), Some(LogLevel::Error));
        }
    }

    #[test]
    fn log_does_not_panic_without_subscriber() {
        let pid = PartnerId::new("1");
        for ex in [
            Extraction::Envelope(Envelope::new("E")),
            Extraction::NoEnvelope,
            Extraction::Declined { error: None, level: LogLevel::Info },
            Extraction::Malformed { reason: "x".into() },
        ] {
            ex.log(&pid);
        }
    }
}
