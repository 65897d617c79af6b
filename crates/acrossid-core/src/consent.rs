//! # Consent Signals
//!
//! Read-only snapshot of the regional consent signals available when a
//! resolution starts. Each signal category comes from its own provider in the
//! host; any of them may legitimately have nothing to report, which is
//! modelled as `None` rather than an error.

use serde::{Deserialize, Serialize};

/// Regulatory (GDPR/TCF) consent data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdprConsent {
    /// Whether the regulation applies to this user.
    #[serde(default)]
    pub gdpr_applies: bool,
    /// Encoded TCF consent string.
    #[serde(default)]
    pub consent_string: Option<String>,
}

/// Generic (GPP) consent data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GppConsent {
    #[serde(default)]
    pub gpp_string: Option<String>,
    /// Section ids the GPP string applies to.
    #[serde(default)]
    pub applicable_sections: Vec<u32>,
}

/// Read-only access to each consent signal category.
///
/// Implemented by the host's consent modules. Every getter may return `None`.
pub trait ConsentProvider {
    fn gdpr(&self) -> Option<GdprConsent>;
    /// Jurisdiction-specific privacy string (e.g. `1YNN`).
    fn us_privacy(&self) -> Option<String>;
    /// Child-directed treatment flag.
    fn coppa(&self) -> Option<bool>;
    fn gpp(&self) -> Option<GppConsent>;
}

/// Snapshot of all consent signals at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentContext {
    #[serde(default)]
    pub gdpr: Option<GdprConsent>,
    #[serde(default)]
    pub us_privacy: Option<String>,
    #[serde(default)]
    pub coppa: Option<bool>,
    #[serde(default)]
    pub gpp: Option<GppConsent>,
}

impl ConsentContext {
    /// A context in which no provider reported anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read every provider once and freeze the result.
    pub fn capture(provider: &dyn ConsentProvider) -> Self {
        Self {
            gdpr: provider.gdpr(),
            us_privacy: provider.us_privacy(),
            coppa: provider.coppa(),
            gpp: provider.gpp(),
        }
    }

    /// `true` only when a GDPR signal exists and says the regulation applies.
    pub fn gdpr_applies(&self) -> bool {
        self.gdpr.as_ref().is_some_and(|g| g.gdpr_applies)
    }

    pub fn gdpr_consent_string(&self) -> Option<&str> {
        self.gdpr.as_ref().and_then(|g| g.consent_string.as_deref())
    }
}

impl ConsentProvider for ConsentContext {
    fn gdpr(&self) -> Option<GdprConsent> {
        self.gdpr.clone()
    }

    fn us_privacy(&self) -> Option<String> {
        self.us_privacy.clone()
    }

    fn coppa(&self) -> Option<bool> {
        self.coppa
    }

    fn gpp(&self) -> Option<GppConsent> {
        self.gpp.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UsOnly;

    impl ConsentProvider for UsOnly {
        fn gdpr(&self) -> Option<GdprConsent> {
            None
        }
        fn us_privacy(&self) -> Option<String> {
            Some("1YNN".into())
        }
        fn coppa(&self) -> Option<bool> {
            Some(false)
        }
        fn gpp(&self) -> Option<GppConsent> {
            None
        }
    }

    #[test]
    fn capture_reads_each_provider() {
        let ctx = ConsentContext::capture(&UsOnly);
        assert_eq!(ctx.us_privacy.as_deref(), Some("1YNN"));
        assert_eq!(ctx.coppa, Some(false));
        assert!(ctx.gdpr.is_none());
        assert!(ctx.gpp.is_none());
    }

    #[test]
    fn gdpr_applies_false_without_signal() {
        assert!(!ConsentContext::empty().gdpr_applies());
    }

    #[test]
    fn deserializes_partial_json() {
        let ctx: ConsentContext = serde_json::from_str(
            r#"{"gdpr": {"gdpr_applies": true, "consent_string": "CO..."}, "gpp": {"applicable_sections": [7]}}"#,
        )
        .unwrap();
        assert!(ctx.gdpr_applies());
        assert_eq!(ctx.gdpr_consent_string(), Some("CO..."));
        assert_eq!(ctx.gpp.unwrap().applicable_sections, vec![7]);
        assert!(ctx.us_privacy.is_none());
    }
}
