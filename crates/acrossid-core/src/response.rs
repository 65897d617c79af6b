//! Wire shape of the envelope endpoint response.

use serde::{Deserialize, Serialize};

/// Error text the endpoint returns for a user it has already identified.
/// Not a failure from the caller's point of view.
pub const COOKIED_USER: &str = "Cookied User";

/// `{ succeeded, error?, data?: { envelope? } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<String>,
}

impl IdentityResponse {
    /// The envelope, if present and non-empty.
    pub fn envelope(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.envelope.as_deref())
            .filter(|e| !e.is_empty())
    }

    pub fn is_known_benign_failure(&self) -> bool {
        !self.succeeded && self.error.as_deref() == Some(COOKIED_USER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_with_envelope() {
        let resp: IdentityResponse =
            serde_json::from_str(r#"{"succeeded":true,"data":{"envelope":"E1"}}"#).unwrap();
        assert!(resp.succeeded);
        assert_eq!(resp.envelope(), Some("E1"));
    }

    #[test]
    fn empty_envelope_counts_as_missing() {
        let resp: IdentityResponse =
            serde_json::from_str(r#"{"succeeded":true,"data":{"envelope":""}}"#).unwrap();
        assert_eq!(resp.envelope(), None);
    }

    #[test]
    fn missing_data_is_tolerated() {
        let resp: IdentityResponse = serde_json::from_str(r#"{"succeeded":true}"#).unwrap();
        assert_eq!(resp.envelope(), None);
    }

    #[test]
    fn cookied_user_is_benign() {
        let resp: IdentityResponse =
            serde_json::from_str(r#"{"succeeded":false,"error":"Cookied User"}"#).unwrap();
        assert!(resp.is_known_benign_failure());

        let resp: IdentityResponse =
            serde_json::from_str(r#"{"succeeded":false,"error":"Invalid pid"}"#).unwrap();
        assert!(!resp.is_known_benign_failure());
    }

    #[test]
    fn missing_succeeded_is_rejected() {
        assert!(serde_json::from_str::<IdentityResponse>(r#"{"data":{}}"#).is_err());
    }
}
