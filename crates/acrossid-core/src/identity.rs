//! # Identity Newtypes
//!
//! Newtype wrappers for the two strings the resolver moves around. Keeping
//! them distinct means a partner id can never be handed to the host as if it
//! were a resolved envelope.

use serde::{Deserialize, Serialize};

/// Name under which the resolver registers with the host and under which
/// decoded values are keyed.
pub const MODULE_NAME: &str = "33acrossId";

/// Global Vendor List id of the identity provider.
pub const GVLID: u32 = 58;

/// Source domain reported in third-party id lists.
pub const EID_SOURCE: &str = "33across.com";

/// Address type reported in third-party id lists.
pub const EID_ATYPE: u8 = 1;

/// Caller-supplied partner identifier. Required for every resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(pub String);

/// Opaque identity token returned by the envelope endpoint.
///
/// The resolver never inspects it; once handed to the host it is the host's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(pub String);

impl PartnerId {
    pub fn new(pid: impl Into<String>) -> Self {
        Self(pid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Envelope {
    pub fn new(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Give up the token, e.g. to hand it to host storage.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PartnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Envelope {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_id_display_is_prefixed() {
        assert_eq!(PartnerId::new("12345").to_string(), "pid:12345");
    }

    #[test]
    fn envelope_serializes_as_bare_string() {
        let json = serde_json::to_string(&Envelope::new("E1")).unwrap();
        assert_eq!(json, "\"E1\"");
    }

    #[test]
    fn envelope_into_inner_returns_token() {
        assert_eq!(Envelope::from("abc").into_inner(), "abc");
    }
}
