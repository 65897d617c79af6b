//! # Query-Parameter Builder
//!
//! Turns a partner id, a consent snapshot and a geometry snapshot into the
//! flat parameter map sent to the envelope endpoint. Pure: same inputs, same
//! map, nothing else touched.
//!
//! ## Parameters
//!
//! | Key | Sent when |
//! |-----|-----------|
//! | `pid` | always |
//! | `gdpr` | always (`0`/`1`) |
//! | `gdpr_consent` | consent string present, gated per [`ConsentStringPolicy`] |
//! | `us_privacy` | privacy string present |
//! | `gpp`, `gpp_sid` | GPP consent present |
//! | `coppa` | COPPA signal present |
//! | `vw`, `vh`, `sw`, `sh` | [`GeometryPolicy::Detailed`], each non-zero |
//! | `sd` | [`GeometryPolicy::Combined`], both screen sides non-zero |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consent::ConsentContext;
use crate::geometry::{non_zero, GeometrySnapshot};
use crate::identity::PartnerId;

/// When the raw GDPR consent string is forwarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStringPolicy {
    /// Only while the regulation applies.
    #[default]
    GatedOnGdprApplies,
    /// Whenever a consent string is available.
    Always,
}

/// Which geometry fields are collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryPolicy {
    /// Viewport and screen width/height as four separate fields.
    #[default]
    Detailed,
    /// A single `"WxH"` screen dimension string.
    Combined,
}

/// Variant knobs for the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamPolicy {
    pub consent_string: ConsentStringPolicy,
    pub geometry: GeometryPolicy,
}

/// Flat, ordered parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Build the parameter map for one resolution.
pub fn build_query_params(
    pid: &PartnerId,
    consent: &ConsentContext,
    geometry: &GeometrySnapshot,
    policy: ParamPolicy,
) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert("pid", pid.as_str());

    let gdpr_applies = consent.gdpr_applies();
    params.insert("gdpr", if gdpr_applies { "1" } else { "0" });

    if let Some(consent_string) = consent.gdpr_consent_string() {
        let forward = match policy.consent_string {
            ConsentStringPolicy::GatedOnGdprApplies => gdpr_applies,
            ConsentStringPolicy::Always => true,
        };
        if forward {
            params.insert("gdpr_consent", consent_string);
        }
    }

    if let Some(us_privacy) = &consent.us_privacy {
        params.insert("us_privacy", us_privacy.as_str());
    }

    if let Some(gpp) = &consent.gpp {
        params.insert("gpp", gpp.gpp_string.clone().unwrap_or_default());
        params.insert("gpp_sid", encode_section_ids(&gpp.applicable_sections));
    }

    if let Some(coppa) = consent.coppa {
        params.insert("coppa", if coppa { "1" } else { "0" });
    }

    match policy.geometry {
        GeometryPolicy::Detailed => {
            let fields = [
                ("vw", geometry.viewport_width),
                ("vh", geometry.viewport_height),
                ("sw", geometry.screen_width),
                ("sh", geometry.screen_height),
            ];
            for (key, value) in fields {
                if let Some(v) = non_zero(value) {
                    params.insert(key, v.to_string());
                }
            }
        }
        GeometryPolicy::Combined => {
            if let Some(dim) = geometry.combined_screen() {
                params.insert("sd", dim);
            }
        }
    }

    params
}

/// Comma-join section ids and percent-encode the result once. The transport
/// encodes the query again on top of this.
fn encode_section_ids(sections: &[u32]) -> String {
    let joined = sections
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    url::form_urlencoded::byte_serialize(joined.as_bytes()).collect()
}
