//! # Host Submodule Descriptor
//!
//! The host identity system owns scheduling, storage and the final id list.
//! An id provider plugs in by implementing [`IdSubmodule`] and being
//! registered into a [`SubmoduleRegistry`] at startup.
//!
//! ## Capability set
//!
//! - `name`: key under which decoded values live.
//! - `gvlid`: optional Global Vendor List id.
//! - `decode`: stored string → decoded id object. Pure and total.
//! - `get_id`: start a resolution; `None` when the config is unusable.
//! - `eids`: how decoded values map into third-party id list entries.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::consent::ConsentContext;
use crate::identity::{Envelope, EID_ATYPE, EID_SOURCE, MODULE_NAME};

/// Receives the outcome of a resolution. Called exactly once.
pub type Continuation = Box<dyn FnOnce(Option<Envelope>) + Send>;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Handle returned by [`IdSubmodule::get_id`].
///
/// Consuming `self` means the host can start the lookup only once.
pub trait IdCallback: Send {
    fn callback(self: Box<Self>, continuation: Continuation) -> BoxFuture<()>;
}

/// Value the host keeps in storage for this provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub envelope: String,
}

/// Decoded ids keyed by submodule name, e.g.
/// `{ "33acrossId": { "envelope": "..." } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedId(BTreeMap<String, StoredRecord>);

impl DecodedId {
    pub fn single(name: &str, record: StoredRecord) -> Self {
        let mut map = BTreeMap::new();
        map.insert(name.to_string(), record);
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&StoredRecord> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold `other` into `self`; entries in `other` win on key collision.
    pub fn merge(&mut self, other: DecodedId) {
        self.0.extend(other.0);
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Mapping from a decoded value to a third-party id list entry.
#[derive(Debug, Clone, Copy)]
pub struct EidSpec {
    /// Key in [`DecodedId`] this spec reads.
    pub key: &'static str,
    pub source: &'static str,
    pub atype: u8,
    pub get_value: fn(&StoredRecord) -> String,
}

/// One entry of the third-party id list handed to downstream systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eid {
    pub source: String,
    pub uids: Vec<Uid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uid {
    pub id: String,
    pub atype: u8,
}

impl EidSpec {
    /// Build the list entry, if `decoded` carries a non-empty value for this key.
    pub fn to_eid(&self, decoded: &DecodedId) -> Option<Eid> {
        let record = decoded.get(self.key)?;
        let id = (self.get_value)(record);
        if id.is_empty() {
            return None;
        }
        Some(Eid {
            source: self.source.to_string(),
            uids: vec![Uid { id, atype: self.atype }],
        })
    }
}

/// The capability set a host expects from an id provider.
pub trait IdSubmodule: Send + Sync {
    fn name(&self) -> &str;

    fn gvlid(&self) -> Option<u32> {
        None
    }

    fn decode(&self, stored: &str) -> DecodedId;

    /// Start a resolution from raw host params (`{"pid": ..., ...}`).
    fn get_id(
        &self,
        params: &serde_json::Value,
        consent: &ConsentContext,
    ) -> Option<Box<dyn IdCallback>>;

    fn eids(&self) -> Vec<EidSpec>;
}

/// `decode` for the 33Across provider: wrap whatever is stored.
pub fn decode_envelope(stored: &str) -> DecodedId {
    DecodedId::single(
        MODULE_NAME,
        StoredRecord {
            envelope: stored.to_string(),
        },
    )
}

fn envelope_value(record: &StoredRecord) -> String {
    record.envelope.clone()
}

/// EID mapping for the 33Across provider.
pub fn envelope_eid_spec() -> EidSpec {
    EidSpec {
        key: MODULE_NAME,
        source: EID_SOURCE,
        atype: EID_ATYPE,
        get_value: envelope_value,
    }
}

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("submodule {0} is already registered")]
    Duplicate(String),
}

/// Startup-time registry of id providers.
#[derive(Default)]
pub struct SubmoduleRegistry {
    modules: Vec<Box<dyn IdSubmodule>>,
}

impl SubmoduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn IdSubmodule>) -> Result<(), RegistryError> {
        if self.get(module.name()).is_some() {
            return Err(RegistryError::Duplicate(module.name().to_string()));
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn IdSubmodule> {
        self.modules
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Decode every stored value whose key names a registered submodule.
    /// Unknown keys are ignored.
    pub fn decode_all(&self, stored: &BTreeMap<String, String>) -> DecodedId {
        let mut decoded = DecodedId::default();
        for (name, value) in stored {
            if let Some(module) = self.get(name) {
                decoded.merge(module.decode(value));
            }
        }
        decoded
    }

    /// Assemble the third-party id list from decoded values, in registration order.
    pub fn build_eids(&self, decoded: &DecodedId) -> Vec<Eid> {
        self.modules
            .iter()
            .flat_map(|m| m.eids())
            .filter_map(|spec| spec.to_eid(decoded))
            .collect()
    }
}
