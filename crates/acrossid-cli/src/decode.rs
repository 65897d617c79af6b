//! # Decode and EID Subcommands
//!
//! Offline helpers mirroring what the host does with a stored envelope.

use std::collections::BTreeMap;
use std::sync::Arc;

use acrossid_client::AcrossIdModule;
use acrossid_core::geometry::NullProbe;
use acrossid_core::submodule::Eid;
use acrossid_core::{IdSubmodule, SubmoduleRegistry};
use clap::Args;

/// Arguments for the decode subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Stored value to decode (any string, including empty).
    pub value: String,
}

/// Arguments for the eids subcommand.
#[derive(Args, Debug)]
pub struct EidsArgs {
    /// Stored values as NAME=VALUE, e.g. 33acrossId=abc.
    #[arg(value_parser = parse_stored, required = true)]
    pub stored: Vec<(String, String)>,
}

/// Parse `NAME=VALUE`; the value may itself contain `=`.
pub fn parse_stored(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))
}

fn registry() -> anyhow::Result<SubmoduleRegistry> {
    let mut registry = SubmoduleRegistry::new();
    registry.register(Box::new(AcrossIdModule::with_http(Arc::new(NullProbe))?))?;
    Ok(registry)
}

/// Build the third-party id list for a set of stored values.
pub fn assemble_eids(stored: &[(String, String)]) -> anyhow::Result<Vec<Eid>> {
    let registry = registry()?;
    let stored: BTreeMap<String, String> = stored.iter().cloned().collect();
    let decoded = registry.decode_all(&stored);
    Ok(registry.build_eids(&decoded))
}

/// Execute the decode subcommand.
pub fn run_decode(args: &DecodeArgs) -> anyhow::Result<u8> {
    let registry = registry()?;
    let module = registry
        .get(acrossid_core::identity::MODULE_NAME)
        .ok_or_else(|| anyhow::anyhow!("resolver module not registered"))?;
    let decoded = module.decode(&args.value);
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(0)
}

/// Execute the eids subcommand.
pub fn run_eids(args: &EidsArgs) -> anyhow::Result<u8> {
    let eids = assemble_eids(&args.stored)?;
    if eids.is_empty() {
        tracing::warn!("no stored value matched a registered id provider");
    }
    println!("{}", serde_json::to_string_pretty(&eids)?);
    Ok(0)
}
