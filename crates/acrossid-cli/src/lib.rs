//! # acrossid-cli: Identity Resolver Command-Line Interface
//!
//! ## Subcommands
//!
//! - `resolve`: run one envelope lookup (or print its query with `--dry-run`)
//! - `decode`: wrap a stored value the way the host decodes it
//! - `eids`: assemble the third-party id list from stored values
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; resolution logic lives in `acrossid-client`.
//! - Machine-readable output goes to stdout as JSON; diagnostics go through
//!   `tracing` to stderr.

pub mod decode;
pub mod resolve;
