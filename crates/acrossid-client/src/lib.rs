//! # acrossid-client: 33Across Envelope Resolver
//!
//! Resolves an identity envelope with a single GET to the envelope endpoint:
//!
//! 1. **Parameter builder** ([`acrossid_core::params`]): partner id, consent
//!    signals, client geometry.
//! 2. **Transport** ([`transport`]): one request, credentials attached,
//!    bounded timeout, no retry.
//! 3. **Extractor** ([`extract`]): JSON body → envelope, logging every
//!    deviation instead of failing.
//!
//! [`AcrossIdModule`] ties the three together and implements the host's
//! [`acrossid_core::IdSubmodule`] descriptor.
//!
//! ## Failure policy
//!
//! Nothing here propagates an error to the host once a resolution has started.
//! Every failure is logged and the continuation receives `None`.

pub mod config;
pub mod error;
pub mod extract;
pub mod resolver;
pub mod transport;

pub use config::{FailureSeverity, ResolverConfig};
pub use error::ResolveError;
pub use extract::{extract_envelope, Extraction, LogLevel};
pub use resolver::{AcrossIdModule, PendingResolution};
pub use transport::{HttpTransport, Transport, TransportRequest};
