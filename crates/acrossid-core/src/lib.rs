//! # acrossid-core: Identity Resolver Foundations
//!
//! Pure types and functions shared by the resolver client and the CLI. Nothing
//! in this crate touches the network.
//!
//! ## Modules
//!
//! - [`identity`]: `PartnerId` and `Envelope` newtypes, module constants.
//! - [`consent`]: consent signal snapshot and the provider seam.
//! - [`geometry`]: viewport/screen snapshot and browsing-context probing.
//! - [`params`]: the query-parameter builder.
//! - [`response`]: wire shape of the envelope endpoint response.
//! - [`submodule`]: host descriptor trait, registry, decode and EID assembly.
//!
//! ## Crate Policy
//!
//! - Every function here is deterministic and side-effect free, except the
//!   probes, which only read from whatever environment they were handed.
//! - Absent signals are `None`, never errors.

pub mod consent;
pub mod geometry;
pub mod identity;
pub mod params;
pub mod response;
pub mod submodule;

pub use consent::{ConsentContext, ConsentProvider, GdprConsent, GppConsent};
pub use geometry::{EnvironmentProbe, Extent, GeometrySnapshot};
pub use identity::{Envelope, PartnerId};
pub use params::{build_query_params, ConsentStringPolicy, GeometryPolicy, ParamPolicy, QueryParams};
pub use response::{IdentityResponse, ResponseData};
pub use submodule::{DecodedId, IdCallback, IdSubmodule, StoredRecord, SubmoduleRegistry};
