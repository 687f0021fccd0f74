//! Per-region endpoint metadata for wireshape service clients.
//!
//! Given a logical [`Region`] and a service endpoint prefix, this crate
//! computes (or looks up an override for) the HTTP endpoint, and resolves
//! the signing region. All tables are immutable after construction and
//! the resolver functions are pure: no I/O, no mutable state.
//!
//! ## Modules
//!
//! - [`region`]: logical region identifiers and well-known constants
//! - [`partition`]: region groups sharing a DNS suffix
//! - [`metadata`]: per-service override tables and resolution
//! - [`error`]: endpoint resolution errors

mod error;
pub mod partition;
pub mod region;

mod metadata;

pub use error::EndpointError;
pub use metadata::{ServiceEndpointMetadata, ServiceEndpointMetadataBuilder};
pub use region::{Region, regions};
