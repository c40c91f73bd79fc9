//! AWS tag gateways.
//!
//! - [`TaggingClient`] - resource groups tagging API, implements [`BulkTagQuery`]
//! - [`LatticeClient`] - VPC Lattice API, implements [`PerResourceTagAccess`]
//!
//! ## Authentication
//!
//! Requests are not SigV4-signed by these clients; credentials belong to the
//! transport in front of them. Use `with_endpoint` to route calls through a
//! signing proxy or a VPC endpoint.
//!
//! [`BulkTagQuery`]: crate::gateway::BulkTagQuery
//! [`PerResourceTagAccess`]: crate::gateway::PerResourceTagAccess

mod lattice;
mod models;
mod tagging;
mod transport;

pub use lattice::LatticeClient;
pub use models::*;
pub use tagging::TaggingClient;
