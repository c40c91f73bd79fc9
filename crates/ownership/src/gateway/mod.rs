//! Tag gateway abstractions.
//!
//! Two ways of reaching resource tags, selected by network mode:
//!
//! - [`BulkTagQuery`] - cross-resource tag search (one call for many resources)
//! - [`PerResourceTagAccess`] - per-resource get/set plus full enumeration

pub mod aws;
pub mod memory;
mod traits;

pub use traits::{BulkTagQuery, PerResourceTagAccess, ResourceRef, ResourceType};

// Re-export gateway clients
pub use aws::{LatticeClient, TaggingClient};
pub use memory::InMemoryTagStore;
