//! Tag-based ownership arbitration for shared VPC Lattice resources.
//!
//! Several controller instances (typically one per Kubernetes cluster) can
//! manage resources in the same account and region without a lock service.
//! The only shared state is the ManagedBy tag stored on each resource:
//!
//! - **Identity** - account, region, cluster, VPC and network mode of this
//!   controller, and the ownership token derived from them
//! - **Tags** - the reserved ManagedBy tag and superset matching
//! - **Gateways** - bulk tag search and per-resource tag access
//! - **Arbitrator** - claims unowned resources, defers to other owners
//! - **Finder** - discovers resources by tags, by bulk search or by enumeration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lattice_ownership::{Cloud, CloudOptions, Identity, ResourceRef, Tags};
//!
//! let cloud = Cloud::connect(Identity::from_env()?, CloudOptions::default())?;
//!
//! let tg = ResourceRef::target_group("arn:aws:vpc-lattice:us-west-2:111122223333:targetgroup/tg-0abc");
//! if cloud.try_own(&tg).await? {
//!     // reconcile
//! }
//!
//! let query: Tags = [("app", "checkout")].into_iter().collect();
//! let mine = cloud.find_target_group_refs(&cloud.default_tags_merged_with(&query)).await?;
//! ```
//!
//! ## Network Modes
//!
//! When [`Identity::network_isolated`] is set the tagging API is assumed
//! unreachable and discovery enumerates resources through the Lattice API,
//! reading tags one resource at a time.

pub mod arbitrator;
pub mod cancel;
pub mod cloud;
pub mod error;
pub mod finder;
pub mod gateway;
pub mod identity;
pub mod tags;

pub use arbitrator::{classify, Arbitrator, OwnershipState};
pub use cloud::{Cloud, CloudOptions};
pub use error::CloudError;
pub use finder::{BulkFinder, EnumeratingFinder, ResourceFinder};
pub use gateway::{
    BulkTagQuery, InMemoryTagStore, LatticeClient, PerResourceTagAccess, ResourceRef,
    ResourceType, TaggingClient,
};
pub use identity::{Identity, OwnershipToken};
pub use tags::{contains_tags, Tags, TAG_BASE, TAG_MANAGED_BY};
