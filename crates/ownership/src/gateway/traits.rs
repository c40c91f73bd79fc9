//! Gateway traits and resource references.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CloudError;
use crate::tags::Tags;

/// Kind of remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Lattice target group.
    TargetGroup,
    /// Lattice service.
    Service,
    /// Lattice service network.
    ServiceNetwork,
}

impl ResourceType {
    /// Resource type filter understood by the tagging API.
    #[must_use]
    pub fn tagging_filter(self) -> &'static str {
        match self {
            Self::TargetGroup => "vpc-lattice:targetgroup",
            Self::Service => "vpc-lattice:service",
            Self::ServiceNetwork => "vpc-lattice:servicenetwork",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetGroup => write!(f, "target_group"),
            Self::Service => write!(f, "service"),
            Self::ServiceNetwork => write!(f, "service_network"),
        }
    }
}

/// Reference to a remote resource: its ARN and its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource ARN. Opaque to this crate.
    pub arn: String,
    /// Resource kind.
    pub resource_type: ResourceType,
}

impl ResourceRef {
    #[must_use]
    pub fn new(resource_type: ResourceType, arn: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            resource_type,
        }
    }

    #[must_use]
    pub fn target_group(arn: impl Into<String>) -> Self {
        Self::new(ResourceType::TargetGroup, arn)
    }

    #[must_use]
    pub fn service(arn: impl Into<String>) -> Self {
        Self::new(ResourceType::Service, arn)
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.arn)
    }
}

/// Cross-resource tag search.
///
/// Unreachable in network-isolated deployments.
#[async_trait]
pub trait BulkTagQuery: Send + Sync {
    /// Get the tags of many resources in as few calls as possible.
    ///
    /// Resources unknown to the service are absent from the result.
    async fn get_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError>;

    /// Find resources of `resource_type` whose tags are a superset of `query`.
    async fn find_refs_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError>;
}

/// Per-resource tag access through the resource's own service API.
#[async_trait]
pub trait PerResourceTagAccess: Send + Sync {
    /// Get all tags of one resource.
    async fn get_tags(&self, resource: &ResourceRef) -> Result<Tags, CloudError>;

    /// Add `tags` to the resource. Keys not named in `tags` are left untouched.
    ///
    /// Backends that only store string values (the Lattice API among them)
    /// write a value-less key as `""`, so a later [`get_tags`] reads it back
    /// as `Some("")` rather than `None`.
    ///
    /// [`get_tags`]: PerResourceTagAccess::get_tags
    async fn set_tags(&self, resource: &ResourceRef, tags: &Tags) -> Result<(), CloudError>;

    /// List every resource of `resource_type` visible to this controller.
    async fn list_refs(&self, resource_type: ResourceType)
        -> Result<Vec<ResourceRef>, CloudError>;
}
