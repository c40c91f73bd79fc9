//! Tag-based resource discovery.
//!
//! Two strategies behind one trait, picked once from the network mode:
//!
//! - [`BulkFinder`] delegates to the tagging API (one call, plus pagination).
//! - [`EnumeratingFinder`] lists every resource of the type and reads tags
//!   one resource at a time. O(resources) round trips, used only where the
//!   tagging API is unreachable.
//!
//! Discovery never writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::CloudError;
use crate::gateway::{BulkTagQuery, PerResourceTagAccess, ResourceRef, ResourceType};
use crate::tags::Tags;

/// Default number of concurrent per-resource tag reads.
pub const DEFAULT_ENUMERATION_CONCURRENCY: usize = 8;

/// Discovers resources and their tags.
#[async_trait]
pub trait ResourceFinder: Send + Sync {
    /// Resources of `resource_type` whose tags are a superset of `query`.
    /// Result order is unspecified.
    async fn find_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError>;

    /// Tags of every resource in `refs`. The first failing read aborts the
    /// whole lookup.
    async fn find_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError>;
}

/// Finder backed by the bulk tagging API.
#[derive(Clone)]
pub struct BulkFinder {
    bulk: Arc<dyn BulkTagQuery>,
}

impl BulkFinder {
    #[must_use]
    pub fn new(bulk: Arc<dyn BulkTagQuery>) -> Self {
        Self { bulk }
    }
}

#[async_trait]
impl ResourceFinder for BulkFinder {
    async fn find_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        let found = self.bulk.find_refs_by_tags(resource_type, query).await?;
        debug!(%resource_type, found = found.len(), "Found resources by tags");
        Ok(found)
    }

    async fn find_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError> {
        self.bulk.get_tags_for_refs(refs).await
    }
}

/// Finder that enumerates resources and filters them locally.
#[derive(Clone)]
pub struct EnumeratingFinder {
    access: Arc<dyn PerResourceTagAccess>,
    concurrency: usize,
}

impl EnumeratingFinder {
    #[must_use]
    pub fn new(access: Arc<dyn PerResourceTagAccess>) -> Self {
        Self {
            access,
            concurrency: DEFAULT_ENUMERATION_CONCURRENCY,
        }
    }

    /// Maximum number of tag reads in flight. Values below one are raised to one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

#[async_trait]
impl ResourceFinder for EnumeratingFinder {
    async fn find_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        let candidates = self.access.list_refs(resource_type).await?;
        let listed = candidates.len();

        let matched: Vec<Option<ResourceRef>> = stream::iter(candidates)
            .map(|resource| async move {
                let tags = self.access.get_tags(&resource).await?;
                Ok::<_, CloudError>(tags.contains_all(query).then_some(resource))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        let found: Vec<ResourceRef> = matched.into_iter().flatten().collect();

        debug!(%resource_type, listed, found = found.len(), "Filtered resources by tags");
        Ok(found)
    }

    async fn find_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError> {
        stream::iter(refs.iter().cloned())
            .map(|resource| async move {
                let tags = self.access.get_tags(&resource).await?;
                Ok::<_, CloudError>((resource, tags))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}
