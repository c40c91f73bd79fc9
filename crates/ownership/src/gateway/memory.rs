//! In-process tag store.
//!
//! Implements both gateway traits over a shared map so ownership and
//! discovery flows can be exercised without a remote service. Writes are
//! additive and last-writer-wins, like the real tag storage.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{BulkTagQuery, PerResourceTagAccess, ResourceRef, ResourceType};
use crate::error::CloudError;
use crate::tags::Tags;

#[derive(Default)]
struct Inner {
    resources: RwLock<BTreeMap<ResourceRef, Tags>>,
    failing_reads: RwLock<HashSet<String>>,
    failing_writes: RwLock<HashSet<String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    latency: Option<Duration>,
}

/// Shared in-memory tag storage. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryTagStore {
    inner: Arc<Inner>,
}

impl InMemoryTagStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every gateway call by `latency`.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                latency: Some(latency),
                ..Inner::default()
            }),
        }
    }

    /// Add or replace a resource and its tags.
    pub async fn insert(&self, resource: ResourceRef, tags: Tags) {
        self.inner.resources.write().await.insert(resource, tags);
    }

    /// Current tags of a resource, without counting as a gateway read.
    pub async fn tags_of(&self, resource: &ResourceRef) -> Option<Tags> {
        self.inner.resources.read().await.get(resource).cloned()
    }

    /// Make every read of `arn` fail with a service error.
    pub async fn fail_reads_for(&self, arn: impl Into<String>) {
        self.inner.failing_reads.write().await.insert(arn.into());
    }

    /// Make every write to `arn` fail with a service error.
    pub async fn fail_writes_for(&self, arn: impl Into<String>) {
        self.inner.failing_writes.write().await.insert(arn.into());
    }

    /// Number of tag reads served, bulk lookups counting once per call.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    /// Number of tag writes applied.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.inner.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn check_read(&self, arn: &str) -> Result<(), CloudError> {
        if self.inner.failing_reads.read().await.contains(arn) {
            return Err(unavailable(arn));
        }
        Ok(())
    }
}

fn unavailable(arn: &str) -> CloudError {
    CloudError::Api {
        status: 503,
        message: format!("service unavailable for {arn}"),
    }
}

#[async_trait]
impl PerResourceTagAccess for InMemoryTagStore {
    async fn get_tags(&self, resource: &ResourceRef) -> Result<Tags, CloudError> {
        self.simulate_latency().await;
        self.check_read(&resource.arn).await?;
        self.inner.reads.fetch_add(1, Ordering::SeqCst);

        self.inner
            .resources
            .read()
            .await
            .get(resource)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(resource.arn.clone()))
    }

    async fn set_tags(&self, resource: &ResourceRef, tags: &Tags) -> Result<(), CloudError> {
        self.simulate_latency().await;
        if self.inner.failing_writes.read().await.contains(&resource.arn) {
            return Err(unavailable(&resource.arn));
        }

        let mut resources = self.inner.resources.write().await;
        let existing = resources
            .get_mut(resource)
            .ok_or_else(|| CloudError::NotFound(resource.arn.clone()))?;
        existing.extend_from(tags);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        debug!(arn = %resource.arn, count = tags.len(), "Applied tags in memory");
        Ok(())
    }

    async fn list_refs(
        &self,
        resource_type: ResourceType,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        self.simulate_latency().await;
        Ok(self
            .inner
            .resources
            .read()
            .await
            .keys()
            .filter(|r| r.resource_type == resource_type)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BulkTagQuery for InMemoryTagStore {
    async fn get_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError> {
        self.simulate_latency().await;
        for resource in refs {
            self.check_read(&resource.arn).await?;
        }
        self.inner.reads.fetch_add(1, Ordering::SeqCst);

        let resources = self.inner.resources.read().await;
        Ok(refs
            .iter()
            .filter_map(|r| resources.get(r).map(|tags| (r.clone(), tags.clone())))
            .collect())
    }

    async fn find_refs_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        self.simulate_latency().await;
        self.inner.reads.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .inner
            .resources
            .read()
            .await
            .iter()
            .filter(|(r, tags)| r.resource_type == resource_type && tags.contains_all(query))
            .map(|(r, _)| r.clone())
            .collect())
    }
}
