//! Entry point used by reconcilers: identity, gateways and policy in one handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::arbitrator::Arbitrator;
use crate::cancel::guard;
use crate::error::CloudError;
use crate::finder::{
    BulkFinder, EnumeratingFinder, ResourceFinder, DEFAULT_ENUMERATION_CONCURRENCY,
};
use crate::gateway::{
    BulkTagQuery, LatticeClient, PerResourceTagAccess, ResourceRef, ResourceType, TaggingClient,
};
use crate::identity::Identity;
use crate::tags::Tags;

/// Tunables for [`Cloud`].
#[derive(Debug, Clone)]
pub struct CloudOptions {
    /// Deadline applied to each operation. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Concurrent tag reads when enumerating in network-isolated mode.
    pub enumeration_concurrency: usize,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            enumeration_concurrency: DEFAULT_ENUMERATION_CONCURRENCY,
        }
    }
}

impl CloudOptions {
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_enumeration_concurrency(mut self, concurrency: usize) -> Self {
        self.enumeration_concurrency = concurrency;
        self
    }
}

/// Ownership and discovery operations for one controller identity.
///
/// Cheap to clone. The discovery strategy is fixed at construction from
/// [`Identity::network_isolated`].
#[derive(Clone)]
pub struct Cloud {
    identity: Arc<Identity>,
    lattice: Arc<dyn PerResourceTagAccess>,
    tagging: Option<Arc<dyn BulkTagQuery>>,
    arbitrator: Arbitrator,
    finder: Arc<dyn ResourceFinder>,
    options: CloudOptions,
    cancel: CancellationToken,
}

impl Cloud {
    /// Build from already constructed gateways.
    ///
    /// `tagging` is required unless the identity is network isolated, in
    /// which case it is ignored.
    ///
    /// # Errors
    /// Returns [`CloudError::Config`] if the identity is invalid or the bulk
    /// gateway is missing in non-isolated mode.
    pub fn new(
        identity: Identity,
        lattice: Arc<dyn PerResourceTagAccess>,
        tagging: Option<Arc<dyn BulkTagQuery>>,
        options: CloudOptions,
    ) -> Result<Self, CloudError> {
        identity.validate()?;

        let (finder, tagging) = if identity.network_isolated() {
            let finder: Arc<dyn ResourceFinder> = Arc::new(
                EnumeratingFinder::new(lattice.clone())
                    .with_concurrency(options.enumeration_concurrency),
            );
            (finder, None)
        } else {
            let tagging = tagging.ok_or_else(|| {
                CloudError::Config(
                    "a bulk tagging gateway is required unless the network is isolated"
                        .to_string(),
                )
            })?;
            let finder: Arc<dyn ResourceFinder> = Arc::new(BulkFinder::new(tagging.clone()));
            (finder, Some(tagging))
        };

        info!(
            token = %identity.ownership_token(),
            region = %identity.region(),
            network_isolated = identity.network_isolated(),
            "Ownership gateway configured"
        );

        Ok(Self {
            arbitrator: Arbitrator::new(&identity, lattice.clone()),
            identity: Arc::new(identity),
            lattice,
            tagging,
            finder,
            options,
            cancel: CancellationToken::new(),
        })
    }

    /// Build with the AWS HTTP gateways for the identity's region.
    ///
    /// # Errors
    /// Returns error if the HTTP clients cannot be created.
    pub fn connect(identity: Identity, options: CloudOptions) -> Result<Self, CloudError> {
        let lattice: Arc<dyn PerResourceTagAccess> =
            Arc::new(LatticeClient::for_identity(&identity)?);
        let tagging: Option<Arc<dyn BulkTagQuery>> = if identity.network_isolated() {
            None
        } else {
            Some(Arc::new(TaggingClient::new(identity.region())?))
        };
        Self::new(identity, lattice, tagging, options)
    }

    /// Handle whose operations abort with [`CloudError::Cancelled`] once
    /// `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn config(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn lattice(&self) -> &Arc<dyn PerResourceTagAccess> {
        &self.lattice
    }

    /// The bulk gateway, absent in network-isolated mode.
    #[must_use]
    pub fn tagging(&self) -> Option<&Arc<dyn BulkTagQuery>> {
        self.tagging.as_ref()
    }

    #[must_use]
    pub fn arbitrator(&self) -> &Arbitrator {
        &self.arbitrator
    }

    /// Tags every resource created by this controller starts with.
    #[must_use]
    pub fn default_tags(&self) -> Tags {
        self.arbitrator.ownership_tags()
    }

    /// Default tags overlaid with `tags`; `tags` wins on key collision.
    #[must_use]
    pub fn default_tags_merged_with(&self, tags: &Tags) -> Tags {
        self.default_tags().merged_with(tags)
    }

    /// Tags of every resource in `refs`.
    ///
    /// # Errors
    /// Returns the first gateway error, or the cancellation error.
    #[instrument(skip_all, fields(count = refs.len()))]
    pub async fn find_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError> {
        self.guarded(self.finder.find_tags_for_refs(refs)).await
    }

    /// Resources of `resource_type` whose tags are a superset of `query`.
    ///
    /// # Errors
    /// Returns the first gateway error, or the cancellation error.
    #[instrument(skip(self, query))]
    pub async fn find_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        self.guarded(self.finder.find_by_tags(resource_type, query)).await
    }

    /// Target groups whose tags are a superset of `query`.
    ///
    /// # Errors
    /// Returns the first gateway error, or the cancellation error.
    pub async fn find_target_group_refs(
        &self,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        self.find_by_tags(ResourceType::TargetGroup, query).await
    }

    /// Whether this controller owns `resource`.
    ///
    /// # Errors
    /// Returns the gateway error, or the cancellation error.
    #[instrument(skip_all, fields(arn = %resource.arn))]
    pub async fn is_managed(&self, resource: &ResourceRef) -> Result<bool, CloudError> {
        self.guarded(self.arbitrator.is_managed(resource)).await
    }

    /// See [`Arbitrator::try_own`].
    ///
    /// # Errors
    /// Returns the gateway error, or the cancellation error. Either way
    /// ownership is unknown.
    #[instrument(skip_all, fields(arn = %resource.arn))]
    pub async fn try_own(&self, resource: &ResourceRef) -> Result<bool, CloudError> {
        self.guarded(self.arbitrator.try_own(resource)).await
    }

    /// See [`Arbitrator::try_own_from_tags`].
    ///
    /// # Errors
    /// Returns the gateway error, or the cancellation error. Either way
    /// ownership is unknown.
    #[instrument(skip_all, fields(arn = %resource.arn))]
    pub async fn try_own_from_tags(
        &self,
        resource: &ResourceRef,
        tags: &Tags,
    ) -> Result<bool, CloudError> {
        self.guarded(self.arbitrator.try_own_from_tags(resource, tags)).await
    }

    async fn guarded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, CloudError>>,
    ) -> Result<T, CloudError> {
        guard(&self.cancel, self.options.request_timeout, fut).await
    }
}

impl std::fmt::Debug for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloud")
            .field("identity", &self.identity)
            .field("bulk_tagging", &self.tagging.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryTagStore;
    use crate::tags::TAG_MANAGED_BY;

    fn identity(isolated: bool) -> Identity {
        Identity::new("1", "us-west-2", "c", "v", isolated).unwrap()
    }

    #[test]
    fn test_bulk_gateway_required_when_not_isolated() {
        let store = InMemoryTagStore::new();
        let err = Cloud::new(
            identity(false),
            Arc::new(store),
            None,
            CloudOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::Config(_)));
    }

    #[test]
    fn test_isolated_mode_drops_bulk_gateway() {
        let store = InMemoryTagStore::new();
        let cloud = Cloud::new(
            identity(true),
            Arc::new(store.clone()),
            Some(Arc::new(store)),
            CloudOptions::default(),
        )
        .unwrap();
        assert!(cloud.tagging().is_none());
    }

    #[test]
    fn test_default_tags_merged_with() {
        let store = InMemoryTagStore::new();
        let cloud = Cloud::new(
            identity(true),
            Arc::new(store),
            None,
            CloudOptions::default(),
        )
        .unwrap();

        let user: Tags = [("Name", "foo")].into_iter().collect();
        let merged = cloud.default_tags_merged_with(&user);

        assert_eq!(merged.get(TAG_MANAGED_BY), Some(Some("1/c/v")));
        assert_eq!(merged.get("Name"), Some(Some("foo")));
        assert_eq!(user.len(), 1);
        assert_eq!(cloud.default_tags().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_handle_does_not_claim() {
        let store = InMemoryTagStore::new();
        let tg = ResourceRef::target_group("arn:tg/1");
        store.insert(tg.clone(), Tags::new()).await;

        let cloud = Cloud::new(
            identity(true),
            Arc::new(store.clone()),
            None,
            CloudOptions::default(),
        )
        .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = cloud
            .with_cancellation(token)
            .try_own(&tg)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Cancelled));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let store = InMemoryTagStore::with_latency(Duration::from_secs(5));
        store
            .insert(ResourceRef::target_group("arn:tg/1"), Tags::new())
            .await;

        let cloud = Cloud::new(
            identity(true),
            Arc::new(store),
            None,
            CloudOptions::default().with_request_timeout(Duration::from_secs(1)),
        )
        .unwrap();

        let err = cloud
            .find_by_tags(ResourceType::TargetGroup, &Tags::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
