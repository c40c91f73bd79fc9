//! Ownership arbitration over the ManagedBy tag.
//!
//! Each resource is in one of three states relative to this controller:
//!
//! | ManagedBy tag          | State          | `try_own`                 |
//! |------------------------|----------------|---------------------------|
//! | absent, null or empty  | `Unclaimed`    | writes our token, `true`  |
//! | our token              | `OwnedByMe`    | no write, `true`          |
//! | any other token        | `OwnedByOther` | no write, `false`         |
//!
//! Unclaimed resources are claimed rather than skipped so that resources
//! created before ownership tagging existed keep being reconciled.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CloudError;
use crate::gateway::{PerResourceTagAccess, ResourceRef};
use crate::identity::{Identity, OwnershipToken};
use crate::tags::Tags;

/// Ownership of a resource relative to one controller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipState {
    /// No owner recorded.
    Unclaimed,
    /// Owned by this controller.
    OwnedByMe,
    /// Owned by a different controller.
    OwnedByOther,
}

impl std::fmt::Display for OwnershipState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unclaimed => write!(f, "unclaimed"),
            Self::OwnedByMe => write!(f, "owned_by_me"),
            Self::OwnedByOther => write!(f, "owned_by_other"),
        }
    }
}

/// Classify `tags` relative to `token`. Pure.
#[must_use]
pub fn classify(token: &OwnershipToken, tags: &Tags) -> OwnershipState {
    match tags.managed_by() {
        "" => OwnershipState::Unclaimed,
        owner if token == owner => OwnershipState::OwnedByMe,
        _ => OwnershipState::OwnedByOther,
    }
}

/// Decides and claims ownership of resources for one identity.
#[derive(Clone)]
pub struct Arbitrator {
    token: OwnershipToken,
    access: Arc<dyn PerResourceTagAccess>,
}

impl Arbitrator {
    #[must_use]
    pub fn new(identity: &Identity, access: Arc<dyn PerResourceTagAccess>) -> Self {
        Self {
            token: identity.ownership_token(),
            access,
        }
    }

    #[must_use]
    pub fn token(&self) -> &OwnershipToken {
        &self.token
    }

    /// Tag set that marks a resource as owned by this controller.
    #[must_use]
    pub fn ownership_tags(&self) -> Tags {
        Tags::ownership(&self.token)
    }

    #[must_use]
    pub fn classify(&self, tags: &Tags) -> OwnershipState {
        classify(&self.token, tags)
    }

    /// Whether this controller owns `resource`. Never writes.
    ///
    /// # Errors
    /// Returns the gateway error if the tags cannot be read.
    pub async fn is_managed(&self, resource: &ResourceRef) -> Result<bool, CloudError> {
        let tags = self.access.get_tags(resource).await?;
        Ok(self.classify(&tags) == OwnershipState::OwnedByMe)
    }

    /// Fetch the current tags of `resource` and arbitrate on them.
    ///
    /// # Errors
    /// Returns the gateway error if the read or the claim write fails.
    pub async fn try_own(&self, resource: &ResourceRef) -> Result<bool, CloudError> {
        let tags = self.access.get_tags(resource).await?;
        self.try_own_from_tags(resource, &tags).await
    }

    /// Arbitrate ownership of `resource` given tags the caller already holds.
    ///
    /// Returns `true` if the resource is ours, claiming it first when it is
    /// unclaimed, and `false` if another controller owns it.
    ///
    /// The claim is a plain additive tag write with no compare-and-set. Two
    /// controllers that both observe `Unclaimed` will both write and both get
    /// `true`; the later write decides the durable owner, and the other side
    /// sees `OwnedByOther` on its next read.
    ///
    /// # Errors
    /// Returns the gateway error if the claim write fails; ownership is then
    /// unknown and the caller should retry later.
    pub async fn try_own_from_tags(
        &self,
        resource: &ResourceRef,
        tags: &Tags,
    ) -> Result<bool, CloudError> {
        let state = self.classify(tags);
        debug!(arn = %resource.arn, %state, owner = tags.managed_by(), "Classified resource");

        match state {
            OwnershipState::Unclaimed => {
                self.claim(resource).await?;
                Ok(true)
            }
            OwnershipState::OwnedByMe => Ok(true),
            OwnershipState::OwnedByOther => Ok(false),
        }
    }

    async fn claim(&self, resource: &ResourceRef) -> Result<(), CloudError> {
        info!(arn = %resource.arn, token = %self.token, "Claiming unowned resource");
        self.access
            .set_tags(resource, &self.ownership_tags())
            .await
    }
}

impl std::fmt::Debug for Arbitrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbitrator")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryTagStore;
    use crate::tags::TAG_MANAGED_BY;

    fn identity(account: &str, cluster: &str, vpc: &str) -> Identity {
        Identity::new(account, "us-west-2", cluster, vpc, false).unwrap()
    }

    fn arbitrator(store: &InMemoryTagStore) -> Arbitrator {
        Arbitrator::new(
            &identity("222222", "clusterA", "vpc-a"),
            Arc::new(store.clone()),
        )
    }

    fn owned_by(token: &str) -> Tags {
        [(TAG_MANAGED_BY, token)].into_iter().collect()
    }

    #[test]
    fn test_classify_matches_token_equality() {
        let token = identity("222222", "clusterA", "vpc-a").ownership_token();

        assert_eq!(classify(&token, &Tags::new()), OwnershipState::Unclaimed);
        assert_eq!(
            classify(&token, &owned_by("222222/clusterA/vpc-a")),
            OwnershipState::OwnedByMe
        );
        assert_eq!(
            classify(&token, &owned_by("111111/clusterB/vpc-b")),
            OwnershipState::OwnedByOther
        );
        assert_eq!(classify(&token, &owned_by("")), OwnershipState::Unclaimed);

        let mut null = Tags::new();
        null.insert_key(TAG_MANAGED_BY);
        assert_eq!(classify(&token, &null), OwnershipState::Unclaimed);
    }

    #[test]
    fn test_classify_ignores_other_tags() {
        let token = identity("1", "c", "v").ownership_token();
        let mut tags = owned_by("1/c/v");
        tags.insert("Name", "1/c/v-other");
        assert_eq!(classify(&token, &tags), OwnershipState::OwnedByMe);
    }

    #[tokio::test]
    async fn test_owned_by_me_is_idempotent() {
        let store = InMemoryTagStore::new();
        let tg = ResourceRef::target_group("arn:tg/1");
        let tags = owned_by("222222/clusterA/vpc-a");
        store.insert(tg.clone(), tags.clone()).await;

        let arb = arbitrator(&store);
        for _ in 0..3 {
            assert!(arb.try_own_from_tags(&tg, &tags).await.unwrap());
        }
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unclaimed_resource_is_claimed() {
        let store = InMemoryTagStore::new();
        let tg = ResourceRef::target_group("arn:tg/legacy");
        let tags: Tags = [("Name", "legacy")].into_iter().collect();
        store.insert(tg.clone(), tags.clone()).await;

        let arb = arbitrator(&store);
        assert!(arb.try_own_from_tags(&tg, &tags).await.unwrap());

        let stored = store.tags_of(&tg).await.unwrap();
        assert_eq!(stored.managed_by(), "222222/clusterA/vpc-a");
        assert_eq!(stored.get("Name"), Some(Some("legacy")));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_other_owner_is_rejected_without_write() {
        let store = InMemoryTagStore::new();
        let tg = ResourceRef::target_group("arn:tg/2");
        let tags = owned_by("111111/clusterB/vpc-b");
        store.insert(tg.clone(), tags.clone()).await;

        let arb = arbitrator(&store);
        assert!(!arb.try_own_from_tags(&tg, &tags).await.unwrap());
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.tags_of(&tg).await, Some(tags));
    }

    #[tokio::test]
    async fn test_failed_claim_is_an_error_not_ownership() {
        let store = InMemoryTagStore::new();
        let tg = ResourceRef::target_group("arn:tg/3");
        store.insert(tg.clone(), Tags::new()).await;
        store.fail_writes_for("arn:tg/3").await;

        let err = arbitrator(&store).try_own(&tg).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(store.tags_of(&tg).await.unwrap().managed_by(), "");
    }

    #[tokio::test]
    async fn test_try_own_propagates_read_error() {
        let store = InMemoryTagStore::new();
        let arb = arbitrator(&store);

        let err = arb
            .try_own(&ResourceRef::target_group("arn:tg/missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_is_managed_never_writes() {
        let store = InMemoryTagStore::new();
        let tg = ResourceRef::target_group("arn:tg/4");
        store.insert(tg.clone(), Tags::new()).await;

        let arb = arbitrator(&store);
        assert!(!arb.is_managed(&tg).await.unwrap());
        assert_eq!(store.write_count(), 0);

        assert!(arb.try_own(&tg).await.unwrap());
        assert!(arb.is_managed(&tg).await.unwrap());
    }
}
