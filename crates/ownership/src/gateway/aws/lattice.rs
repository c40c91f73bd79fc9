//! VPC Lattice API client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::models::{ListPage, ListTagsForResourceResponse, TagResourceRequest};
use super::transport::{decode, http_client, join_segments, parse_endpoint};
use crate::error::CloudError;
use crate::gateway::traits::{PerResourceTagAccess, ResourceRef, ResourceType};
use crate::identity::Identity;
use crate::tags::Tags;

const SERVICE: &str = "vpc-lattice";

/// Page size for list calls.
const LIST_PAGE_SIZE: &str = "100";

/// VPC Lattice client implementing [`PerResourceTagAccess`].
#[derive(Debug, Clone)]
pub struct LatticeClient {
    client: Client,
    endpoint: Url,
    /// Scope target group listings to this VPC.
    vpc_id: Option<String>,
}

impl LatticeClient {
    /// Create a client for the regional Lattice endpoint.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(region: &str) -> Result<Self, CloudError> {
        Ok(Self {
            client: http_client()?,
            endpoint: parse_endpoint(&format!("https://vpc-lattice.{region}.amazonaws.com"))?,
            vpc_id: None,
        })
    }

    /// Create a client for `identity`'s region with target group listings
    /// scoped to its VPC.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn for_identity(identity: &Identity) -> Result<Self, CloudError> {
        Ok(Self::new(identity.region())?.with_vpc(identity.vpc_id()))
    }

    /// Send requests to `endpoint` instead of the regional default.
    ///
    /// # Errors
    /// Returns [`CloudError::Config`] if `endpoint` is not a base URL.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, CloudError> {
        self.endpoint = parse_endpoint(endpoint)?;
        Ok(self)
    }

    /// Only list target groups that belong to `vpc_id`.
    #[must_use]
    pub fn with_vpc(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = Some(vpc_id.into());
        self
    }

    fn list_path(resource_type: ResourceType) -> &'static str {
        match resource_type {
            ResourceType::TargetGroup => "targetgroups",
            ResourceType::Service => "services",
            ResourceType::ServiceNetwork => "servicenetworks",
        }
    }

    fn list_operation(resource_type: ResourceType) -> &'static str {
        match resource_type {
            ResourceType::TargetGroup => "ListTargetGroups",
            ResourceType::Service => "ListServices",
            ResourceType::ServiceNetwork => "ListServiceNetworks",
        }
    }

    async fn list_page(
        &self,
        resource_type: ResourceType,
        next_token: Option<&str>,
    ) -> Result<ListPage, CloudError> {
        let operation = Self::list_operation(resource_type);
        let mut url = join_segments(&self.endpoint, &[Self::list_path(resource_type)])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("maxResults", LIST_PAGE_SIZE);
            if let (ResourceType::TargetGroup, Some(vpc_id)) = (resource_type, &self.vpc_id) {
                query.append_pair("vpcIdentifier", vpc_id);
            }
            if let Some(token) = next_token {
                query.append_pair("nextToken", token);
            }
        }

        debug!(url = %url, operation, "AWS request");
        let response = self.client.get(url).send().await?;
        decode(SERVICE, operation, Self::list_path(resource_type), response).await
    }
}

#[async_trait]
impl PerResourceTagAccess for LatticeClient {
    async fn get_tags(&self, resource: &ResourceRef) -> Result<Tags, CloudError> {
        let url = join_segments(&self.endpoint, &["tags", resource.arn.as_str()])?;
        debug!(url = %url, operation = "ListTagsForResource", "AWS request");

        let response = self.client.get(url).send().await?;
        let body: ListTagsForResourceResponse =
            decode(SERVICE, "ListTagsForResource", &resource.arn, response).await?;
        Ok(body.tags)
    }

    async fn set_tags(&self, resource: &ResourceRef, tags: &Tags) -> Result<(), CloudError> {
        let url = join_segments(&self.endpoint, &["tags", resource.arn.as_str()])?;
        debug!(url = %url, operation = "TagResource", count = tags.len(), "AWS request");

        let response = self
            .client
            .post(url)
            .json(&TagResourceRequest::from_tags(tags))
            .send()
            .await?;
        decode::<serde_json::Value>(SERVICE, "TagResource", &resource.arn, response).await?;

        info!(arn = %resource.arn, count = tags.len(), "Tagged resource");
        Ok(())
    }

    async fn list_refs(
        &self,
        resource_type: ResourceType,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        let mut refs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self.list_page(resource_type, next_token.as_deref()).await?;
            refs.extend(
                page.items
                    .into_iter()
                    .map(|item| ResourceRef::new(resource_type, item.arn)),
            );

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(%resource_type, count = refs.len(), "Listed resources");
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_identity_scopes_to_vpc() {
        let identity = Identity::new("1", "us-west-2", "c", "vpc-1", true).unwrap();
        let client = LatticeClient::for_identity(&identity).unwrap();
        assert_eq!(client.vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(
            client.endpoint.as_str(),
            "https://vpc-lattice.us-west-2.amazonaws.com/"
        );
    }

    #[test]
    fn test_list_paths() {
        assert_eq!(
            LatticeClient::list_path(ResourceType::TargetGroup),
            "targetgroups"
        );
        assert_eq!(
            LatticeClient::list_operation(ResourceType::ServiceNetwork),
            "ListServiceNetworks"
        );
    }
}
