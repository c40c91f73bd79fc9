//! Resource groups tagging API client.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::models::{GetResourcesRequest, GetResourcesResponse, TagFilter};
use super::transport::{decode, http_client, parse_endpoint};
use crate::error::CloudError;
use crate::gateway::traits::{BulkTagQuery, ResourceRef, ResourceType};
use crate::tags::Tags;

const SERVICE: &str = "tagging";
const TARGET_GET_RESOURCES: &str = "ResourceGroupsTaggingAPI_20170126.GetResources";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Maximum number of ARNs accepted by one `GetResources` call.
const MAX_ARNS_PER_CALL: usize = 100;

/// Tagging API client implementing [`BulkTagQuery`].
#[derive(Debug, Clone)]
pub struct TaggingClient {
    client: Client,
    endpoint: Url,
}

impl TaggingClient {
    /// Create a client for the regional tagging endpoint.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(region: &str) -> Result<Self, CloudError> {
        Ok(Self {
            client: http_client()?,
            endpoint: parse_endpoint(&format!("https://tagging.{region}.amazonaws.com"))?,
        })
    }

    /// Send requests to `endpoint` instead of the regional default.
    ///
    /// # Errors
    /// Returns [`CloudError::Config`] if `endpoint` is not a base URL.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, CloudError> {
        self.endpoint = parse_endpoint(endpoint)?;
        Ok(self)
    }

    async fn get_resources_page(
        &self,
        request: &GetResourcesRequest,
    ) -> Result<GetResourcesResponse, CloudError> {
        debug!(url = %self.endpoint, operation = "GetResources", "AWS request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", TARGET_GET_RESOURCES)
            .json(request)
            .send()
            .await?;

        decode(SERVICE, "GetResources", self.endpoint.as_str(), response).await
    }

    /// Run `request` and every following page.
    async fn get_all_resources(
        &self,
        mut request: GetResourcesRequest,
    ) -> Result<GetResourcesResponse, CloudError> {
        let mut all = Vec::new();
        loop {
            let page = self.get_resources_page(&request).await?;
            all.extend(page.resource_tag_mapping_list);

            match page.pagination_token.filter(|t| !t.is_empty()) {
                Some(token) => request.pagination_token = Some(token),
                None => break,
            }
        }

        Ok(GetResourcesResponse {
            pagination_token: None,
            resource_tag_mapping_list: all,
        })
    }
}

#[async_trait]
impl BulkTagQuery for TaggingClient {
    async fn get_tags_for_refs(
        &self,
        refs: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, Tags>, CloudError> {
        // The same ARN may be requested under several resource types.
        let mut by_arn: HashMap<&str, Vec<&ResourceRef>> = HashMap::new();
        let mut arns = Vec::new();
        for resource in refs {
            let entry = by_arn.entry(resource.arn.as_str()).or_default();
            if entry.is_empty() {
                arns.push(resource.arn.clone());
            }
            entry.push(resource);
        }
        let mut result = HashMap::with_capacity(refs.len());

        for chunk in arns.chunks(MAX_ARNS_PER_CALL) {
            let request = GetResourcesRequest {
                resource_arn_list: chunk.to_vec(),
                ..Default::default()
            };
            let response = self.get_all_resources(request).await?;

            for mapping in response.resource_tag_mapping_list {
                let Some(matching) = by_arn.get(mapping.resource_arn.as_str()) else {
                    continue;
                };
                let tags = mapping.to_tags();
                for resource in matching {
                    result.insert((*resource).clone(), tags.clone());
                }
            }
        }

        debug!(requested = refs.len(), found = result.len(), "Fetched tags in bulk");
        Ok(result)
    }

    async fn find_refs_by_tags(
        &self,
        resource_type: ResourceType,
        query: &Tags,
    ) -> Result<Vec<ResourceRef>, CloudError> {
        let request = GetResourcesRequest {
            resource_type_filters: vec![resource_type.tagging_filter().to_string()],
            tag_filters: TagFilter::from_tags(query),
            ..Default::default()
        };
        let response = self.get_all_resources(request).await?;

        // A value-less filter matches any value server side; compare exactly here.
        Ok(response
            .resource_tag_mapping_list
            .into_iter()
            .filter(|m| m.to_tags().contains_all(query))
            .map(|m| ResourceRef::new(resource_type, m.resource_arn))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_uses_regional_endpoint() {
        let client = TaggingClient::new("eu-west-1").unwrap();
        assert_eq!(
            client.endpoint.as_str(),
            "https://tagging.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_with_endpoint_validates_url() {
        let client = TaggingClient::new("eu-west-1").unwrap();
        assert!(client.clone().with_endpoint("http://127.0.0.1:4566").is_ok());
        assert!(client.with_endpoint("::").is_err());
    }
}
