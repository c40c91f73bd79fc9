//! AWS API request and response models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tags::Tags;

// ============================================================================
// Resource groups tagging API
// ============================================================================

/// `GetResources` request.
///
/// `ResourceARNList` cannot be combined with type or tag filters.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResourcesRequest {
    /// Explicit ARNs to look up (at most 100).
    #[serde(rename = "ResourceARNList", skip_serializing_if = "Vec::is_empty")]
    pub resource_arn_list: Vec<String>,
    /// Resource type filters, e.g. `vpc-lattice:targetgroup`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_type_filters: Vec<String>,
    /// Tag filters; a resource must match all of them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_filters: Vec<TagFilter>,
    /// Token from the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_token: Option<String>,
}

/// Tag filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagFilter {
    /// Tag key.
    pub key: String,
    /// Accepted values. Empty matches any value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl TagFilter {
    /// One filter per query tag.
    #[must_use]
    pub fn from_tags(query: &Tags) -> Vec<Self> {
        query
            .iter()
            .map(|(key, value)| Self {
                key: key.to_string(),
                values: value.map(str::to_string).into_iter().collect(),
            })
            .collect()
    }
}

/// `GetResources` response page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResourcesResponse {
    /// Empty or absent on the last page.
    pub pagination_token: Option<String>,
    /// Matching resources with their tags.
    #[serde(default)]
    pub resource_tag_mapping_list: Vec<ResourceTagMapping>,
}

/// A resource and its tags.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceTagMapping {
    /// Resource ARN.
    #[serde(rename = "ResourceARN")]
    pub resource_arn: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Key/value tag as returned by the tagging API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: Option<String>,
}

impl ResourceTagMapping {
    /// Convert the tag list into a [`Tags`] set.
    pub fn to_tags(&self) -> Tags {
        Tags::from_entries(self.tags.iter().map(|t| (t.key.clone(), t.value.clone())))
    }
}

// ============================================================================
// VPC Lattice API
// ============================================================================

/// `ListTagsForResource` response.
#[derive(Debug, Deserialize)]
pub struct ListTagsForResourceResponse {
    /// Tags on the resource.
    #[serde(default)]
    pub tags: Tags,
}

/// `TagResource` request.
#[derive(Debug, Serialize)]
pub struct TagResourceRequest {
    /// Tags to add or overwrite.
    pub tags: BTreeMap<String, String>,
}

impl TagResourceRequest {
    /// The Lattice API requires string values; a missing value is sent empty.
    pub fn from_tags(tags: &Tags) -> Self {
        Self {
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.unwrap_or_default().to_string()))
                .collect(),
        }
    }
}

/// One page of a Lattice list call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    /// Resource summaries.
    #[serde(default)]
    pub items: Vec<ResourceSummary>,
    /// Token for the next page.
    pub next_token: Option<String>,
}

/// Summary of a listed resource.
#[derive(Debug, Deserialize)]
pub struct ResourceSummary {
    /// Resource ARN.
    pub arn: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body shared by the JSON and REST protocols.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Error type, e.g. `ThrottlingException`.
    #[serde(rename = "__type")]
    pub error_type: Option<String>,
    /// Human readable message.
    #[serde(alias = "Message")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_resources_request_omits_empty_fields() {
        let req = GetResourcesRequest {
            resource_arn_list: vec!["arn:a".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "ResourceARNList": ["arn:a"] }));
    }

    #[test]
    fn test_tag_filter_from_tags() {
        let mut query: Tags = [("app", "x")].into_iter().collect();
        query.insert_key("team");

        let filters = TagFilter::from_tags(&query);
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "Key": "app", "Values": ["x"] },
                { "Key": "team" }
            ])
        );
    }

    #[test]
    fn test_resource_tag_mapping_to_tags() {
        let mapping: ResourceTagMapping = serde_json::from_str(
            r#"{"ResourceARN":"arn:a","Tags":[{"Key":"k","Value":"v"},{"Key":"n"}]}"#,
        )
        .unwrap();
        let tags = mapping.to_tags();
        assert_eq!(tags.get("k"), Some(Some("v")));
        assert_eq!(tags.get("n"), Some(None));
    }

    #[test]
    fn test_tag_resource_request_fills_missing_values() {
        let mut tags = Tags::new();
        tags.insert_key("flag");
        let req = TagResourceRequest::from_tags(&tags);
        assert_eq!(req.tags.get("flag").map(String::as_str), Some(""));
    }
}
