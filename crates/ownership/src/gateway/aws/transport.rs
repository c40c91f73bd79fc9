//! Response handling shared by the AWS clients.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::models::ApiErrorBody;
use crate::error::CloudError;

/// Default timeout for API requests.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub(crate) fn http_client() -> Result<Client, CloudError> {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent(concat!("lattice-ownership/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(CloudError::Http)
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, CloudError> {
    let url = Url::parse(endpoint)
        .map_err(|e| CloudError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(CloudError::Config(format!(
            "endpoint '{endpoint}' cannot be used as a base URL"
        )));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, CloudError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| CloudError::Config(format!("endpoint '{base}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Decode a response, mapping error statuses onto [`CloudError`].
///
/// `target` names the resource for `NotFound` errors.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    service: &str,
    operation: &str,
    target: &str,
    response: reqwest::Response,
) -> Result<T, CloudError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        debug!(service, operation, target, status = status.as_u16(), "response");
        let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
        return serde_json::from_str(body).map_err(|e| {
            warn!(error = %e, body = %text, service, operation, "Failed to parse response");
            CloudError::Serialization(e)
        });
    }

    let error: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let error_type = error.error_type.unwrap_or_default();
    let message = error.message.unwrap_or(text);
    debug!(
        service,
        operation,
        target,
        status = status.as_u16(),
        error_type = %error_type,
        error = %message,
        "error"
    );

    if status == StatusCode::NOT_FOUND || error_type.ends_with("ResourceNotFoundException") {
        Err(CloudError::NotFound(target.to_string()))
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(CloudError::Auth(message))
    } else if status == StatusCode::TOO_MANY_REQUESTS || error_type.ends_with("ThrottlingException")
    {
        Err(CloudError::Throttled(message))
    } else {
        Err(CloudError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
