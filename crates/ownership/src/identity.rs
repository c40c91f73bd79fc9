//! Controller identity and the ownership token derived from it.

use serde::{Deserialize, Serialize};

use crate::error::CloudError;

/// Separator between token components.
const TOKEN_SEPARATOR: char = '/';

/// Identity of one controller instance.
///
/// Built once at startup and immutable afterwards. Every controller process
/// running for the same account, cluster and VPC produces the same
/// [`OwnershipToken`] and therefore shares ownership of the same resources.
///
/// Deserializing runs the same validation as [`Identity::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawIdentity")]
pub struct Identity {
    account_id: String,
    region: String,
    cluster_name: String,
    vpc_id: String,
    #[serde(default)]
    network_isolated: bool,
}

/// Unvalidated wire form of [`Identity`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdentity {
    account_id: String,
    region: String,
    cluster_name: String,
    vpc_id: String,
    #[serde(default)]
    network_isolated: bool,
}

impl TryFrom<RawIdentity> for Identity {
    type Error = CloudError;

    fn try_from(raw: RawIdentity) -> Result<Self, Self::Error> {
        Self::new(
            raw.account_id,
            raw.region,
            raw.cluster_name,
            raw.vpc_id,
            raw.network_isolated,
        )
    }
}

impl Identity {
    /// Create a new identity.
    ///
    /// # Errors
    /// Returns [`CloudError::Config`] if the account, cluster or VPC is empty
    /// or contains `/`, since either would make the ownership token ambiguous.
    pub fn new(
        account_id: impl Into<String>,
        region: impl Into<String>,
        cluster_name: impl Into<String>,
        vpc_id: impl Into<String>,
        network_isolated: bool,
    ) -> Result<Self, CloudError> {
        let identity = Self {
            account_id: account_id.into(),
            region: region.into(),
            cluster_name: cluster_name.into(),
            vpc_id: vpc_id.into(),
            network_isolated,
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Create an identity from environment variables.
    ///
    /// Reads `AWS_ACCOUNT_ID`, `REGION` (or `AWS_REGION`), `CLUSTER_NAME`,
    /// `CLUSTER_VPC_ID` and the optional `ENABLE_PRIVATE_VPC` flag.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or the values fail
    /// validation.
    pub fn from_env() -> Result<Self, CloudError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CloudError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CloudError::Config(format!("{key} environment variable not set")))
        };

        let region = lookup("REGION")
            .filter(|v| !v.is_empty())
            .or_else(|| lookup("AWS_REGION"))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CloudError::Config("REGION environment variable not set".to_string()))?;

        let network_isolated = match lookup("ENABLE_PRIVATE_VPC") {
            None => false,
            Some(v) => parse_flag(&v).ok_or_else(|| {
                CloudError::Config(format!("ENABLE_PRIVATE_VPC must be true or false, got '{v}'"))
            })?,
        };

        Self::new(
            required("AWS_ACCOUNT_ID")?,
            region,
            required("CLUSTER_NAME")?,
            required("CLUSTER_VPC_ID")?,
            network_isolated,
        )
    }

    /// Check the invariants that [`Identity::new`] enforces.
    ///
    /// # Errors
    /// Returns [`CloudError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), CloudError> {
        for (field, value) in [
            ("accountId", &self.account_id),
            ("clusterName", &self.cluster_name),
            ("vpcId", &self.vpc_id),
        ] {
            if value.is_empty() {
                return Err(CloudError::Config(format!("{field} must not be empty")));
            }
            if value.contains(TOKEN_SEPARATOR) {
                return Err(CloudError::Config(format!(
                    "{field} '{value}' must not contain '{TOKEN_SEPARATOR}'"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    #[must_use]
    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    /// Whether the bulk tagging API is unreachable from this deployment.
    #[must_use]
    pub fn network_isolated(&self) -> bool {
        self.network_isolated
    }

    /// Ownership token in the `{accountId}/{clusterName}/{vpcId}` format.
    #[must_use]
    pub fn ownership_token(&self) -> OwnershipToken {
        OwnershipToken(format!(
            "{}{TOKEN_SEPARATOR}{}{TOKEN_SEPARATOR}{}",
            self.account_id, self.cluster_name, self.vpc_id
        ))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Value stored in the ManagedBy tag. Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnershipToken(String);

impl OwnershipToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnershipToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for OwnershipToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for OwnershipToken {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
