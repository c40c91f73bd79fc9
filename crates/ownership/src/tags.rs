//! Tag sets and the reserved ownership tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::OwnershipToken;

/// Namespace prefix for tags reserved by the controller.
pub const TAG_BASE: &str = "application-networking.k8s.aws/";

/// Tag holding the [`OwnershipToken`] of the owning controller.
pub const TAG_MANAGED_BY: &str = "application-networking.k8s.aws/ManagedBy";

/// Tags on a remote resource.
///
/// A value is optional: `None` means the key is present without a value,
/// which is distinct from the key being absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, Option<String>>);

impl Tags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag set containing only the ManagedBy tag for `token`.
    #[must_use]
    pub fn ownership(token: &OwnershipToken) -> Self {
        let mut tags = Self::new();
        tags.insert(TAG_MANAGED_BY, token.as_str());
        tags
    }

    /// Build from entries whose values may be missing.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Option<String>)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Insert a tag with a value, returning the previous value if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<Option<String>> {
        self.0.insert(key.into(), Some(value.into()))
    }

    /// Insert a key without a value.
    pub fn insert_key(&mut self, key: impl Into<String>) -> Option<Option<String>> {
        self.0.insert(key.into(), None)
    }

    /// Lookup a key. The outer `Option` is key presence, the inner one the value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Copy every tag of `other` into `self`, overwriting on key collision.
    pub fn extend_from(&mut self, other: &Tags) {
        self.0.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Tags overlaid with `overrides`; neither input is modified.
    #[must_use]
    pub fn merged_with(&self, overrides: &Tags) -> Tags {
        let mut merged = self.clone();
        merged.extend_from(overrides);
        merged
    }

    /// Value of the ManagedBy tag, or `""` when the tag is absent, has no
    /// value, or has an empty value.
    #[must_use]
    pub fn managed_by(&self) -> &str {
        self.get(TAG_MANAGED_BY).flatten().unwrap_or_default()
    }

    /// Whether every tag in `query` is present here with an equal value.
    /// Tags not named by `query` are ignored.
    #[must_use]
    pub fn contains_all(&self, query: &Tags) -> bool {
        query
            .0
            .iter()
            .all(|(key, value)| self.0.get(key).is_some_and(|v| v == value))
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = (&'a String, &'a Option<String>);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Tags {
    type Item = (String, Option<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Superset test used by discovery: `candidate` matches when it carries
/// every tag in `query`.
#[must_use]
pub fn contains_tags(query: &Tags, candidate: &Tags) -> bool {
    candidate.contains_all(query)
}
