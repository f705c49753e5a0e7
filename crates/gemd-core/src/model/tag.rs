//! Hierarchical tags.
//!
//! In memory a tag is its list of components and a set of tags is viewed as a
//! [`TagTree`]. The `"::"`-joined string exists only on the wire: `Tag`
//! serializes to it and parses from it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::primitives::{MAX_TAG_COMPONENT_LENGTH, TAG_SEPARATOR};
use crate::GemdError;

/// A hierarchical tag such as `["alloy", "steel", "316L"]`.
///
/// Components are non-empty, never contain `"::"` and never begin or end with
/// `':'`, so joining and re-splitting reproduces the same components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(Vec<String>);

impl Tag {
    /// Build a tag from its components.
    pub fn new<I, S>(components: I) -> Result<Self, GemdError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        if components.is_empty() {
            return Err(GemdError::InvalidTag("a tag needs at least one component".to_string()));
        }
        for component in &components {
            validate_component(component)?;
        }
        Ok(Self(components))
    }

    /// Parse the `"::"`-joined wire form.
    pub fn parse(joined: &str) -> Result<Self, GemdError> {
        Self::new(joined.split(TAG_SEPARATOR))
    }

    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// The `"::"`-joined wire form.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(TAG_SEPARATOR)
    }
}

fn validate_component(component: &str) -> Result<(), GemdError> {
    if component.is_empty() {
        return Err(GemdError::InvalidTag("empty tag component".to_string()));
    }
    if component.len() > MAX_TAG_COMPONENT_LENGTH {
        return Err(GemdError::InvalidTag(format!(
            "component longer than {} bytes",
            MAX_TAG_COMPONENT_LENGTH
        )));
    }
    if component.contains(TAG_SEPARATOR) || component.starts_with(':') || component.ends_with(':') {
        return Err(GemdError::InvalidTag(format!(
            "component '{}' collides with the '{}' separator",
            component, TAG_SEPARATOR
        )));
    }
    Ok(())
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl FromStr for Tag {
    type Err = GemdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Self::parse(&joined).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TAG TREE
// =============================================================================

/// A trie of tag components.
///
/// Serializes as nested maps, e.g. `{"a": {"b": {"c": {}, "d": {}}}, "x": {}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagTree(BTreeMap<String, TagTree>);

impl TagTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from a set of tags.
    #[must_use]
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Self {
        let mut tree = Self::new();
        for tag in tags {
            tree.insert(tag);
        }
        tree
    }

    pub fn insert(&mut self, tag: &Tag) {
        let mut node = self;
        for component in tag.components() {
            node = node.0.entry(component.clone()).or_default();
        }
    }

    /// The subtree under one component.
    #[must_use]
    pub fn get(&self, component: &str) -> Option<&TagTree> {
        self.0.get(component)
    }

    /// Iterate over the immediate children in component order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &TagTree)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of immediate children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
