//! Attribute and object templates.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::bounds::Bounds;
use super::tag::Tag;
use super::value::AttributeValue;
use crate::primitives::{AUTO_SCOPE, PERSISTENT_ID_SCOPE};
use crate::types::{AttributeKind, Slot, TemplateKind, Uids};

/// Named schema for a single condition, parameter or property.
///
/// Immutable once registered; registries hand out `Arc<AttributeTemplate>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    pub bounds: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub uids: Uids,
}

impl AttributeTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind, bounds: Bounds) -> Self {
        Self {
            name: name.into(),
            kind,
            bounds,
            default: None,
            description: None,
            uids: Uids::new(),
        }
    }

    #[must_use]
    pub fn condition(name: impl Into<String>, bounds: Bounds) -> Self {
        Self::new(name, AttributeKind::Condition, bounds)
    }

    #[must_use]
    pub fn parameter(name: impl Into<String>, bounds: Bounds) -> Self {
        Self::new(name, AttributeKind::Parameter, bounds)
    }

    #[must_use]
    pub fn property(name: impl Into<String>, bounds: Bounds) -> Self {
        Self::new(name, AttributeKind::Property, bounds)
    }

    /// Declare the value node construction populates on the spec.
    #[must_use]
    pub fn with_default(mut self, value: AttributeValue) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_uid(mut self, scope: impl Into<String>, id: impl Into<String>) -> Self {
        self.uids.insert(scope.into(), id.into());
        self
    }

    /// The `auto` identifier, once issued.
    #[must_use]
    pub fn auto_id(&self) -> Option<&str> {
        self.uids.get(AUTO_SCOPE).map(String::as_str)
    }
}

/// A material, process or measurement template.
///
/// Attribute templates are held in kind-specific slots, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTemplate {
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Arc<AttributeTemplate>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Arc<AttributeTemplate>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Arc<AttributeTemplate>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub uids: Uids,
}

impl ObjectTemplate {
    #[must_use]
    pub fn new(kind: TemplateKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: None,
            conditions: Vec::new(),
            parameters: Vec::new(),
            properties: Vec::new(),
            tags: Vec::new(),
            uids: Uids::new(),
        }
    }

    #[must_use]
    pub fn material(name: impl Into<String>) -> Self {
        Self::new(TemplateKind::Material, name)
    }

    #[must_use]
    pub fn process(name: impl Into<String>) -> Self {
        Self::new(TemplateKind::Process, name)
    }

    #[must_use]
    pub fn measurement(name: impl Into<String>) -> Self {
        Self::new(TemplateKind::Measurement, name)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append condition templates.
    #[must_use]
    pub fn with_conditions<I, T>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<AttributeTemplate>>,
    {
        self.conditions.extend(templates.into_iter().map(Into::into));
        self
    }

    /// Append parameter templates.
    #[must_use]
    pub fn with_parameters<I, T>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<AttributeTemplate>>,
    {
        self.parameters.extend(templates.into_iter().map(Into::into));
        self
    }

    /// Append property templates.
    #[must_use]
    pub fn with_properties<I, T>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<AttributeTemplate>>,
    {
        self.properties.extend(templates.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    #[must_use]
    pub fn with_uid(mut self, scope: impl Into<String>, id: impl Into<String>) -> Self {
        self.uids.insert(scope.into(), id.into());
        self
    }

    /// Attribute templates in a slot.
    #[must_use]
    pub fn slot(&self, slot: Slot) -> &[Arc<AttributeTemplate>] {
        match slot {
            Slot::Conditions => &self.conditions,
            Slot::Parameters => &self.parameters,
            Slot::Properties => &self.properties,
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut Vec<Arc<AttributeTemplate>> {
        match slot {
            Slot::Conditions => &mut self.conditions,
            Slot::Parameters => &mut self.parameters,
            Slot::Properties => &mut self.properties,
        }
    }

    /// Iterate over every attribute template, walking conditions, parameters
    /// and properties in that order.
    pub fn attribute_templates(&self) -> impl Iterator<Item = &Arc<AttributeTemplate>> {
        self.conditions
            .iter()
            .chain(self.parameters.iter())
            .chain(self.properties.iter())
    }

    /// The `auto` identifier, once issued.
    #[must_use]
    pub fn auto_id(&self) -> Option<&str> {
        self.uids.get(AUTO_SCOPE).map(String::as_str)
    }

    /// The `persistent_id` identifier, once registered.
    #[must_use]
    pub fn persistent_id(&self) -> Option<&str> {
        self.uids.get(PERSISTENT_ID_SCOPE).map(String::as_str)
    }
}
