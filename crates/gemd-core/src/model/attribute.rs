//! Concrete attributes attached to specs and runs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::template::AttributeTemplate;
use super::value::AttributeValue;
use crate::types::AttributeKind;

/// A condition, parameter or property value citing its attribute template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    pub value: AttributeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Arc<AttributeTemplate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            template: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn condition(name: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(name, AttributeKind::Condition, value)
    }

    #[must_use]
    pub fn parameter(name: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(name, AttributeKind::Parameter, value)
    }

    #[must_use]
    pub fn property(name: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(name, AttributeKind::Property, value)
    }

    /// Cite an attribute template.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<Arc<AttributeTemplate>>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
