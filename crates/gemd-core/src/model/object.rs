//! Specs and runs.
//!
//! A [`Spec`] is the planned instance of an object template; a [`Run`] is the
//! executed instance derived from exactly one spec. Both expose the same
//! attribute-slot shape through [`GemdObject`], which is the seam every update
//! operation writes through.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::attribute::Attribute;
use super::file_link::FileLink;
use super::source::Source;
use super::tag::Tag;
use super::template::ObjectTemplate;
use crate::ids::IdService;
use crate::primitives::AUTO_SCOPE;
use crate::types::{LinkByUid, NodeKind, Slot, Uids, Which};

/// Common surface of specs and runs.
pub trait GemdObject {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn notes(&self) -> Option<&str>;
    fn set_notes(&mut self, notes: Option<String>);
    fn uids(&self) -> &Uids;
    fn slot(&self, slot: Slot) -> &[Attribute];
    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<Attribute>;
    fn tags(&self) -> &[Tag];
    fn tags_mut(&mut self) -> &mut Vec<Tag>;
    fn file_links(&self) -> &[FileLink];
    fn file_links_mut(&mut self) -> &mut Vec<FileLink>;

    /// The `auto` identifier.
    fn auto_id(&self) -> Option<&str> {
        self.uids().get(AUTO_SCOPE).map(String::as_str)
    }
}

/// Pick the halves of a node an update writes to.
pub fn select_targets<'a>(
    spec: &'a mut Spec,
    run: &'a mut Run,
    which: Which,
) -> Vec<&'a mut dyn GemdObject> {
    let mut targets: Vec<&'a mut dyn GemdObject> = Vec::with_capacity(2);
    if which.includes_spec() {
        targets.push(spec);
    }
    if which.includes_run() {
        targets.push(run);
    }
    targets
}

// =============================================================================
// SPEC
// =============================================================================

/// Planned instance of an object template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub uids: Uids,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Arc<ObjectTemplate>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_links: Vec<FileLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Ingredients: the material spec consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<LinkByUid>,
    /// Ingredients: the process spec consuming it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<LinkByUid>,
}

impl Spec {
    /// Create a spec with a freshly issued `auto` identifier.
    #[must_use]
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        let mut uids = Uids::new();
        IdService::stamp_auto(&mut uids);
        Self {
            kind,
            name: name.into(),
            notes: None,
            uids,
            template: None,
            conditions: Vec::new(),
            parameters: Vec::new(),
            properties: Vec::new(),
            tags: Vec::new(),
            file_links: Vec::new(),
            source: None,
            material: None,
            process: None,
        }
    }

    /// Link to this spec by its `auto` identifier.
    #[must_use]
    pub fn link(&self) -> Option<LinkByUid> {
        self.auto_id().map(LinkByUid::auto)
    }

    /// Derive a run from this spec.
    ///
    /// The run gets its own `auto` identifier, the spec's name and notes, a
    /// link back to the spec and empty attribute slots.
    #[must_use]
    pub fn make_instance(&self) -> Run {
        let mut run = Run::new(self.kind, self.name.clone());
        run.notes = self.notes.clone();
        run.spec = self.link();
        run
    }
}

impl GemdObject for Spec {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    fn uids(&self) -> &Uids {
        &self.uids
    }

    fn slot(&self, slot: Slot) -> &[Attribute] {
        match slot {
            Slot::Conditions => &self.conditions,
            Slot::Parameters => &self.parameters,
            Slot::Properties => &self.properties,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<Attribute> {
        match slot {
            Slot::Conditions => &mut self.conditions,
            Slot::Parameters => &mut self.parameters,
            Slot::Properties => &mut self.properties,
        }
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.tags
    }

    fn file_links(&self) -> &[FileLink] {
        &self.file_links
    }

    fn file_links_mut(&mut self) -> &mut Vec<FileLink> {
        &mut self.file_links
    }
}

// =============================================================================
// RUN
// =============================================================================

/// Executed instance derived from a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub uids: Uids,
    /// The spec this run was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<LinkByUid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_links: Vec<FileLink>,
    /// Measurements: the material run measured. Ingredients: the material run consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<LinkByUid>,
    /// Ingredients: the process run consuming it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<LinkByUid>,
}

impl Run {
    /// Create an unlinked run with a freshly issued `auto` identifier.
    #[must_use]
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        let mut uids = Uids::new();
        IdService::stamp_auto(&mut uids);
        Self {
            kind,
            name: name.into(),
            notes: None,
            uids,
            spec: None,
            conditions: Vec::new(),
            parameters: Vec::new(),
            properties: Vec::new(),
            tags: Vec::new(),
            file_links: Vec::new(),
            material: None,
            process: None,
        }
    }

    /// Link to this run by its `auto` identifier.
    #[must_use]
    pub fn link(&self) -> Option<LinkByUid> {
        self.auto_id().map(LinkByUid::auto)
    }

    /// Whether this run was derived from `spec`.
    #[must_use]
    pub fn belongs_to(&self, spec: &Spec) -> bool {
        match (&self.spec, spec.link()) {
            (Some(ours), Some(theirs)) => *ours == theirs,
            _ => false,
        }
    }
}

impl GemdObject for Run {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    fn uids(&self) -> &Uids {
        &self.uids
    }

    fn slot(&self, slot: Slot) -> &[Attribute] {
        match slot {
            Slot::Conditions => &self.conditions,
            Slot::Parameters => &self.parameters,
            Slot::Properties => &self.properties,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<Attribute> {
        match slot {
            Slot::Conditions => &mut self.conditions,
            Slot::Parameters => &mut self.parameters,
            Slot::Properties => &mut self.properties,
        }
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.tags
    }

    fn file_links(&self) -> &[FileLink] {
        &self.file_links
    }

    fn file_links_mut(&mut self) -> &mut Vec<FileLink> {
        &mut self.file_links
    }
}
