//! # Core Type Definitions
//!
//! This module contains the classification types shared by every layer of the
//! authoring core:
//! - Identifier maps and thin references (`Uids`, `LinkByUid`)
//! - Kind enums (`NodeKind`, `TemplateKind`, `AttributeKind`, `Slot`)
//! - Write targets (`Which`) and template provenance (`Provenance`)
//! - Error types (`GemdError`)
//!
//! ## Determinism Guarantees
//!
//! All enums implement `Ord` so they can key `BTreeMap`s, and every keyed
//! collection in the crate iterates in a stable order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::primitives::AUTO_SCOPE;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Map of identifier scope to identifier value.
///
/// The scopes `auto` and `persistent_id` are reserved for the core.
pub type Uids = BTreeMap<String, String>;

/// A thin reference to another GEMD object by one of its identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkByUid {
    /// The identifier scope.
    pub scope: String,
    /// The identifier value within the scope.
    pub id: String,
}

impl LinkByUid {
    /// Create a new link.
    #[must_use]
    pub fn new(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            id: id.into(),
        }
    }

    /// Create a link in the `auto` scope.
    #[must_use]
    pub fn auto(id: impl Into<String>) -> Self {
        Self::new(AUTO_SCOPE, id)
    }
}

// =============================================================================
// ATTRIBUTE CLASSIFICATION
// =============================================================================

/// The three kinds of GEMD attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Condition,
    Parameter,
    Property,
}

impl AttributeKind {
    /// All attribute kinds in slot order.
    pub const ALL: [Self; 3] = [Self::Condition, Self::Parameter, Self::Property];

    /// The slot attributes of this kind live in.
    #[must_use]
    pub const fn slot(self) -> Slot {
        match self {
            Self::Condition => Slot::Conditions,
            Self::Parameter => Slot::Parameters,
            Self::Property => Slot::Properties,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Condition => "condition",
            Self::Parameter => "parameter",
            Self::Property => "property",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute compartment on a template, spec or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Conditions,
    Parameters,
    Properties,
}

impl Slot {
    /// All slots, in the order node construction walks them.
    pub const ALL: [Self; 3] = [Self::Conditions, Self::Parameters, Self::Properties];

    /// The attribute kind stored in this slot.
    #[must_use]
    pub const fn attribute_kind(self) -> AttributeKind {
        match self {
            Self::Conditions => AttributeKind::Condition,
            Self::Parameters => AttributeKind::Parameter,
            Self::Properties => AttributeKind::Property,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conditions => "conditions",
            Self::Parameters => "parameters",
            Self::Properties => "properties",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TEMPLATE & NODE KINDS
// =============================================================================

/// The three GEMD object template types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemplateKind {
    #[serde(rename = "material_template")]
    Material,
    #[serde(rename = "process_template")]
    Process,
    #[serde(rename = "measurement_template")]
    Measurement,
}

impl TemplateKind {
    /// All template kinds in store-folder order.
    pub const ALL: [Self; 3] = [Self::Material, Self::Process, Self::Measurement];

    /// Slots a template of this kind may declare.
    #[must_use]
    pub const fn allowed_slots(self) -> &'static [Slot] {
        match self {
            Self::Material => &[Slot::Properties],
            Self::Process => &[Slot::Conditions, Slot::Parameters],
            Self::Measurement => &[Slot::Conditions, Slot::Parameters, Slot::Properties],
        }
    }

    /// Whether this template kind may declare the given slot.
    #[must_use]
    pub fn allows(self, slot: Slot) -> bool {
        self.allowed_slots().contains(&slot)
    }

    /// Name of the store subfolder holding templates of this kind.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::Material => "material_templates",
            Self::Process => "process_templates",
            Self::Measurement => "measurement_templates",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Material => "material_template",
            Self::Process => "process_template",
            Self::Measurement => "measurement_template",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = GemdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "material" | "material_template" => Ok(Self::Material),
            "process" | "process_template" => Ok(Self::Process),
            "measurement" | "measurement_template" => Ok(Self::Measurement),
            other => Err(GemdError::WrongType(format!(
                "'{}' is not a template kind",
                other
            ))),
        }
    }
}

/// The four workflow node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Material,
    Process,
    Measurement,
    Ingredient,
}

impl NodeKind {
    /// The template kind a node of this kind is built from.
    ///
    /// Ingredients carry no template.
    #[must_use]
    pub const fn template_kind(self) -> Option<TemplateKind> {
        match self {
            Self::Material => Some(TemplateKind::Material),
            Self::Process => Some(TemplateKind::Process),
            Self::Measurement => Some(TemplateKind::Measurement),
            Self::Ingredient => None,
        }
    }

    /// Slots a node of this kind legally carries.
    #[must_use]
    pub const fn allowed_slots(self) -> &'static [Slot] {
        match self.template_kind() {
            Some(kind) => kind.allowed_slots(),
            None => &[],
        }
    }

    /// Whether this node kind carries a performer source.
    #[must_use]
    pub const fn has_source(self) -> bool {
        matches!(self, Self::Process | Self::Measurement)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Process => "process",
            Self::Measurement => "measurement",
            Self::Ingredient => "ingredient",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// WRITE TARGETS & PROVENANCE
// =============================================================================

/// Which half of a node an update writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Which {
    #[default]
    Spec,
    Run,
    Both,
}

impl Which {
    #[must_use]
    pub const fn includes_spec(self) -> bool {
        matches!(self, Self::Spec | Self::Both)
    }

    #[must_use]
    pub const fn includes_run(self) -> bool {
        matches!(self, Self::Run | Self::Both)
    }
}

impl FromStr for Which {
    type Err = GemdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spec" => Ok(Self::Spec),
            "run" => Ok(Self::Run),
            "both" => Ok(Self::Both),
            other => Err(GemdError::WrongType(format!(
                "which must be one of spec, run, both (got '{}')",
                other
            ))),
        }
    }
}

/// Where the canonical template a node or record holds came from.
///
/// Exactly one applies at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Loaded from the store's directory.
    FromFile,
    /// Passed explicitly by the caller at construction.
    FromMemory,
    /// Declared by the node class.
    FromSubclass,
    /// A matching template was already registered.
    FromStore,
}

impl Provenance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FromFile => "from_file",
            Self::FromMemory => "from_memory",
            Self::FromSubclass => "from_subclass",
            Self::FromStore => "from_store",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the authoring core.
///
/// - Every error is surfaced at the construction or update boundary
/// - The core never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum GemdError {
    /// Neither the node class nor the caller supplied a template.
    #[error("No template supplied for {class} and none declared by the class")]
    MissingTemplate { class: String },

    /// The resolved template is of the wrong GEMD type for the node.
    #[error("Wrong template kind: expected {expected}, found {found}")]
    WrongTemplateKind {
        expected: TemplateKind,
        found: TemplateKind,
    },

    /// A template declares an attribute in a slot its kind disallows.
    #[error("Invalid slot '{slot}' on template '{template}': {reason}")]
    InvalidTemplateSlot {
        template: String,
        slot: Slot,
        reason: String,
    },

    /// The attribute kind is not permitted on this node kind.
    #[error("A {node} node cannot carry {kind} attributes")]
    WrongAttributeKind { kind: AttributeKind, node: NodeKind },

    /// A caller tried to set a reserved identifier scope.
    #[error("Identifier scope '{0}' is reserved and cannot be user-supplied")]
    ReservedIdentifier(String),

    /// A different attribute template is already defined under this name.
    #[error("Attribute name '{0}' is already defined with a different template")]
    DuplicateAttributeName(String),

    /// The attribute is not declared by the object template.
    #[error("Attribute '{name}' is not declared in slot '{slot}' of the template")]
    UnknownAttribute { name: String, slot: Slot },

    /// The attribute value lies outside its template bounds.
    #[error("Value {value} of attribute '{name}' is out of bounds")]
    OutOfBounds { name: String, value: String },

    /// A value of the wrong type was supplied.
    #[error("Wrong type: {0}")]
    WrongType(String),

    /// A run does not belong to the spec it was supplied with.
    #[error("Spec/run mismatch: {0}")]
    SpecRunMismatch(String),

    /// The performer email is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// The performed date is not an ISO 8601 instant.
    #[error("Bad timestamp: {0}")]
    BadTimestamp(String),

    /// A tag component is empty or contains the separator.
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// A filesystem failure during store load or save.
    #[error("Store I/O error at {path:?}: {message}")]
    StoreIo { path: PathBuf, message: String },

    /// The encoder failed to serialize a value.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A store or template lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl GemdError {
    /// Wrap an I/O error with the path it occurred at.
    pub fn store_io(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        Self::StoreIo {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
