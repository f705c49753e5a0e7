//! # gemd-core
//!
//! The Node Authoring & Template Store for GEMD material workflows.
//!
//! Every workflow node carries three co-evolving artifacts: a **Template**
//! (the allowed attributes and their bounds), a **Spec** (the planned
//! instance) and a **Run** (the executed instance). This crate:
//!
//! - constructs Template/Spec/Run triples while validating attributes
//!   against template bounds
//! - deduplicates templates through a content-addressed store
//! - keeps attributes, tags and file links consistent across spec and run
//!
//! ## Architectural Constraints
//!
//! - Single-threaded and synchronous: NO async, NO network dependencies
//! - The `TemplateRegistry` is the only long-lived mutable state and is owned
//!   by the host (no import-time globals)
//! - Registered templates are immutable; nodes hold `Arc`s to the canonical
//!   objects
//! - Non-test code never panics; every failure is a `GemdError`

// =============================================================================
// MODULES
// =============================================================================

pub mod attributes;
pub mod formats;
pub mod ids;
pub mod model;
pub mod node;
pub mod primitives;
pub mod registry;
pub mod stores;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AttributeKind, GemdError, LinkByUid, NodeKind, Provenance, Slot, TemplateKind, Uids, Which,
};

// =============================================================================
// RE-EXPORTS: Value Model
// =============================================================================

pub use model::{
    Attribute, AttributeTemplate, AttributeValue, Bounds, FileLink, GemdObject, ObjectTemplate,
    Run, Source, Spec, Tag, TagTree, content_digest,
};

// =============================================================================
// RE-EXPORTS: Authoring Core
// =============================================================================

pub use attributes::{AttrEntry, AttributeKit, AttrsDict};
pub use ids::IdService;
pub use node::{FileLinksDict, Node, NodeClass, NodeInput, TagsDict};
pub use registry::{ManifestEntry, Registered, TemplateRecord, TemplateRegistry};
pub use stores::TemplateStores;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Depth, Encoder, JsonEncoder};
