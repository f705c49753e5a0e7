//! # GEMD Value Model
//!
//! The Template / Spec / Run value types the authoring core collaborates with:
//! attribute templates and bounds, object templates, concrete attributes,
//! hierarchical tags, file links and performer sources.
//!
//! Everything here is plain serde data. Validation against templates lives in
//! [`crate::attributes`]; identity and registration live in [`crate::ids`] and
//! [`crate::registry`].

pub mod attribute;
pub mod bounds;
pub mod digest;
pub mod file_link;
pub mod object;
pub mod source;
pub mod tag;
pub mod template;
pub mod value;

pub use attribute::Attribute;
pub use bounds::Bounds;
pub use digest::content_digest;
pub use file_link::FileLink;
pub use object::{GemdObject, Run, Spec, select_targets};
pub use source::Source;
pub use tag::{Tag, TagTree};
pub use template::{AttributeTemplate, ObjectTemplate};
pub use value::AttributeValue;
