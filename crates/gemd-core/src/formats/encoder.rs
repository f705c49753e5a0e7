//! # Encoder
//!
//! The `Encoder` trait is the seam through which the template store and node
//! dumps persist GEMD objects. `JsonEncoder` is the stock implementation.
//!
//! ## Depth
//!
//! - `Deep`: templates are embedded in full.
//! - `Thin`: every embedded template (the object template of a spec and the
//!   attribute template of each attribute) is replaced by a `LinkByUid` in
//!   the `auto` scope.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::model::{ObjectTemplate, Run, Spec};
use crate::primitives::AUTO_SCOPE;
use crate::types::LinkByUid;
use crate::GemdError;

/// How much of the object graph an encoding embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    Thin,
    #[default]
    Deep,
}

/// Serializer for GEMD objects.
///
/// Implementations are pure: no file I/O.
pub trait Encoder: fmt::Debug {
    /// Serialize an object template.
    fn encode_template(&self, template: &ObjectTemplate) -> Result<Vec<u8>, GemdError>;

    /// Deserialize an object template.
    ///
    /// Returns `GemdError::WrongType` if the bytes are not an object template.
    fn decode_template(&self, bytes: &[u8]) -> Result<ObjectTemplate, GemdError>;

    /// Serialize a spec at the requested depth.
    fn encode_spec(&self, spec: &Spec, depth: Depth) -> Result<Vec<u8>, GemdError>;

    /// Serialize a run at the requested depth.
    fn encode_run(&self, run: &Run, depth: Depth) -> Result<Vec<u8>, GemdError>;
}

/// JSON encoder backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder {
    pretty: bool,
}

impl JsonEncoder {
    /// Compact single-line output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }

    fn to_bytes(&self, value: &Value) -> Result<Vec<u8>, GemdError> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        result.map_err(|e| GemdError::SerializationError(e.to_string()))
    }

    fn encode_object<T: Serialize>(&self, object: &T, depth: Depth) -> Result<Vec<u8>, GemdError> {
        let mut json = to_json(object)?;
        if depth == Depth::Thin {
            thin_out(&mut json);
        }
        self.to_bytes(&json)
    }
}

impl Encoder for JsonEncoder {
    fn encode_template(&self, template: &ObjectTemplate) -> Result<Vec<u8>, GemdError> {
        self.to_bytes(&to_json(template)?)
    }

    fn decode_template(&self, bytes: &[u8]) -> Result<ObjectTemplate, GemdError> {
        serde_json::from_slice(bytes)
            .map_err(|e| GemdError::WrongType(format!("not an object template: {}", e)))
    }

    fn encode_spec(&self, spec: &Spec, depth: Depth) -> Result<Vec<u8>, GemdError> {
        self.encode_object(spec, depth)
    }

    fn encode_run(&self, run: &Run, depth: Depth) -> Result<Vec<u8>, GemdError> {
        self.encode_object(run, depth)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, GemdError> {
    serde_json::to_value(value).map_err(|e| GemdError::SerializationError(e.to_string()))
}

/// Replace embedded templates by links.
fn thin_out(object: &mut Value) {
    let Value::Object(map) = object else {
        return;
    };
    if let Some(template) = map.get_mut("template") {
        link_in_place(template);
    }
    for slot in ["conditions", "parameters", "properties"] {
        if let Some(Value::Array(attributes)) = map.get_mut(slot) {
            for attribute in attributes {
                if let Some(template) = attribute.get_mut("template") {
                    link_in_place(template);
                }
            }
        }
    }
}

fn link_in_place(embedded: &mut Value) {
    let auto = embedded
        .get("uids")
        .and_then(|uids| uids.get(AUTO_SCOPE))
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(id) = auto {
        if let Ok(link) = serde_json::to_value(LinkByUid::auto(id)) {
            *embedded = link;
        }
    }
}
