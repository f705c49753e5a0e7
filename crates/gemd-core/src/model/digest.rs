//! Content digests.
//!
//! Two templates are structurally identical when their digests match. The
//! digest covers the JSON form of a value with every reserved identifier
//! (`auto`, `persistent_id`) removed from every `uids` map, at any depth.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::primitives::RESERVED_SCOPES;
use crate::GemdError;

/// BLAKE3 hex digest of a value's content, ignoring reserved identifiers.
pub fn content_digest<T: Serialize + ?Sized>(value: &T) -> Result<String, GemdError> {
    let mut json =
        serde_json::to_value(value).map_err(|e| GemdError::SerializationError(e.to_string()))?;
    strip_reserved(&mut json);
    let bytes =
        serde_json::to_vec(&json).map_err(|e| GemdError::SerializationError(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn strip_reserved(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Object(uids)) = map.get_mut("uids") {
                let kept: Map<String, Value> = uids
                    .iter()
                    .filter(|(scope, _)| !RESERVED_SCOPES.contains(&scope.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                *uids = kept;
            }
            for child in map.values_mut() {
                strip_reserved(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_reserved(item);
            }
        }
        _ => {}
    }
}
