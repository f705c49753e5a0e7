//! # Primitives
//!
//! Fixed constants of the authoring core: reserved identifier scopes, wire
//! separators, store layout names and input limits.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Identifier scope for the content-independent id issued on first sight.
pub const AUTO_SCOPE: &str = "auto";

/// Identifier scope for the stable cross-session template id.
pub const PERSISTENT_ID_SCOPE: &str = "persistent_id";

/// Scopes no caller may set.
pub const RESERVED_SCOPES: [&str; 2] = [AUTO_SCOPE, PERSISTENT_ID_SCOPE];

/// Separator between hierarchical tag components on the wire.
///
/// Must never appear inside a component.
pub const TAG_SEPARATOR: &str = "::";

/// File-link identity separator when the filename is a directory (ends in `/`).
pub const FILE_LINK_DIR_SEPARATOR: &str = "/";

/// File-link identity separator for plain filenames.
pub const FILE_LINK_SEPARATOR: &str = ",";

// =============================================================================
// STORE LAYOUT
// =============================================================================

/// Manifest file tracking every registered template.
pub const REGISTRY_FILE: &str = "registry.json";

/// Extension of template files inside the kind folders.
pub const TEMPLATE_FILE_EXTENSION: &str = "json";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a single template file read from the store (16 MB).
///
/// Larger files are rejected before deserialization.
pub const MAX_TEMPLATE_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum length of a single tag component.
pub const MAX_TAG_COMPONENT_LENGTH: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_scopes_are_auto_and_persistent_id() {
        assert_eq!(RESERVED_SCOPES, ["auto", "persistent_id"]);
    }

    #[test]
    fn tag_separator_is_double_colon() {
        assert_eq!(TAG_SEPARATOR, "::");
    }
}
