//! # CLI Command Implementations

use gemd_core::{
    GemdError, ObjectTemplate, TemplateKind, TemplateRegistry,
    primitives::MAX_TEMPLATE_FILE_SIZE,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), GemdError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GemdError::store_io(path, format!("cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(GemdError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `..` and symlinks and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, GemdError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| GemdError::store_io(path, format!("invalid file path: {}", e)))?;

    if !canonical.is_file() {
        return Err(GemdError::store_io(path, "not a regular file"));
    }

    Ok(canonical)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Report the initialized store layout.
///
/// Opening the store already created any missing folders and manifest.
pub fn cmd_init(registry: &TemplateRegistry, json_mode: bool) -> Result<(), GemdError> {
    let folders: Vec<String> = TemplateKind::ALL
        .iter()
        .map(|kind| registry.root().join(kind.folder()).display().to_string())
        .collect();

    if json_mode {
        print_json(&serde_json::json!({
            "store": registry.id(),
            "root": registry.root().display().to_string(),
            "manifest": registry.registry_path().display().to_string(),
            "folders": folders,
            "templates": registry.len(),
        }));
        return Ok(());
    }

    println!("Initialized template store '{}'", registry.id());
    println!("Root:     {}", registry.root().display());
    println!("Manifest: {}", registry.registry_path().display());
    for folder in &folders {
        println!("  {}", folder);
    }
    println!("Templates: {}", registry.len());

    Ok(())
}

// =============================================================================
// REGISTER COMMAND
// =============================================================================

/// Register a template read from a JSON file.
pub fn cmd_register(
    registry: &mut TemplateRegistry,
    json_mode: bool,
    file: &Path,
) -> Result<(), GemdError> {
    let validated = validate_file_path(file)?;
    validate_file_size(&validated, MAX_TEMPLATE_FILE_SIZE)?;

    let bytes = std::fs::read(&validated)
        .map_err(|e| GemdError::store_io(&validated, format!("read file: {}", e)))?;
    let registered = registry.register_template_json(&bytes)?;
    let template = &registered.template;

    if json_mode {
        print_json(&serde_json::json!({
            "kind": template.kind,
            "name": template.name,
            "provenance": registered.provenance,
            "auto": template.auto_id(),
            "persistent_id": template.persistent_id(),
        }));
        return Ok(());
    }

    println!(
        "Registered {} '{}' ({})",
        template.kind, template.name, registered.provenance
    );
    if let Some(auto) = template.auto_id() {
        println!("  auto:          {}", auto);
    }
    if let Some(persistent) = template.persistent_id() {
        println!("  persistent_id: {}", persistent);
    }

    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List the manifest, optionally restricted to one kind.
pub fn cmd_list(
    registry: &TemplateRegistry,
    json_mode: bool,
    kind: Option<&str>,
) -> Result<(), GemdError> {
    let kind = kind.map(str::parse::<TemplateKind>).transpose()?;
    let entries: Vec<_> = registry
        .manifest()
        .into_iter()
        .filter(|entry| kind.is_none_or(|k| entry.kind == k))
        .collect();

    if json_mode {
        print_json(&serde_json::json!({
            "store": registry.id(),
            "templates": entries,
        }));
        return Ok(());
    }

    println!("Templates in '{}'", registry.id());
    println!("==================");
    if entries.is_empty() {
        println!("(none)");
    }
    for entry in &entries {
        println!(
            "{:<22} {:<32} {}",
            entry.kind.as_str(),
            entry.name,
            entry.path
        );
    }

    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print the canonical template of `(kind, name)`.
pub fn cmd_show(
    registry: &TemplateRegistry,
    json_mode: bool,
    kind: &str,
    name: &str,
) -> Result<(), GemdError> {
    let kind: TemplateKind = kind.parse()?;
    let record = registry
        .get(kind, name)
        .ok_or_else(|| GemdError::NotFound(format!("{} '{}'", kind, name)))?;

    if json_mode {
        let template = template_json(&record.template)?;
        print_json(&serde_json::json!({
            "provenance": record.provenance,
            "digest": record.digest,
            "path": record.path,
            "template": template,
        }));
        return Ok(());
    }

    let bytes = registry.encoder().encode_template(&record.template)?;
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

fn template_json(template: &ObjectTemplate) -> Result<serde_json::Value, GemdError> {
    serde_json::to_value(template).map_err(|e| GemdError::SerializationError(e.to_string()))
}
