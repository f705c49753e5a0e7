//! # Template Registry
//!
//! The deduplicated store of object templates and attribute templates for one
//! named store.
//!
//! ## On-disk layout
//!
//! ```text
//! <root>/
//!   registry.json            manifest of every registered template
//!   material_templates/
//!   process_templates/
//!   measurement_templates/
//! ```
//!
//! ## Canonicalization
//!
//! - At most one object template per `(kind, name)`.
//! - Attribute templates are shared by content digest, so the same attribute
//!   template reused by several object templates resolves to one object.
//! - Registered templates are never mutated; replacement swaps the record.
//!
//! The registry is not safe for concurrent mutation. All I/O is blocking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::attributes::AttributeKit;
use crate::formats::Encoder;
use crate::ids::IdService;
use crate::model::{AttributeTemplate, ObjectTemplate, content_digest};
use crate::primitives::{
    MAX_TEMPLATE_FILE_SIZE, PERSISTENT_ID_SCOPE, REGISTRY_FILE, RESERVED_SCOPES,
    TEMPLATE_FILE_EXTENSION,
};
use crate::types::{Provenance, Slot, TemplateKind};
use crate::GemdError;

// =============================================================================
// RECORDS
// =============================================================================

/// A canonical template and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRecord {
    pub template: Arc<ObjectTemplate>,
    pub provenance: Provenance,
    /// Content digest (reserved ids excluded).
    pub digest: String,
    /// File path relative to the store root.
    pub path: String,
}

impl TemplateRecord {
    #[must_use]
    pub fn kind(&self) -> TemplateKind {
        self.template.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.name
    }
}

/// One line of `registry.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Store id.
    pub id: String,
    pub kind: TemplateKind,
    pub name: String,
    pub auto: Option<String>,
    pub persistent_id: Option<String>,
    pub path: String,
    pub digest: String,
}

/// Outcome of a registration: the canonical template callers must use from
/// now on, and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub template: Arc<ObjectTemplate>,
    pub provenance: Provenance,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// A stamped template, the attribute templates it introduces (by digest) and
/// whether any identifier was issued.
type Canonicalized = (ObjectTemplate, Vec<(String, Arc<AttributeTemplate>)>, bool);

/// Content-addressed template store.
#[derive(Debug)]
pub struct TemplateRegistry {
    id: String,
    root: PathBuf,
    registry_path: PathBuf,
    ids: IdService,
    encoder: Box<dyn Encoder>,
    object_templates: BTreeMap<TemplateKind, BTreeMap<String, TemplateRecord>>,
    attribute_templates: BTreeMap<String, Arc<AttributeTemplate>>,
}

impl TemplateRegistry {
    /// Create an empty registry. Touches nothing on disk.
    #[must_use]
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>, encoder: Box<dyn Encoder>) -> Self {
        let id = id.into();
        let root = root.into();
        let registry_path = root.join(REGISTRY_FILE);
        let ids = IdService::for_store(&id);
        let object_templates = TemplateKind::ALL
            .into_iter()
            .map(|kind| (kind, BTreeMap::new()))
            .collect();
        Self {
            id,
            root,
            registry_path,
            ids,
            encoder,
            object_templates,
            attribute_templates: BTreeMap::new(),
        }
    }

    /// Create, initialize and load a store.
    pub fn open(
        id: impl Into<String>,
        root: impl Into<PathBuf>,
        encoder: Box<dyn Encoder>,
    ) -> Result<Self, GemdError> {
        let mut registry = Self::new(id, root, encoder);
        registry.initialize_store()?;
        let loaded = registry.register_all_templates_from_store()?;
        info!(store = %registry.id, root = ?registry.root, loaded, "template store opened");
        Ok(registry)
    }

    // =========================================================================
    // STORE LIFECYCLE
    // =========================================================================

    /// Create the root, the three kind folders and the manifest if missing.
    ///
    /// Idempotent.
    pub fn initialize_store(&self) -> Result<(), GemdError> {
        for kind in TemplateKind::ALL {
            let folder = self.root.join(kind.folder());
            fs::create_dir_all(&folder).map_err(|e| GemdError::store_io(&folder, e))?;
        }
        if !self.registry_path.exists() {
            self.write_manifest()?;
            debug!(path = ?self.registry_path, "created registry manifest");
        }
        Ok(())
    }

    /// Load every template file found in the kind folders.
    ///
    /// Files are read in name order. Persisted identifiers are kept; missing
    /// ones are issued and written back. Returns the number of newly
    /// registered templates.
    pub fn register_all_templates_from_store(&mut self) -> Result<usize, GemdError> {
        let mut loaded = 0;
        for kind in TemplateKind::ALL {
            for path in self.template_files(kind)? {
                if self.load_template_file(kind, &path)? {
                    loaded += 1;
                }
            }
        }
        self.write_manifest()?;
        Ok(loaded)
    }

    fn template_files(&self, kind: TemplateKind) -> Result<Vec<PathBuf>, GemdError> {
        let folder = self.root.join(kind.folder());
        let entries = fs::read_dir(&folder).map_err(|e| GemdError::store_io(&folder, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| GemdError::store_io(&folder, e))?.path();
            let is_template = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(TEMPLATE_FILE_EXTENSION);
            if is_template {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn load_template_file(&mut self, kind: TemplateKind, path: &Path) -> Result<bool, GemdError> {
        let size = fs::metadata(path)
            .map_err(|e| GemdError::store_io(path, e))?
            .len();
        if size > MAX_TEMPLATE_FILE_SIZE {
            return Err(GemdError::store_io(
                path,
                format!(
                    "file size {} exceeds maximum {} bytes",
                    size, MAX_TEMPLATE_FILE_SIZE
                ),
            ));
        }
        let bytes = fs::read(path).map_err(|e| GemdError::store_io(path, e))?;
        let template = self.encoder.decode_template(&bytes)?;
        if template.kind != kind {
            return Err(GemdError::WrongType(format!(
                "{:?} holds a {} but lives in {}",
                path,
                template.kind,
                kind.folder()
            )));
        }

        let digest = content_digest(&template)?;
        if let Some(existing) = self.get(kind, &template.name) {
            if existing.digest != digest {
                warn!(
                    kind = %kind,
                    name = %template.name,
                    path = ?path,
                    "conflicting template file ignored; keeping the registered template"
                );
            }
            return Ok(false);
        }

        let (template, pending, stamped) = self.canonicalize(template)?;
        let relative = relative_path(kind, &template.name);
        if stamped {
            self.write_template(&relative, &template)?;
        }
        self.commit(template, pending, Provenance::FromFile, digest, relative);
        debug!(path = ?path, "loaded template");
        Ok(true)
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register a template, returning the canonical object callers must use.
    ///
    /// - An identical template already registered under `(kind, name)` is
    ///   returned with provenance `FromStore` (and a warning).
    /// - A different template under the same name is not replaced; the
    ///   existing one is returned. Use [`Self::replace_template`] to supersede.
    /// - Caller-supplied templates (`FromMemory`, `FromSubclass`) may not
    ///   carry reserved identifiers unless they are the canonical object.
    pub fn register_new_template(
        &mut self,
        template: ObjectTemplate,
        provenance: Provenance,
    ) -> Result<Registered, GemdError> {
        if let Some(canonical) = self.guard_reserved(&template, provenance)? {
            return Ok(canonical);
        }

        let digest = content_digest(&template)?;
        if let Some(existing) = self.get(template.kind, &template.name) {
            if existing.digest == digest {
                warn!(
                    kind = %template.kind,
                    name = %template.name,
                    "template already registered; using the canonical template"
                );
            } else {
                warn!(
                    kind = %template.kind,
                    name = %template.name,
                    "a different template is registered under this name; keeping it"
                );
            }
            return Ok(Registered {
                template: Arc::clone(&existing.template),
                provenance: Provenance::FromStore,
            });
        }

        self.insert(template, provenance, digest)
    }

    /// Register a template, superseding a different one under the same name.
    ///
    /// The replacement keeps the stable `persistent_id` and receives a fresh
    /// `auto` id. Identical templates are not replaced.
    pub fn replace_template(
        &mut self,
        template: ObjectTemplate,
        provenance: Provenance,
    ) -> Result<Registered, GemdError> {
        if let Some(canonical) = self.guard_reserved(&template, provenance)? {
            return Ok(canonical);
        }

        let digest = content_digest(&template)?;
        let superseded = match self.get(template.kind, &template.name) {
            Some(existing) if existing.digest == digest => {
                return Ok(Registered {
                    template: Arc::clone(&existing.template),
                    provenance: Provenance::FromStore,
                });
            }
            Some(_) => true,
            None => false,
        };

        let registered = self.insert(template, provenance, digest)?;
        if superseded {
            info!(
                kind = %registered.template.kind,
                name = %registered.template.name,
                "template replaced"
            );
        }
        Ok(registered)
    }

    /// Register a template that already carries identifiers, such as one
    /// read back from a dump or another store.
    ///
    /// Persisted ids are kept and missing ones issued. If the canonical
    /// template is already registered it is returned with `FromStore`.
    pub fn adopt_template(&mut self, template: ObjectTemplate) -> Result<Registered, GemdError> {
        if let Some(canonical) = self.canonical_match(&template)? {
            return Ok(Registered {
                template: canonical,
                provenance: Provenance::FromStore,
            });
        }
        let digest = content_digest(&template)?;
        if let Some(existing) = self.get(template.kind, &template.name) {
            warn!(
                kind = %template.kind,
                name = %template.name,
                "a template is already registered under this name; keeping it"
            );
            return Ok(Registered {
                template: Arc::clone(&existing.template),
                provenance: Provenance::FromStore,
            });
        }
        self.insert(template, Provenance::FromMemory, digest)
    }

    /// Decode a template document and adopt it.
    ///
    /// Returns `GemdError::WrongType` if the document is not an object
    /// template.
    pub fn register_template_json(&mut self, bytes: &[u8]) -> Result<Registered, GemdError> {
        let template = self.encoder.decode_template(bytes)?;
        self.adopt_template(template)
    }

    /// The registered template this one is, if it carries the canonical
    /// object's identifiers and content.
    pub fn canonical_match(
        &self,
        template: &ObjectTemplate,
    ) -> Result<Option<Arc<ObjectTemplate>>, GemdError> {
        let Some(record) = self.get(template.kind, &template.name) else {
            return Ok(None);
        };
        let same_ids = RESERVED_SCOPES
            .iter()
            .all(|scope| record.template.uids.get(*scope) == template.uids.get(*scope));
        if same_ids && record.digest == content_digest(template)? {
            Ok(Some(Arc::clone(&record.template)))
        } else {
            Ok(None)
        }
    }

    fn guard_reserved(
        &self,
        template: &ObjectTemplate,
        provenance: Provenance,
    ) -> Result<Option<Registered>, GemdError> {
        if !matches!(provenance, Provenance::FromMemory | Provenance::FromSubclass) {
            return Ok(None);
        }
        if IdService::check_reserved(&template.uids).is_ok() {
            return Ok(None);
        }
        match self.canonical_match(template)? {
            Some(template) => Ok(Some(Registered {
                template,
                provenance: Provenance::FromStore,
            })),
            None => IdService::check_reserved(&template.uids).map(|()| None),
        }
    }

    fn insert(
        &mut self,
        template: ObjectTemplate,
        provenance: Provenance,
        digest: String,
    ) -> Result<Registered, GemdError> {
        check_storable(&template)?;
        let (mut template, pending, _) = self.canonicalize(template)?;
        let previous = self.get(template.kind, &template.name).cloned();
        if let Some(pid) = previous.as_ref().and_then(|p| p.template.persistent_id()) {
            template
                .uids
                .insert(PERSISTENT_ID_SCOPE.to_string(), pid.to_string());
        }
        let relative = relative_path(template.kind, &template.name);
        self.write_template(&relative, &template)?;

        let (kind, name) = (template.kind, template.name.clone());
        let introduced: Vec<String> = pending.iter().map(|(d, _)| d.clone()).collect();
        let canonical = self.commit(template, pending, provenance, digest, relative);
        if let Err(e) = self.write_manifest() {
            self.rollback(kind, &name, previous, &introduced);
            return Err(e);
        }
        debug!(
            kind = %canonical.kind,
            name = %canonical.name,
            provenance = %provenance,
            "template registered"
        );
        Ok(Registered {
            template: canonical,
            provenance,
        })
    }

    /// Stamp identifiers and resolve attribute templates to their canonical
    /// objects.
    fn canonicalize(
        &self,
        mut template: ObjectTemplate,
    ) -> Result<Canonicalized, GemdError> {
        let mut pending: Vec<(String, Arc<AttributeTemplate>)> = Vec::new();
        let mut stamped = false;
        for slot in Slot::ALL {
            for attribute in template.slot_mut(slot).iter_mut() {
                let digest = content_digest(attribute.as_ref())?;
                let known = self
                    .attribute_templates
                    .get(&digest)
                    .or_else(|| pending.iter().find(|(d, _)| *d == digest).map(|(_, t)| t));
                match known {
                    Some(canonical) => *attribute = Arc::clone(canonical),
                    None => {
                        if attribute.auto_id().is_none() {
                            IdService::stamp_attribute(attribute);
                            stamped = true;
                        }
                        pending.push((digest, Arc::clone(attribute)));
                    }
                }
            }
        }
        stamped |= self.ids.stamp_template(&mut template);
        Ok((template, pending, stamped))
    }

    fn commit(
        &mut self,
        template: ObjectTemplate,
        pending: Vec<(String, Arc<AttributeTemplate>)>,
        provenance: Provenance,
        digest: String,
        path: String,
    ) -> Arc<ObjectTemplate> {
        self.attribute_templates.extend(pending);
        let template = Arc::new(template);
        let record = TemplateRecord {
            template: Arc::clone(&template),
            provenance,
            digest,
            path,
        };
        self.object_templates
            .entry(template.kind)
            .or_default()
            .insert(template.name.clone(), record);
        template
    }

    /// Undo a commit whose manifest write failed, restoring the superseded
    /// record and its file if there was one.
    fn rollback(
        &mut self,
        kind: TemplateKind,
        name: &str,
        previous: Option<TemplateRecord>,
        introduced: &[String],
    ) {
        for digest in introduced {
            self.attribute_templates.remove(digest);
        }
        match previous {
            Some(record) => {
                if let Err(e) = self.write_template(&record.path, &record.template) {
                    warn!(
                        kind = %kind,
                        name = %name,
                        error = %e,
                        "could not restore superseded template file"
                    );
                }
                self.object_templates
                    .entry(kind)
                    .or_default()
                    .insert(name.to_string(), record);
            }
            None => {
                if let Some(records) = self.object_templates.get_mut(&kind) {
                    records.remove(name);
                }
                let path = self.root.join(relative_path(kind, name));
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = ?path, error = %e, "could not remove unregistered template file");
                }
            }
        }
        warn!(kind = %kind, name = %name, "registration rolled back");
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// The injected encoder.
    #[must_use]
    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    /// The record registered under `(kind, name)`.
    #[must_use]
    pub fn get(&self, kind: TemplateKind, name: &str) -> Option<&TemplateRecord> {
        self.object_templates.get(&kind)?.get(name)
    }

    /// All records, by kind then name.
    pub fn records(&self) -> impl Iterator<Item = &TemplateRecord> {
        self.object_templates.values().flat_map(BTreeMap::values)
    }

    /// Records of one kind, by name.
    pub fn records_of(&self, kind: TemplateKind) -> impl Iterator<Item = &TemplateRecord> {
        self.object_templates.get(&kind).into_iter().flat_map(BTreeMap::values)
    }

    /// The canonical attribute template with this content digest.
    #[must_use]
    pub fn attribute_template(&self, digest: &str) -> Option<&Arc<AttributeTemplate>> {
        self.attribute_templates.get(digest)
    }

    /// Number of registered object templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.object_templates.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The manifest as it is written to `registry.json`.
    #[must_use]
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        self.records()
            .map(|record| ManifestEntry {
                id: self.id.clone(),
                kind: record.kind(),
                name: record.name().to_string(),
                auto: record.template.auto_id().map(str::to_string),
                persistent_id: record.template.persistent_id().map(str::to_string),
                path: record.path.clone(),
                digest: record.digest.clone(),
            })
            .collect()
    }

    // =========================================================================
    // FILE I/O
    // =========================================================================

    fn write_template(&self, relative: &str, template: &ObjectTemplate) -> Result<(), GemdError> {
        let path = self.root.join(relative);
        let bytes = self.encoder.encode_template(template)?;
        fs::write(&path, bytes).map_err(|e| GemdError::store_io(&path, e))?;
        debug!(path = ?path, "template written");
        Ok(())
    }

    /// Rewrite the manifest: write a sibling file, then rename over it.
    fn write_manifest(&self) -> Result<(), GemdError> {
        let bytes = serde_json::to_vec_pretty(&self.manifest())
            .map_err(|e| GemdError::SerializationError(e.to_string()))?;
        let tmp = self.registry_path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| GemdError::store_io(&tmp, e))?;
        fs::rename(&tmp, &self.registry_path)
            .map_err(|e| GemdError::store_io(&self.registry_path, e))?;
        Ok(())
    }
}

/// File name of a template: its name with `%` and path separators
/// percent-encoded, so distinct names never share a file.
#[must_use]
pub fn template_file_name(name: &str) -> String {
    format!("{}.{}", file_stem(name), TEMPLATE_FILE_EXTENSION)
}

fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => stem.push_str("%25"),
            '/' => stem.push_str("%2F"),
            '\\' => stem.push_str("%5C"),
            _ => stem.push(c),
        }
    }
    stem
}

/// Reject templates the store cannot persist and reload: an empty name, or
/// attribute templates with malformed bounds or out-of-bounds defaults.
fn check_storable(template: &ObjectTemplate) -> Result<(), GemdError> {
    if template.name.is_empty() {
        return Err(GemdError::WrongType(format!(
            "a {} needs a non-empty name",
            template.kind
        )));
    }
    for slot in Slot::ALL {
        for attribute in template.slot(slot) {
            AttributeKit::check_declaration(attribute, slot, None)?;
        }
    }
    Ok(())
}

fn relative_path(kind: TemplateKind, name: &str) -> String {
    format!("{}/{}", kind.folder(), template_file_name(name))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::JsonEncoder;
    use crate::model::{AttributeValue, Bounds};
    use crate::primitives::AUTO_SCOPE;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn registry(dir: &TempDir) -> TemplateRegistry {
        TemplateRegistry::open("test", dir.path(), Box::new(JsonEncoder::pretty())).expect("open")
    }

    fn anneal() -> ObjectTemplate {
        ObjectTemplate::process("anneal")
            .with_conditions([AttributeTemplate::condition(
                "atmosphere",
                Bounds::categorical(["argon", "air"]),
            )])
            .with_parameters([AttributeTemplate::parameter(
                "duration",
                Bounds::real(0.0, 48.0, "h"),
            )])
    }

    fn files_in(dir: &Path) -> usize {
        fs::read_dir(dir).expect("read dir").count()
    }

    #[test]
    fn initialize_creates_layout() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);
        for kind in TemplateKind::ALL {
            assert!(dir.path().join(kind.folder()).is_dir());
        }
        assert!(registry.registry_path().is_file());
        assert!(registry.is_empty());
        registry.initialize_store().expect("idempotent");
    }

    #[test]
    fn registration_stamps_and_persists() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let registered = registry
            .register_new_template(anneal(), Provenance::FromMemory)
            .expect("register");

        assert_eq!(registered.provenance, Provenance::FromMemory);
        assert!(registered.template.auto_id().is_some());
        assert!(registered.template.persistent_id().is_some());
        assert!(registered.template.attribute_templates().all(|t| t.auto_id().is_some()));
        assert_eq!(files_in(&dir.path().join("process_templates")), 1);
        assert_eq!(registry.len(), 1);

        let manifest: Vec<ManifestEntry> =
            serde_json::from_slice(&fs::read(registry.registry_path()).expect("read"))
                .expect("manifest");
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].path, "process_templates/anneal.json");
        assert_eq!(manifest[0].auto.as_deref(), registered.template.auto_id());
    }

    #[test]
    fn identical_template_returns_canonical() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let first = registry
            .register_new_template(anneal(), Provenance::FromSubclass)
            .expect("first");
        let second = registry
            .register_new_template(anneal(), Provenance::FromSubclass)
            .expect("second");
        assert!(Arc::ptr_eq(&first.template, &second.template));
        assert_eq!(second.provenance, Provenance::FromStore);
    }

    #[test]
    fn different_template_keeps_existing_unless_replaced() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let first = registry
            .register_new_template(anneal(), Provenance::FromMemory)
            .expect("first");
        let changed = anneal().with_description("longer");

        let kept = registry
            .register_new_template(changed.clone(), Provenance::FromMemory)
            .expect("kept");
        assert!(Arc::ptr_eq(&first.template, &kept.template));

        let replaced = registry
            .replace_template(changed, Provenance::FromMemory)
            .expect("replace");
        assert_eq!(replaced.provenance, Provenance::FromMemory);
        assert_eq!(replaced.template.description.as_deref(), Some("longer"));
        assert_eq!(replaced.template.persistent_id(), first.template.persistent_id());
        assert_ne!(replaced.template.auto_id(), first.template.auto_id());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reserved_ids_rejected_unless_canonical() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let stamped = anneal().with_uid(AUTO_SCOPE, "x");
        assert!(matches!(
            registry.register_new_template(stamped, Provenance::FromMemory),
            Err(GemdError::ReservedIdentifier(_))
        ));
        assert!(registry.is_empty());

        let first = registry
            .register_new_template(anneal(), Provenance::FromMemory)
            .expect("register");
        let again = registry
            .register_new_template((*first.template).clone(), Provenance::FromMemory)
            .expect("canonical copy");
        assert!(Arc::ptr_eq(&first.template, &again.template));
        assert_eq!(again.provenance, Provenance::FromStore);
    }

    #[test]
    fn attribute_templates_are_shared() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let a = registry
            .register_new_template(anneal(), Provenance::FromMemory)
            .expect("a");
        let b = registry
            .register_new_template(
                ObjectTemplate::measurement("furnace log").with_conditions([
                    AttributeTemplate::condition("atmosphere", Bounds::categorical(["argon", "air"])),
                ]),
                Provenance::FromMemory,
            )
            .expect("b");
        assert!(Arc::ptr_eq(&a.template.conditions[0], &b.template.conditions[0]));

        let digest = content_digest(a.template.conditions[0].as_ref()).expect("digest");
        let canonical = registry.attribute_template(&digest).expect("indexed");
        assert!(Arc::ptr_eq(canonical, &a.template.conditions[0]));
    }

    #[test]
    fn reopen_keeps_persisted_ids() {
        let dir = TempDir::new().expect("tempdir");
        let original = {
            let mut registry = registry(&dir);
            registry
                .register_new_template(anneal(), Provenance::FromMemory)
                .expect("register")
                .template
        };

        let reopened = registry(&dir);
        let record = reopened
            .get(TemplateKind::Process, "anneal")
            .expect("loaded");
        assert_eq!(record.provenance, Provenance::FromFile);
        assert_eq!(record.template.auto_id(), original.auto_id());
        assert_eq!(record.template.persistent_id(), original.persistent_id());
        assert_eq!(
            record.template.conditions[0].auto_id(),
            original.conditions[0].auto_id()
        );
    }

    #[test]
    fn misfiled_template_is_wrong_type() {
        let dir = TempDir::new().expect("tempdir");
        registry(&dir);
        let bytes = JsonEncoder::pretty()
            .encode_template(&ObjectTemplate::material("steel"))
            .expect("encode");
        fs::write(dir.path().join("process_templates/steel.json"), bytes).expect("write");

        let result =
            TemplateRegistry::open("test", dir.path(), Box::new(JsonEncoder::pretty()));
        assert!(matches!(result, Err(GemdError::WrongType(_))));
    }

    #[test]
    fn register_json_rejects_non_templates() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        assert!(matches!(
            registry.register_template_json(br#"{"type": "process_spec"}"#),
            Err(GemdError::WrongType(_))
        ));
    }

    #[test]
    fn adopt_keeps_foreign_ids() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let foreign = anneal()
            .with_uid(AUTO_SCOPE, "a-1")
            .with_uid(PERSISTENT_ID_SCOPE, "p-1");
        let adopted = registry.adopt_template(foreign.clone()).expect("adopt");
        assert_eq!(adopted.provenance, Provenance::FromMemory);
        assert_eq!(adopted.template.auto_id(), Some("a-1"));
        assert_eq!(adopted.template.persistent_id(), Some("p-1"));

        let again = registry.adopt_template(foreign).expect("again");
        assert!(Arc::ptr_eq(&adopted.template, &again.template));
        assert_eq!(again.provenance, Provenance::FromStore);
    }

    #[test]
    fn file_names_are_escaped() {
        assert_eq!(template_file_name("a/b\\c"), "a%2Fb%5Cc.json");
        assert_eq!(template_file_name("50%"), "50%25.json");
        assert_eq!(template_file_name("arc melting"), "arc melting.json");
    }

    #[test]
    fn separator_names_keep_distinct_files() {
        let dir = TempDir::new().expect("tempdir");
        {
            let mut registry = registry(&dir);
            for name in ["a/b", "a_b", "a%2Fb"] {
                registry
                    .register_new_template(ObjectTemplate::process(name), Provenance::FromMemory)
                    .expect("register");
            }
            let paths: BTreeSet<String> = registry.records().map(|r| r.path.clone()).collect();
            assert_eq!(paths.len(), 3);
        }

        let reopened = registry(&dir);
        assert_eq!(reopened.len(), 3);
        for name in ["a/b", "a_b", "a%2Fb"] {
            assert!(reopened.get(TemplateKind::Process, name).is_some(), "{name}");
        }
    }

    #[test]
    fn empty_name_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        assert!(matches!(
            registry.register_new_template(ObjectTemplate::material(""), Provenance::FromMemory),
            Err(GemdError::WrongType(_))
        ));
        assert!(registry.is_empty());
        assert!(registry.manifest().is_empty());
    }

    #[test]
    fn malformed_attribute_templates_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let inverted = ObjectTemplate::process("inverted")
            .with_parameters([AttributeTemplate::parameter("p", Bounds::integer(10, 0))]);
        assert!(matches!(
            registry.register_new_template(inverted, Provenance::FromMemory),
            Err(GemdError::InvalidTemplateSlot { .. })
        ));

        let overdriven = ObjectTemplate::process("overdriven").with_parameters([
            AttributeTemplate::parameter("p", Bounds::integer(0, 10))
                .with_default(AttributeValue::nominal_integer(99)),
        ]);
        assert!(matches!(
            registry.register_new_template(overdriven, Provenance::FromMemory),
            Err(GemdError::OutOfBounds { .. })
        ));
        assert!(registry.is_empty());
        assert!(!dir.path().join("process_templates/overdriven.json").exists());
    }

    #[test]
    fn failed_manifest_write_leaves_nothing_registered() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = registry(&dir);
        let blocker = registry.registry_path().with_extension("json.tmp");
        fs::create_dir(&blocker).expect("block manifest");

        assert!(matches!(
            registry.register_new_template(anneal(), Provenance::FromMemory),
            Err(GemdError::StoreIo { .. })
        ));
        assert!(registry.get(TemplateKind::Process, "anneal").is_none());
        assert!(!dir.path().join("process_templates/anneal.json").exists());

        fs::remove_dir(&blocker).expect("unblock");
        let registered = registry
            .register_new_template(anneal(), Provenance::FromMemory)
            .expect("register");
        assert_eq!(registered.provenance, Provenance::FromMemory);
        assert_eq!(registry.manifest().len(), 1);
    }
}
