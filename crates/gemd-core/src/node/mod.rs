//! # Node Core
//!
//! A node groups a canonical object template, the spec planned from it and
//! the run derived from that spec, plus the `AttrsDict` describing which
//! attributes they may carry.
//!
//! ## Invariants
//!
//! - `run.spec` links to `spec`, and `spec.template` is the canonical
//!   template held by the node.
//! - Every attribute on the spec or run cites an attribute template declared
//!   by the node's object template.
//! - Ingredients carry no template and no attributes.
//!
//! Updates validate their whole input before writing to the spec, the run or
//! both.

pub mod kinds;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::attributes::{AttributeKit, AttrsDict};
use crate::formats::{Depth, Encoder};
use crate::model::{
    Attribute, FileLink, GemdObject, ObjectTemplate, Run, Source, Spec, Tag, TagTree,
    select_targets,
};
use crate::primitives::AUTO_SCOPE;
use crate::registry::TemplateRegistry;
use crate::types::{AttributeKind, LinkByUid, NodeKind, Provenance, Slot, TemplateKind, Which};
use crate::GemdError;

// =============================================================================
// NODE CLASS
// =============================================================================

/// A node shape: a class name, the node kind and an optional declared
/// template every instance starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeClass {
    class_name: String,
    kind: NodeKind,
    template: Option<ObjectTemplate>,
}

impl NodeClass {
    #[must_use]
    pub fn new(class_name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            class_name: class_name.into(),
            kind,
            template: None,
        }
    }

    /// Declare the template instances of this class are built from.
    #[must_use]
    pub fn with_template(mut self, template: ObjectTemplate) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn material() -> Self {
        Self::new("Material", NodeKind::Material)
    }

    #[must_use]
    pub fn process() -> Self {
        Self::new("Process", NodeKind::Process)
    }

    #[must_use]
    pub fn measurement() -> Self {
        Self::new("Measurement", NodeKind::Measurement)
    }

    #[must_use]
    pub fn ingredient() -> Self {
        Self::new("Ingredient", NodeKind::Ingredient)
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn template(&self) -> Option<&ObjectTemplate> {
        self.template.as_ref()
    }
}

// =============================================================================
// NODE INPUT
// =============================================================================

/// A link to another node's spec or run, with that node's kind.
#[derive(Debug, Clone, PartialEq)]
struct NodeRef {
    kind: NodeKind,
    link: Option<LinkByUid>,
}

/// Optional construction inputs.
#[derive(Debug, Clone, Default)]
pub struct NodeInput {
    template: Option<ObjectTemplate>,
    notes: Option<String>,
    conditions: Vec<Attribute>,
    parameters: Vec<Attribute>,
    properties: Vec<Attribute>,
    tags: Vec<Tag>,
    file_links: Vec<FileLink>,
    which: Which,
    source: Option<(Option<String>, Option<String>)>,
    material_run: Option<NodeRef>,
}

impl NodeInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply a template, overriding the one the class declares.
    #[must_use]
    pub fn template(mut self, template: ObjectTemplate) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn conditions(mut self, conditions: impl IntoIterator<Item = Attribute>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    #[must_use]
    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Attribute>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    #[must_use]
    pub fn properties(mut self, properties: impl IntoIterator<Item = Attribute>) -> Self {
        self.properties.extend(properties);
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    #[must_use]
    pub fn file_links(mut self, links: impl IntoIterator<Item = FileLink>) -> Self {
        self.file_links.extend(links);
        self
    }

    /// Where attributes, tags and file links are written (default: spec).
    #[must_use]
    pub fn which(mut self, which: Which) -> Self {
        self.which = which;
        self
    }

    /// Performer email and ISO 8601 date, validated at construction.
    #[must_use]
    pub fn source(mut self, email: Option<&str>, iso_date: Option<&str>) -> Self {
        self.source = Some((email.map(str::to_string), iso_date.map(str::to_string)));
        self
    }

    /// The material run a measurement is bound to.
    #[must_use]
    pub fn material_run(mut self, material: &Node) -> Self {
        self.material_run = Some(NodeRef {
            kind: material.kind,
            link: material.run.link(),
        });
        self
    }

    fn attributes(&mut self, kind: AttributeKind) -> Vec<Attribute> {
        std::mem::take(match kind {
            AttributeKind::Condition => &mut self.conditions,
            AttributeKind::Parameter => &mut self.parameters,
            AttributeKind::Property => &mut self.properties,
        })
    }
}

// =============================================================================
// VIEWS
// =============================================================================

/// Tags of the spec and run as tries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagsDict {
    pub spec: TagTree,
    pub run: TagTree,
}

/// File-link identities of the spec and run, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileLinksDict {
    pub spec: Vec<String>,
    pub run: Vec<String>,
}

// =============================================================================
// NODE
// =============================================================================

/// A Template / Spec / Run triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    class_name: String,
    kind: NodeKind,
    template: Option<Arc<ObjectTemplate>>,
    provenance: Option<Provenance>,
    attrs: AttrsDict,
    spec: Spec,
    run: Run,
}

impl Node {
    /// Construct a node of `class`, registering its template in `registry`.
    pub fn new(
        class: &NodeClass,
        registry: &mut TemplateRegistry,
        name: impl Into<String>,
        mut input: NodeInput,
    ) -> Result<Self, GemdError> {
        let name = name.into();
        let mut node = match class.kind.template_kind() {
            None => Self::bare(class, name, &input)?,
            Some(_) => Self::templated(class, registry, name, &input)?,
        };

        for kind in AttributeKind::ALL {
            let attributes = input.attributes(kind);
            if !attributes.is_empty() {
                node.update_attrs(kind, attributes, false, input.which)?;
            }
        }
        node.update_tags(&input.tags, false, input.which);
        node.update_file_links(&input.file_links, false, input.which);
        if let Some((email, iso_date)) = &input.source {
            node.set_source(email.as_deref(), iso_date.as_deref())?;
        }
        if let Some(material) = &input.material_run {
            node.bind_material_run(material)?;
        }

        debug!(class = %node.class_name, name = %node.spec.name, "node constructed");
        Ok(node)
    }

    /// An ingredient: no template, no attributes.
    fn bare(class: &NodeClass, name: String, input: &NodeInput) -> Result<Self, GemdError> {
        if input.template.is_some() || class.template.is_some() {
            return Err(GemdError::WrongType(format!(
                "{} nodes carry no template",
                class.kind
            )));
        }
        Self::check_input_slots(class.kind, input)?;

        let mut spec = Spec::new(class.kind, name);
        spec.notes = input.notes.clone();
        let run = spec.make_instance();
        Ok(Self {
            class_name: class.class_name.clone(),
            kind: class.kind,
            template: None,
            provenance: None,
            attrs: AttrsDict::empty(),
            spec,
            run,
        })
    }

    fn templated(
        class: &NodeClass,
        registry: &mut TemplateRegistry,
        name: String,
        input: &NodeInput,
    ) -> Result<Self, GemdError> {
        let (mut template, provenance) = Self::resolve_template(class, input.template.clone())?;
        Self::check_input_slots(class.kind, input)?;

        let mut attrs = AttributeKit::validate_temp_keys(&template)?;
        for slot in Slot::ALL {
            for declared in template.slot(slot) {
                AttributeKit::define_attribute(
                    &mut attrs,
                    Arc::clone(declared),
                    declared.default.clone(),
                )?;
            }
        }
        AttributeKit::finalize_template(&mut attrs, &mut template);

        let registered = registry.register_new_template(template, provenance)?;
        let attrs = AttrsDict::from_template(&registered.template)?;

        let mut spec = Spec::new(class.kind, name);
        spec.notes = input.notes.clone();
        spec.template = Some(Arc::clone(&registered.template));
        for default in AttributeKit::default_attributes(&attrs) {
            spec.slot_mut(default.kind.slot()).push(default);
        }
        let run = spec.make_instance();

        Ok(Self {
            class_name: class.class_name.clone(),
            kind: class.kind,
            template: Some(registered.template),
            provenance: Some(registered.provenance),
            attrs,
            spec,
            run,
        })
    }

    /// Pick the supplied template over the declared one.
    fn resolve_template(
        class: &NodeClass,
        supplied: Option<ObjectTemplate>,
    ) -> Result<(ObjectTemplate, Provenance), GemdError> {
        let (template, provenance) = match (supplied, &class.template) {
            (Some(supplied), declared) => {
                if declared.is_some() {
                    info!(
                        class = %class.class_name,
                        template = %supplied.name,
                        "supplied template overrides the class template"
                    );
                }
                (supplied, Provenance::FromMemory)
            }
            (None, Some(declared)) => (declared.clone(), Provenance::FromSubclass),
            (None, None) => {
                return Err(GemdError::MissingTemplate {
                    class: class.class_name.clone(),
                });
            }
        };

        if let Some(expected) = class.kind.template_kind() {
            check_template_kind(expected, &template)?;
        }
        Ok((template, provenance))
    }

    fn check_input_slots(kind: NodeKind, input: &NodeInput) -> Result<(), GemdError> {
        let supplied = [
            (AttributeKind::Condition, &input.conditions),
            (AttributeKind::Parameter, &input.parameters),
            (AttributeKind::Property, &input.properties),
        ];
        for (attribute_kind, attributes) in supplied {
            if !attributes.is_empty() {
                AttributeKit::slot_of(attribute_kind, kind)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // RECONSTITUTION
    // =========================================================================

    /// Rebuild a node from a prior spec and/or run.
    ///
    /// - With both, the run must have been derived from the spec.
    /// - With only a spec, a fresh run is derived from it.
    /// - With only a run, the spec is recreated under the id the run links to.
    ///
    /// Identifiers are preserved. The spec is rebound to the canonical
    /// template (the class template, else the spec's own) and every attribute
    /// is revalidated against it.
    pub fn from_spec_or_run(
        class: &NodeClass,
        registry: &mut TemplateRegistry,
        name: impl Into<String>,
        notes: Option<String>,
        spec: Option<Spec>,
        run: Option<Run>,
    ) -> Result<Self, GemdError> {
        let name = name.into();
        let (mut spec, mut run) = match (spec, run) {
            (None, None) => {
                return Err(GemdError::WrongType(
                    "a spec or a run is required to rebuild a node".to_string(),
                ));
            }
            (Some(spec), Some(run)) => {
                if !run.belongs_to(&spec) {
                    return Err(GemdError::SpecRunMismatch(format!(
                        "run '{}' was not derived from spec '{}'",
                        run.name, spec.name
                    )));
                }
                (spec, run)
            }
            (Some(spec), None) => {
                let run = spec.make_instance();
                (spec, run)
            }
            (None, Some(run)) => (Self::spec_for_run(&run), run),
        };

        for kind in [spec.kind, run.kind] {
            if kind != class.kind {
                return Err(GemdError::WrongType(format!(
                    "expected a {} spec and run, found {}",
                    class.kind, kind
                )));
            }
        }

        spec.name = name.clone();
        run.name = name;
        if notes.is_some() {
            spec.notes = notes.clone();
            run.notes = notes;
        }

        let (template, provenance, attrs) = match class.kind.template_kind() {
            None => (None, None, AttrsDict::empty()),
            Some(expected) => {
                let registered = match (&class.template, spec.template.take()) {
                    (Some(declared), _) => {
                        check_template_kind(expected, declared)?;
                        registry.register_new_template(declared.clone(), Provenance::FromSubclass)?
                    }
                    (None, Some(own)) => {
                        check_template_kind(expected, &own)?;
                        registry.adopt_template((*own).clone())?
                    }
                    (None, None) => {
                        return Err(GemdError::MissingTemplate {
                            class: class.class_name.clone(),
                        });
                    }
                };
                let attrs = AttrsDict::from_template(&registered.template)?;
                (Some(registered.template), Some(registered.provenance), attrs)
            }
        };

        spec.template = template.clone();
        run.spec = spec.link();
        rebind_attributes(&attrs, class.kind, &mut spec)?;
        rebind_attributes(&attrs, class.kind, &mut run)?;

        Ok(Self {
            class_name: class.class_name.clone(),
            kind: class.kind,
            template,
            provenance,
            attrs,
            spec,
            run,
        })
    }

    fn spec_for_run(run: &Run) -> Spec {
        let mut spec = Spec::new(run.kind, run.name.clone());
        if let Some(link) = run.spec.as_ref().filter(|link| link.scope == AUTO_SCOPE) {
            spec.uids.insert(AUTO_SCOPE.to_string(), link.id.clone());
        }
        spec.notes = run.notes.clone();
        spec
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The canonical template (none for ingredients).
    #[must_use]
    pub fn template(&self) -> Option<&Arc<ObjectTemplate>> {
        self.template.as_ref()
    }

    /// How the canonical template was obtained.
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        self.provenance
    }

    #[must_use]
    pub fn attrs(&self) -> &AttrsDict {
        &self.attrs
    }

    #[must_use]
    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    #[must_use]
    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Hand back the spec and run.
    #[must_use]
    pub fn into_parts(self) -> (Spec, Run) {
        (self.spec, self.run)
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    /// Validate and write attributes of one kind.
    pub fn update_attrs(
        &mut self,
        kind: AttributeKind,
        attributes: Vec<Attribute>,
        replace_all: bool,
        which: Which,
    ) -> Result<(), GemdError> {
        AttributeKit::update_attrs(
            &self.attrs,
            &mut self.spec,
            &mut self.run,
            self.kind,
            kind,
            attributes,
            replace_all,
            which,
        )
    }

    /// Remove attributes of one kind by name.
    pub fn remove_attrs(
        &mut self,
        kind: AttributeKind,
        names: &[&str],
        which: Which,
    ) -> Result<(), GemdError> {
        AttributeKit::remove_attrs(&mut self.spec, &mut self.run, self.kind, kind, names, which)
    }

    // =========================================================================
    // TAGS
    // =========================================================================

    /// Add tags. Exact duplicates are skipped; prefixes coexist.
    pub fn update_tags(&mut self, tags: &[Tag], replace_all: bool, which: Which) {
        for target in select_targets(&mut self.spec, &mut self.run, which) {
            let current = target.tags_mut();
            if replace_all {
                current.clear();
            }
            for tag in tags {
                if !current.contains(tag) {
                    current.push(tag.clone());
                }
            }
        }
    }

    pub fn remove_tags(&mut self, tags: &[Tag], which: Which) {
        for target in select_targets(&mut self.spec, &mut self.run, which) {
            target.tags_mut().retain(|tag| !tags.contains(tag));
        }
    }

    #[must_use]
    pub fn get_tags_dict(&self) -> TagsDict {
        TagsDict {
            spec: TagTree::from_tags(&self.spec.tags),
            run: TagTree::from_tags(&self.run.tags),
        }
    }

    // =========================================================================
    // FILE LINKS
    // =========================================================================

    /// Add file links, deduplicated by identity, in order.
    pub fn update_file_links(&mut self, links: &[FileLink], replace_all: bool, which: Which) {
        for target in select_targets(&mut self.spec, &mut self.run, which) {
            let current = target.file_links_mut();
            if replace_all {
                current.clear();
            }
            for link in links {
                let identity = link.identity();
                if !current.iter().any(|existing| existing.identity() == identity) {
                    current.push(link.clone());
                }
            }
        }
    }

    pub fn remove_file_links(&mut self, links: &[FileLink], which: Which) {
        let identities: Vec<String> = links.iter().map(FileLink::identity).collect();
        for target in select_targets(&mut self.spec, &mut self.run, which) {
            target
                .file_links_mut()
                .retain(|link| !identities.contains(&link.identity()));
        }
    }

    #[must_use]
    pub fn get_file_links_dict(&self) -> FileLinksDict {
        FileLinksDict {
            spec: self.spec.file_links.iter().map(FileLink::identity).collect(),
            run: self.run.file_links.iter().map(FileLink::identity).collect(),
        }
    }

    // =========================================================================
    // SOURCE
    // =========================================================================

    /// Set who performed a process or measurement and when.
    ///
    /// Both absent clears the source.
    pub fn set_source(&mut self, email: Option<&str>, iso_date: Option<&str>) -> Result<(), GemdError> {
        if !self.kind.has_source() {
            return Err(GemdError::WrongType(format!(
                "{} nodes carry no source",
                self.kind
            )));
        }
        self.spec.source = Source::parse(email, iso_date)?;
        Ok(())
    }

    #[must_use]
    pub fn get_source(&self) -> Option<&Source> {
        self.spec.source.as_ref()
    }

    // =========================================================================
    // DUMPS
    // =========================================================================

    /// Write the spec and run with embedded templates replaced by links.
    pub fn thin_dumps(&self, encoder: &dyn Encoder, dest: &Path) -> Result<Vec<PathBuf>, GemdError> {
        self.write_dumps(encoder, dest, Depth::Thin)
    }

    /// Write the spec and run with templates embedded.
    pub fn dumps(&self, encoder: &dyn Encoder, dest: &Path) -> Result<Vec<PathBuf>, GemdError> {
        self.write_dumps(encoder, dest, Depth::Deep)
    }

    fn write_dumps(
        &self,
        encoder: &dyn Encoder,
        dest: &Path,
        depth: Depth,
    ) -> Result<Vec<PathBuf>, GemdError> {
        fs::create_dir_all(dest).map_err(|e| GemdError::store_io(dest, e))?;
        let outputs = [
            (
                dump_file_name(&self.class_name, &self.spec)?,
                encoder.encode_spec(&self.spec, depth)?,
            ),
            (
                dump_file_name(&self.class_name, &self.run)?,
                encoder.encode_run(&self.run, depth)?,
            ),
        ];
        let mut written = Vec::with_capacity(outputs.len());
        for (file_name, bytes) in outputs {
            let path = dest.join(file_name);
            fs::write(&path, bytes).map_err(|e| GemdError::store_io(&path, e))?;
            debug!(path = ?path, depth = ?depth, "node dumped");
            written.push(path);
        }
        Ok(written)
    }

    // =========================================================================
    // INTEGRITY
    // =========================================================================

    /// Verify that the run belongs to the spec, that the spec cites the
    /// canonical template, and that every attribute cites a declared template.
    pub fn check_integrity(&self) -> Result<(), GemdError> {
        if !self.run.belongs_to(&self.spec) {
            return Err(GemdError::SpecRunMismatch(format!(
                "run of '{}' does not link to its spec",
                self.spec.name
            )));
        }
        let cites_canonical = match (&self.spec.template, &self.template) {
            (Some(cited), Some(canonical)) => Arc::ptr_eq(cited, canonical),
            (None, None) => true,
            _ => false,
        };
        if !cites_canonical {
            return Err(GemdError::WrongType(format!(
                "spec '{}' does not cite the canonical template",
                self.spec.name
            )));
        }
        AttributeKit::check_object(&self.attrs, &self.spec)?;
        AttributeKit::check_object(&self.attrs, &self.run)
    }
}

fn check_template_kind(expected: TemplateKind, template: &ObjectTemplate) -> Result<(), GemdError> {
    if template.kind == expected {
        Ok(())
    } else {
        Err(GemdError::WrongTemplateKind {
            expected,
            found: template.kind,
        })
    }
}

/// Revalidate every attribute of an object and cite the declared template.
fn rebind_attributes(
    attrs: &AttrsDict,
    node: NodeKind,
    object: &mut dyn GemdObject,
) -> Result<(), GemdError> {
    for slot in Slot::ALL {
        if object.slot(slot).is_empty() {
            continue;
        }
        AttributeKit::slot_of(slot.attribute_kind(), node)?;
        for attribute in object.slot_mut(slot).iter_mut() {
            attribute.template = Some(AttributeKit::validate_attribute(attrs, attribute)?);
        }
    }
    Ok(())
}

/// `{class}_{name}_{auto}`, with path separators in the name replaced.
///
/// Spec and run share the prefix and differ by their `auto` id.
fn dump_file_name(class_name: &str, object: &dyn GemdObject) -> Result<String, GemdError> {
    let auto = object.auto_id().ok_or_else(|| {
        GemdError::NotFound(format!("auto id of {} '{}'", class_name, object.name()))
    })?;
    Ok(format!(
        "{}_{}_{}",
        dump_stem(class_name),
        dump_stem(object.name()),
        auto
    ))
}

fn dump_stem(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::JsonEncoder;
    use crate::model::{AttributeTemplate, AttributeValue, Bounds};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> TemplateRegistry {
        TemplateRegistry::open("node-tests", dir.path(), Box::new(JsonEncoder::pretty()))
            .expect("open")
    }

    fn tag(parts: &[&str]) -> Tag {
        Tag::new(parts.iter().copied()).expect("tag")
    }

    fn furnace() -> ObjectTemplate {
        ObjectTemplate::process("furnace")
            .with_conditions([AttributeTemplate::condition(
                "atmosphere",
                Bounds::categorical(["argon", "air"]),
            )])
            .with_parameters([AttributeTemplate::parameter("ramps", Bounds::integer(1, 5))
                .with_default(AttributeValue::nominal_integer(1))])
    }

    fn furnace_node(registry: &mut TemplateRegistry) -> Node {
        Node::new(
            &NodeClass::process(),
            registry,
            "anneal",
            NodeInput::new().template(furnace()),
        )
        .expect("node")
    }

    #[test]
    fn construction_links_triple() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let node = furnace_node(&mut registry);

        assert_eq!(node.provenance(), Some(Provenance::FromMemory));
        assert!(node.run().belongs_to(node.spec()));
        let canonical = node.template().expect("template");
        assert!(Arc::ptr_eq(
            node.spec().template.as_ref().expect("spec template"),
            canonical
        ));
        assert_eq!(node.spec().parameters.len(), 1);
        assert!(node.run().parameters.is_empty());
        node.check_integrity().expect("integrity");
    }

    #[test]
    fn default_outside_bounds_rejected_before_registration() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let template = ObjectTemplate::process("overdriven").with_parameters([
            AttributeTemplate::parameter("p", Bounds::integer(0, 10))
                .with_default(AttributeValue::nominal_integer(99)),
        ]);
        let result = Node::new(
            &NodeClass::process(),
            &mut registry,
            "p",
            NodeInput::new().template(template),
        );
        assert!(matches!(result, Err(GemdError::OutOfBounds { name, .. }) if name == "p"));
        assert!(registry.is_empty());
    }

    #[test]
    fn integrity_detects_out_of_bounds_value() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let mut node = furnace_node(&mut registry);
        node.spec.parameters[0].value = AttributeValue::nominal_integer(9);
        assert!(matches!(
            node.check_integrity(),
            Err(GemdError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn missing_and_wrong_templates() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        assert!(matches!(
            Node::new(&NodeClass::process(), &mut registry, "p", NodeInput::new()),
            Err(GemdError::MissingTemplate { class }) if class == "Process"
        ));
        assert!(matches!(
            Node::new(
                &NodeClass::process(),
                &mut registry,
                "p",
                NodeInput::new().template(ObjectTemplate::material("m")),
            ),
            Err(GemdError::WrongTemplateKind { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn class_template_is_from_subclass_then_from_store() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let class = NodeClass::new("Annealing", NodeKind::Process).with_template(furnace());
        let first = Node::new(&class, &mut registry, "a", NodeInput::new()).expect("first");
        let second = Node::new(&class, &mut registry, "b", NodeInput::new()).expect("second");

        assert_eq!(first.provenance(), Some(Provenance::FromSubclass));
        assert_eq!(second.provenance(), Some(Provenance::FromStore));
        assert!(Arc::ptr_eq(
            first.template().expect("t"),
            second.template().expect("t")
        ));
    }

    #[test]
    fn supplied_template_overrides_class() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let class = NodeClass::new("Annealing", NodeKind::Process).with_template(furnace());
        let node = Node::new(
            &class,
            &mut registry,
            "a",
            NodeInput::new().template(ObjectTemplate::process("other")),
        )
        .expect("node");
        assert_eq!(node.template().expect("t").name, "other");
        assert_eq!(node.provenance(), Some(Provenance::FromMemory));
    }

    #[test]
    fn tags_dedupe_and_prefixes_coexist() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let mut node = furnace_node(&mut registry);
        node.update_tags(&[tag(&["a", "b"]), tag(&["a"])], false, Which::Spec);
        node.update_tags(&[tag(&["a", "b"])], false, Which::Spec);
        assert_eq!(node.spec().tags.len(), 2);

        node.update_tags(&[tag(&["z"])], true, Which::Both);
        assert_eq!(node.spec().tags, vec![tag(&["z"])]);
        assert_eq!(node.run().tags, vec![tag(&["z"])]);

        node.remove_tags(&[tag(&["z"])], Which::Run);
        assert!(node.run().tags.is_empty());
        assert_eq!(node.get_tags_dict().spec.len(), 1);
    }

    #[test]
    fn file_links_keep_order_and_identity() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let mut node = furnace_node(&mut registry);
        let links = [
            FileLink::new("b.csv", "u"),
            FileLink::new("a/", "u"),
            FileLink::new("b.csv", "u"),
        ];
        node.update_file_links(&links, false, Which::Spec);
        assert_eq!(node.get_file_links_dict().spec, vec!["b.csv,u", "a//u"]);

        node.remove_file_links(&[FileLink::new("b.csv", "u")], Which::Spec);
        assert_eq!(node.get_file_links_dict().spec, vec!["a//u"]);
        assert!(node.get_file_links_dict().run.is_empty());
    }

    #[test]
    fn dumps_name_files_by_class_name_and_auto() {
        let dir = TempDir::new().expect("tempdir");
        let out = TempDir::new().expect("out");
        let mut registry = store(&dir);
        let class = NodeClass::new("ArcMelting", NodeKind::Process);
        let node = Node::new(&class, &mut registry, "anneal", NodeInput::new().template(furnace()))
            .expect("node");

        let written = node.thin_dumps(registry.encoder(), out.path()).expect("dump");
        let spec_auto = node.spec().auto_id().expect("auto");
        let run_auto = node.run().auto_id().expect("auto");
        assert_eq!(
            written[0].file_name().and_then(|n| n.to_str()),
            Some(format!("ArcMelting_anneal_{}", spec_auto).as_str())
        );
        assert_eq!(
            written[1].file_name().and_then(|n| n.to_str()),
            Some(format!("ArcMelting_anneal_{}", run_auto).as_str())
        );
        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&written[0]).expect("read")).expect("json");
        assert_eq!(json["template"]["scope"], "auto");

        let deep = node.dumps(registry.encoder(), out.path()).expect("deep");
        assert_eq!(deep, written);
    }

    #[test]
    fn from_spec_or_run_preserves_ids() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let node = furnace_node(&mut registry);
        let spec_auto = node.spec().auto_id().map(str::to_string);
        let run_auto = node.run().auto_id().map(str::to_string);
        let (spec, run) = node.into_parts();

        let rebuilt = Node::from_spec_or_run(
            &NodeClass::process(),
            &mut registry,
            "renamed",
            None,
            Some(spec),
            Some(run.clone()),
        )
        .expect("rebuild");
        assert_eq!(rebuilt.spec().auto_id().map(str::to_string), spec_auto);
        assert_eq!(rebuilt.run().auto_id().map(str::to_string), run_auto);
        assert_eq!(rebuilt.name(), "renamed");
        assert_eq!(rebuilt.provenance(), Some(Provenance::FromStore));
        rebuilt.check_integrity().expect("integrity");

        let from_run = Node::from_spec_or_run(
            &NodeClass::process(),
            &mut registry,
            "r",
            None,
            None,
            Some(run),
        );
        assert!(matches!(from_run, Err(GemdError::MissingTemplate { .. })));
    }

    #[test]
    fn from_spec_or_run_rejects_foreign_run() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let a = furnace_node(&mut registry);
        let b = furnace_node(&mut registry);
        let result = Node::from_spec_or_run(
            &NodeClass::process(),
            &mut registry,
            "x",
            None,
            Some(a.spec().clone()),
            Some(b.run().clone()),
        );
        assert!(matches!(result, Err(GemdError::SpecRunMismatch(_))));

        let neither =
            Node::from_spec_or_run(&NodeClass::process(), &mut registry, "x", None, None, None);
        assert!(matches!(neither, Err(GemdError::WrongType(_))));
    }

    #[test]
    fn integrity_detects_foreign_attribute() {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = store(&dir);
        let mut node = furnace_node(&mut registry);
        node.spec.conditions.push(
            Attribute::condition("humidity", AttributeValue::nominal_categorical("dry"))
                .with_template(AttributeTemplate::condition("humidity", Bounds::categorical(["dry"]))),
        );
        assert!(matches!(
            node.check_integrity(),
            Err(GemdError::UnknownAttribute { .. })
        ));
    }
}
