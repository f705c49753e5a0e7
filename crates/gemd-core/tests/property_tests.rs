//! # Property-Based Tests
//!
//! Invariants of node authoring under randomized inputs.

use gemd_core::{
    Attribute, GemdObject, AttributeKind, AttributeTemplate, AttributeValue, Bounds, FileLink, GemdError,
    JsonEncoder, Node, NodeClass, NodeInput, NodeKind, ObjectTemplate, Tag, TagTree,
    TemplateKind, TemplateRegistry, Which,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn fresh_store(dir: &TempDir) -> TemplateRegistry {
    TemplateRegistry::open("properties", dir.path(), Box::new(JsonEncoder::new()))
        .expect("open store")
}

fn class_for(kind: TemplateKind) -> NodeClass {
    match kind {
        TemplateKind::Material => NodeClass::material(),
        TemplateKind::Process => NodeClass::process(),
        TemplateKind::Measurement => NodeClass::measurement(),
    }
}

fn template_kind() -> impl Strategy<Value = TemplateKind> {
    prop_oneof![
        Just(TemplateKind::Material),
        Just(TemplateKind::Process),
        Just(TemplateKind::Measurement),
    ]
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 _-]{0,15}"
}

fn tag() -> impl Strategy<Value = Tag> {
    vec("[a-z]{1,6}", 1..4).prop_map(|parts| Tag::new(parts).expect("valid tag"))
}

/// A process template with `n` integer parameters `p0..pn`, the first
/// `defaults` of which declare a default.
fn parameter_template(n: usize, defaults: usize) -> ObjectTemplate {
    ObjectTemplate::process("parameters").with_parameters((0..n).map(|i| {
        let template = AttributeTemplate::parameter(format!("p{}", i), Bounds::integer(0, 100));
        if i < defaults {
            template.with_default(AttributeValue::nominal_integer(0))
        } else {
            template
        }
    }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every node built against the same (kind, name) holds one template.
    #[test]
    fn canonical_template_identity(kind in template_kind(), name in name(), count in 2usize..6) {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let class = class_for(kind);

        let nodes: Vec<Node> = (0..count)
            .map(|i| {
                Node::new(
                    &class,
                    &mut registry,
                    format!("node {}", i),
                    NodeInput::new().template(ObjectTemplate::new(kind, name.clone())),
                )
                .expect("node")
            })
            .collect();

        let first = nodes[0].template().expect("template");
        for node in &nodes {
            prop_assert!(Arc::ptr_eq(first, node.template().expect("template")));
        }
        prop_assert_eq!(registry.len(), 1);
    }

    /// Pre-stamped reserved identifiers are rejected for every kind.
    #[test]
    fn reserved_identifier_guard(
        kind in template_kind(),
        scope in prop_oneof![Just("auto"), Just("persistent_id")],
        value in "[a-z0-9-]{1,12}",
    ) {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let template = ObjectTemplate::new(kind, "stamped").with_uid(scope, value);

        let result = Node::new(
            &class_for(kind),
            &mut registry,
            "n",
            NodeInput::new().template(template),
        );
        prop_assert!(
            matches!(result, Err(GemdError::ReservedIdentifier(ref s)) if s == scope)
        );
    }

    /// Materials never accept conditions or parameters.
    #[test]
    fn material_slot_legality(use_conditions in any::<bool>(), value in 0i64..10) {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);

        let input = NodeInput::new().template(ObjectTemplate::material("m_t"));
        let input = if use_conditions {
            input.conditions([Attribute::condition("c", AttributeValue::nominal_integer(value))])
        } else {
            input.parameters([Attribute::parameter("p", AttributeValue::nominal_integer(value))])
        };
        let result = Node::material(&mut registry, "m", input);
        prop_assert!(matches!(result, Err(GemdError::WrongAttributeKind { .. })), "attributes");

        let mut template = ObjectTemplate::material("bad_t");
        let declared = AttributeTemplate::parameter("p", Bounds::integer(0, 10));
        if use_conditions {
            template.conditions.push(Arc::new(AttributeTemplate::condition("c", Bounds::integer(0, 10))));
        } else {
            template.parameters.push(Arc::new(declared));
        }
        let result = Node::material(&mut registry, "m", NodeInput::new().template(template));
        prop_assert!(matches!(result, Err(GemdError::InvalidTemplateSlot { .. })), "template");
    }

    /// Updating then removing the same attributes empties both slots.
    #[test]
    fn attribute_round_trip(values in vec(0i64..=100, 1..6)) {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let mut node = Node::process(
            &mut registry,
            "p",
            NodeInput::new().template(parameter_template(values.len(), 0)),
        )
        .expect("node");

        let attributes: Vec<Attribute> = values
            .iter()
            .enumerate()
            .map(|(i, v)| Attribute::parameter(format!("p{}", i), AttributeValue::nominal_integer(*v)))
            .collect();
        let names: Vec<String> = attributes.iter().map(|a| a.name.clone()).collect();

        node.update_attrs(AttributeKind::Parameter, attributes, false, Which::Both)
            .expect("update");
        prop_assert_eq!(node.spec().parameters.len(), values.len());
        prop_assert_eq!(node.run().parameters.len(), values.len());

        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        node.remove_attrs(AttributeKind::Parameter, &names, Which::Both)
            .expect("remove");
        prop_assert!(node.spec().parameters.is_empty());
        prop_assert!(node.run().parameters.is_empty());
    }

    /// Tags round-trip through the trie and removal restores empty.
    #[test]
    fn tag_round_trip(tags in vec(tag(), 1..8)) {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let mut node = Node::process(
            &mut registry,
            "p",
            NodeInput::new().template(ObjectTemplate::process("t")),
        )
        .expect("node");

        node.update_tags(&tags, false, Which::Spec);
        let distinct: BTreeSet<&Tag> = tags.iter().collect();
        prop_assert_eq!(node.spec().tags.len(), distinct.len());

        let dict = node.get_tags_dict();
        prop_assert_eq!(dict.spec, TagTree::from_tags(&tags));
        prop_assert!(dict.run.is_empty());

        for tag in &node.spec().tags {
            prop_assert_eq!(&Tag::parse(&tag.joined()).expect("parse"), tag);
        }

        node.remove_tags(&tags, Which::Spec);
        prop_assert!(node.get_tags_dict().spec.is_empty());
    }

    /// File links are identified by filename and url only.
    #[test]
    fn file_link_identity(filename in "[a-z]{1,8}", url in "[a-z]{1,8}") {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let mut node = Node::process(
            &mut registry,
            "p",
            NodeInput::new().template(ObjectTemplate::process("t")),
        )
        .expect("node");

        let link = FileLink::new(filename.clone(), url.clone());
        node.update_file_links(&[link.clone(), link.clone()], false, Which::Both);
        node.update_file_links(&[link], false, Which::Both);
        prop_assert_eq!(node.spec().file_links.len(), 1);
        prop_assert_eq!(node.run().file_links.len(), 1);

        let directory = FileLink::new(format!("{}/", filename), url.clone());
        let comma = FileLink::new(filename, format!("/{}", url));
        prop_assert_ne!(directory.identity(), comma.identity());
        node.update_file_links(&[directory, comma], false, Which::Spec);
        prop_assert_eq!(node.get_file_links_dict().spec.len(), 3);
    }

    /// Only declared defaults populate the spec; the run starts empty.
    #[test]
    fn defaults_populate_spec(n in 1usize..6, defaults in 0usize..6) {
        let defaults = defaults.min(n);
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let node = Node::process(
            &mut registry,
            "p",
            NodeInput::new().template(parameter_template(n, defaults)),
        )
        .expect("node");

        prop_assert_eq!(node.spec().parameters.len(), defaults);
        prop_assert!(node.run().parameters.is_empty());
        node.check_integrity().expect("integrity");
    }

    /// Rebuilding from spec and run keeps both auto ids.
    #[test]
    fn from_spec_or_run_fidelity(kind in template_kind(), name in name(), notes in proptest::option::of("[a-z ]{0,12}")) {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = fresh_store(&dir);
        let class = class_for(kind);
        let node = Node::new(
            &class,
            &mut registry,
            name.clone(),
            NodeInput::new().template(ObjectTemplate::new(kind, "t")),
        )
        .expect("node");
        let spec_auto = node.spec().auto_id().map(str::to_string);
        let run_auto = node.run().auto_id().map(str::to_string);
        let (spec, run) = node.into_parts();

        let rebuilt = Node::from_spec_or_run(&class, &mut registry, name, notes.clone(), Some(spec), Some(run))
            .expect("rebuild");
        prop_assert_eq!(rebuilt.spec().auto_id().map(str::to_string), spec_auto);
        prop_assert_eq!(rebuilt.run().auto_id().map(str::to_string), run_auto);
        if notes.is_some() {
            prop_assert_eq!(rebuilt.spec().notes.clone(), notes);
        }
        rebuilt.check_integrity().expect("integrity");
    }
}

// =============================================================================
// FIXED EXAMPLES
// =============================================================================

/// The nested tag dictionary for a fixed tag set.
#[test]
fn tags_dict_shape() {
    let dir = TempDir::new().expect("tempdir");
    let mut registry = fresh_store(&dir);
    let mut node = Node::process(
        &mut registry,
        "p",
        NodeInput::new().template(ObjectTemplate::process("t")),
    )
    .expect("node");

    let tags = [
        Tag::new(["a", "b", "c"]).expect("tag"),
        Tag::new(["a", "b", "d"]).expect("tag"),
        Tag::new(["x"]).expect("tag"),
    ];
    node.update_tags(&tags, false, Which::Spec);

    let json = serde_json::to_value(node.get_tags_dict()).expect("json");
    assert_eq!(
        json,
        serde_json::json!({"spec": {"a": {"b": {"c": {}, "d": {}}}, "x": {}}, "run": {}})
    );

    node.remove_tags(&tags, Which::Spec);
    assert!(node.get_tags_dict().spec.is_empty());
}

/// Rebuilding from a run alone.
#[test]
fn rebuild_from_run_only() {
    let dir = TempDir::new().expect("tempdir");
    let mut registry = fresh_store(&dir);
    let class = NodeClass::new("Sintering", NodeKind::Process)
        .with_template(parameter_template(2, 1));
    let node = Node::new(&class, &mut registry, "sinter", NodeInput::new()).expect("node");
    let spec_auto = node.spec().auto_id().map(str::to_string);
    let (_, run) = node.into_parts();

    let rebuilt = Node::from_spec_or_run(&class, &mut registry, "sinter", None, None, Some(run))
        .expect("rebuild");
    assert_eq!(rebuilt.spec().auto_id().map(str::to_string), spec_auto);
    rebuilt.check_integrity().expect("integrity");
}
