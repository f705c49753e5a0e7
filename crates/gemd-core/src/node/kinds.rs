//! The four node kinds.
//!
//! | Kind        | Template            | Slots                              |
//! |-------------|---------------------|------------------------------------|
//! | Material    | material template   | properties                         |
//! | Process     | process template    | conditions, parameters             |
//! | Measurement | measurement template| conditions, parameters, properties |
//! | Ingredient  | none                | none                               |
//!
//! Processes and measurements carry a performer source. A measurement is
//! bound to the material run it measured; an ingredient links a material to
//! the process consuming it.

use super::{Node, NodeClass, NodeInput, NodeRef};
use crate::registry::TemplateRegistry;
use crate::types::NodeKind;
use crate::GemdError;

impl Node {
    pub fn material(
        registry: &mut TemplateRegistry,
        name: impl Into<String>,
        input: NodeInput,
    ) -> Result<Self, GemdError> {
        Self::new(&NodeClass::material(), registry, name, input)
    }

    pub fn process(
        registry: &mut TemplateRegistry,
        name: impl Into<String>,
        input: NodeInput,
    ) -> Result<Self, GemdError> {
        Self::new(&NodeClass::process(), registry, name, input)
    }

    pub fn measurement(
        registry: &mut TemplateRegistry,
        name: impl Into<String>,
        input: NodeInput,
    ) -> Result<Self, GemdError> {
        Self::new(&NodeClass::measurement(), registry, name, input)
    }

    /// An ingredient, optionally linking a material into a process.
    pub fn ingredient(
        name: impl Into<String>,
        notes: Option<String>,
        material: Option<&Node>,
        process: Option<&Node>,
    ) -> Result<Self, GemdError> {
        let mut input = NodeInput::new();
        if let Some(notes) = notes {
            input = input.notes(notes);
        }
        let mut node = Self::bare(&NodeClass::ingredient(), name.into(), &input)?;
        if let Some(material) = material {
            node.set_material(material)?;
        }
        if let Some(process) = process {
            node.set_process(process)?;
        }
        Ok(node)
    }

    /// Bind a measurement to the material run it measured.
    pub fn set_material_run(&mut self, material: &Node) -> Result<(), GemdError> {
        self.bind_material_run(&NodeRef {
            kind: material.kind,
            link: material.run.link(),
        })
    }

    pub(super) fn bind_material_run(&mut self, material: &NodeRef) -> Result<(), GemdError> {
        self.expect_kind(NodeKind::Measurement, "be bound to a material run")?;
        expect_node_kind(material.kind, NodeKind::Material)?;
        self.run.material = material.link.clone();
        Ok(())
    }

    /// Link an ingredient to the material it consumes.
    pub fn set_material(&mut self, material: &Node) -> Result<(), GemdError> {
        self.expect_kind(NodeKind::Ingredient, "reference a material")?;
        expect_node_kind(material.kind, NodeKind::Material)?;
        self.spec.material = material.spec.link();
        self.run.material = material.run.link();
        Ok(())
    }

    /// Link an ingredient to the process consuming it.
    pub fn set_process(&mut self, process: &Node) -> Result<(), GemdError> {
        self.expect_kind(NodeKind::Ingredient, "belong to a process")?;
        expect_node_kind(process.kind, NodeKind::Process)?;
        self.spec.process = process.spec.link();
        self.run.process = process.run.link();
        Ok(())
    }

    fn expect_kind(&self, kind: NodeKind, action: &str) -> Result<(), GemdError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(GemdError::WrongType(format!(
                "only {} nodes can {}, not {}",
                kind, action, self.kind
            )))
        }
    }
}

fn expect_node_kind(found: NodeKind, expected: NodeKind) -> Result<(), GemdError> {
    if found == expected {
        Ok(())
    } else {
        Err(GemdError::WrongType(format!(
            "expected a {} node, found {}",
            expected, found
        )))
    }
}
