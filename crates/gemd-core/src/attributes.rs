//! # Attribute Kit
//!
//! Slot classification and template validation for attributes.
//!
//! - Map attribute kinds to the slot they live in, per node kind
//! - Build the `AttrsDict` describing which attribute templates a node accepts
//! - Validate candidate attributes against declared templates and bounds
//! - Apply validated attributes to a spec, a run, or both
//!
//! Nothing is written until every attribute in a batch has validated.

use std::sync::Arc;

use crate::model::{
    Attribute, AttributeTemplate, AttributeValue, GemdObject, ObjectTemplate, Run, Spec,
    content_digest, select_targets,
};
use crate::types::{AttributeKind, NodeKind, Slot, Which};
use crate::GemdError;

/// One declared attribute: its template and the default value node
/// construction writes to the spec.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrEntry {
    pub template: Arc<AttributeTemplate>,
    pub default: Option<AttributeValue>,
}

/// Slot name → attribute name → declared attribute.
///
/// Only slots the template kind permits are present. Entries keep declaration
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrsDict {
    slots: Vec<(Slot, Vec<AttrEntry>)>,
}

impl AttrsDict {
    /// A dictionary with no slots (ingredients).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the dictionary of an already-finalized template.
    pub fn from_template(template: &ObjectTemplate) -> Result<Self, GemdError> {
        let mut attrs = AttributeKit::validate_temp_keys(template)?;
        for slot in Slot::ALL {
            for declared in template.slot(slot) {
                AttributeKit::define_attribute(
                    &mut attrs,
                    Arc::clone(declared),
                    declared.default.clone(),
                )?;
            }
        }
        Ok(attrs)
    }

    /// Slots present, in slot order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots.iter().map(|(slot, _)| *slot)
    }

    #[must_use]
    pub fn has_slot(&self, slot: Slot) -> bool {
        self.slots.iter().any(|(s, _)| *s == slot)
    }

    /// Declared attributes in a slot (empty if the slot is absent).
    #[must_use]
    pub fn entries(&self, slot: Slot) -> &[AttrEntry] {
        self.slots
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a declared attribute by name.
    #[must_use]
    pub fn get(&self, slot: Slot, name: &str) -> Option<&AttrEntry> {
        self.entries(slot).iter().find(|e| e.template.name == name)
    }

    /// Total number of declared attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(|(_, entries)| entries.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries_mut(&mut self, slot: Slot) -> Option<&mut Vec<AttrEntry>> {
        self.slots
            .iter_mut()
            .find(|(s, _)| *s == slot)
            .map(|(_, entries)| entries)
    }
}

/// Stateless attribute operations.
pub struct AttributeKit;

impl AttributeKit {
    /// The slot an attribute kind lives in, if the node kind permits it.
    pub fn slot_of(kind: AttributeKind, node: NodeKind) -> Result<Slot, GemdError> {
        let slot = kind.slot();
        if node.allowed_slots().contains(&slot) {
            Ok(slot)
        } else {
            Err(GemdError::WrongAttributeKind { kind, node })
        }
    }

    /// Inspect a template and return the `AttrsDict` skeleton for its kind.
    ///
    /// Fails if the template declares attributes in a slot its kind disallows,
    /// or an attribute template of the wrong kind inside a slot.
    pub fn validate_temp_keys(template: &ObjectTemplate) -> Result<AttrsDict, GemdError> {
        let mut slots = Vec::new();
        for slot in Slot::ALL {
            let declared = template.slot(slot);
            if !template.kind.allows(slot) {
                if !declared.is_empty() {
                    return Err(GemdError::InvalidTemplateSlot {
                        template: template.name.clone(),
                        slot,
                        reason: format!("a {} cannot declare {}", template.kind, slot),
                    });
                }
                continue;
            }
            if let Some(misplaced) = declared.iter().find(|t| t.kind.slot() != slot) {
                return Err(GemdError::InvalidTemplateSlot {
                    template: template.name.clone(),
                    slot,
                    reason: format!("'{}' is a {} template", misplaced.name, misplaced.kind),
                });
            }
            slots.push((slot, Vec::new()));
        }
        Ok(AttrsDict { slots })
    }

    /// Declare an attribute template (with an optional default).
    ///
    /// Re-declaring a structurally identical template is a no-op; a different
    /// template under the same name is rejected.
    pub fn define_attribute(
        attrs: &mut AttrsDict,
        template: Arc<AttributeTemplate>,
        default: Option<AttributeValue>,
    ) -> Result<(), GemdError> {
        let slot = template.kind.slot();
        let entries = attrs
            .entries_mut(slot)
            .ok_or_else(|| GemdError::InvalidTemplateSlot {
                template: template.name.clone(),
                slot,
                reason: "slot is not declared by the object template".to_string(),
            })?;

        Self::check_declaration(&template, slot, default.as_ref())?;

        if let Some(existing) = entries.iter_mut().find(|e| e.template.name == template.name) {
            if !same_template(&existing.template, &template)? {
                return Err(GemdError::DuplicateAttributeName(template.name.clone()));
            }
            if default.is_some() {
                existing.default = default;
            }
            return Ok(());
        }

        entries.push(AttrEntry { template, default });
        Ok(())
    }

    /// Check that an attribute template's bounds are well formed and that its
    /// default (the explicit one, else the template's own) lies within them.
    pub fn check_declaration(
        template: &AttributeTemplate,
        slot: Slot,
        default: Option<&AttributeValue>,
    ) -> Result<(), GemdError> {
        if !template.bounds.is_well_formed() {
            return Err(GemdError::InvalidTemplateSlot {
                template: template.name.clone(),
                slot,
                reason: "bounds are empty or inverted".to_string(),
            });
        }
        if let Some(value) = default.or(template.default.as_ref()) {
            if !template.bounds.contains(value) {
                return Err(GemdError::OutOfBounds {
                    name: template.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Write the declared attribute templates back into the object template.
    ///
    /// Defaults recorded only in the dictionary are folded into their
    /// attribute templates so they survive registration.
    pub fn finalize_template(attrs: &mut AttrsDict, template: &mut ObjectTemplate) {
        for (slot, entries) in &mut attrs.slots {
            for entry in entries.iter_mut() {
                if entry.default.is_some() && entry.template.default != entry.default {
                    Arc::make_mut(&mut entry.template).default = entry.default.clone();
                }
            }
            *template.slot_mut(*slot) = entries.iter().map(|e| Arc::clone(&e.template)).collect();
        }
    }

    /// Validate an attribute against the declared templates.
    ///
    /// Returns the declared (canonical) template the attribute must cite.
    pub fn validate_attribute(
        attrs: &AttrsDict,
        attribute: &Attribute,
    ) -> Result<Arc<AttributeTemplate>, GemdError> {
        let slot = attribute.kind.slot();
        let unknown = || GemdError::UnknownAttribute {
            name: attribute.name.clone(),
            slot,
        };
        let entry = attrs.get(slot, &attribute.name).ok_or_else(unknown)?;

        if let Some(cited) = &attribute.template {
            if !same_template(cited, &entry.template)? {
                return Err(unknown());
            }
        }

        if !entry.template.bounds.contains(&attribute.value) {
            return Err(GemdError::OutOfBounds {
                name: attribute.name.clone(),
                value: attribute.value.to_string(),
            });
        }

        Ok(Arc::clone(&entry.template))
    }

    /// Validate and apply attributes of one kind to the spec, run, or both.
    ///
    /// With `replace_all` the target slot is cleared first. Attributes are
    /// identified by name: a new value replaces an existing one in place.
    pub fn update_attrs(
        attrs: &AttrsDict,
        spec: &mut Spec,
        run: &mut Run,
        node: NodeKind,
        kind: AttributeKind,
        attributes: Vec<Attribute>,
        replace_all: bool,
        which: Which,
    ) -> Result<(), GemdError> {
        let slot = Self::slot_of(kind, node)?;

        let mut validated = Vec::with_capacity(attributes.len());
        for mut attribute in attributes {
            if attribute.kind != kind {
                return Err(GemdError::WrongAttributeKind {
                    kind: attribute.kind,
                    node,
                });
            }
            attribute.template = Some(Self::validate_attribute(attrs, &attribute)?);
            validated.push(attribute);
        }

        for target in select_targets(spec, run, which) {
            let current = target.slot_mut(slot);
            if replace_all {
                current.clear();
            }
            for attribute in &validated {
                upsert(current, attribute.clone());
            }
        }
        Ok(())
    }

    /// Remove attributes of one kind by name. Unknown names are ignored.
    pub fn remove_attrs(
        spec: &mut Spec,
        run: &mut Run,
        node: NodeKind,
        kind: AttributeKind,
        names: &[&str],
        which: Which,
    ) -> Result<(), GemdError> {
        let slot = Self::slot_of(kind, node)?;
        for target in select_targets(spec, run, which) {
            target
                .slot_mut(slot)
                .retain(|a| !names.contains(&a.name.as_str()));
        }
        Ok(())
    }

    /// Spec attributes populated from declared defaults.
    #[must_use]
    pub fn default_attributes(attrs: &AttrsDict) -> Vec<Attribute> {
        attrs
            .slots
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .filter_map(|entry| {
                entry.default.as_ref().map(|value| {
                    Attribute::new(entry.template.name.clone(), entry.template.kind, value.clone())
                        .with_template(Arc::clone(&entry.template))
                })
            })
            .collect()
    }

    /// Check that every attribute on an object cites a declared template and
    /// lies within its bounds.
    pub fn check_object(attrs: &AttrsDict, object: &dyn GemdObject) -> Result<(), GemdError> {
        for slot in Slot::ALL {
            for attribute in object.slot(slot) {
                let unknown = || GemdError::UnknownAttribute {
                    name: attribute.name.clone(),
                    slot,
                };
                let entry = attrs.get(slot, &attribute.name).ok_or_else(unknown)?;
                match &attribute.template {
                    Some(cited) if same_template(cited, &entry.template)? => {}
                    _ => return Err(unknown()),
                }
                if !entry.template.bounds.contains(&attribute.value) {
                    return Err(GemdError::OutOfBounds {
                        name: attribute.name.clone(),
                        value: attribute.value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn upsert(slot: &mut Vec<Attribute>, attribute: Attribute) {
    match slot.iter_mut().find(|a| a.name == attribute.name) {
        Some(existing) => *existing = attribute,
        None => slot.push(attribute),
    }
}

fn same_template(a: &Arc<AttributeTemplate>, b: &Arc<AttributeTemplate>) -> Result<bool, GemdError> {
    if Arc::ptr_eq(a, b) {
        return Ok(true);
    }
    Ok(content_digest(a.as_ref())? == content_digest(b.as_ref())?)
}

// =============================================================================
// TESTS
// =============================================================================
