//! # Identifier Service
//!
//! Issues the two reserved identifiers carried by every template:
//!
//! - `auto`: a random v4 UUID, issued the first time an object is seen.
//! - `persistent_id`: a v5 UUID derived from the store id, template kind and
//!   template name, so the same template gets the same id in every session.
//!
//! Neither is ever overwritten once set. Callers may not supply either.

use std::sync::Arc;
use uuid::Uuid;

use crate::model::{AttributeTemplate, ObjectTemplate};
use crate::primitives::{AUTO_SCOPE, PERSISTENT_ID_SCOPE, RESERVED_SCOPES};
use crate::types::{TemplateKind, Uids};
use crate::GemdError;

/// Issues and reserves identifiers for one template store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdService {
    namespace: Uuid,
}

impl IdService {
    /// Create the id service for a named store.
    #[must_use]
    pub fn for_store(store_id: &str) -> Self {
        let namespace = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("gemd-template-store:{}", store_id).as_bytes(),
        );
        Self { namespace }
    }

    /// Issue a fresh `auto` identifier.
    #[must_use]
    pub fn issue_auto() -> String {
        Uuid::new_v4().to_string()
    }

    /// The persistent id of a template in this store.
    #[must_use]
    pub fn persistent_id(&self, kind: TemplateKind, name: &str) -> String {
        Uuid::new_v5(&self.namespace, format!("{}/{}", kind, name).as_bytes()).to_string()
    }

    /// Reject a user-supplied id map carrying a reserved scope.
    pub fn check_reserved(uids: &Uids) -> Result<(), GemdError> {
        match RESERVED_SCOPES.iter().find(|scope| uids.contains_key(**scope)) {
            Some(scope) => Err(GemdError::ReservedIdentifier((*scope).to_string())),
            None => Ok(()),
        }
    }

    /// Stamp `auto` if absent. Returns the (possibly pre-existing) id.
    pub fn stamp_auto(uids: &mut Uids) -> String {
        uids.entry(AUTO_SCOPE.to_string())
            .or_insert_with(Self::issue_auto)
            .clone()
    }

    /// Stamp `auto` on an attribute template if absent.
    pub fn stamp_attribute(template: &mut Arc<AttributeTemplate>) {
        if template.auto_id().is_none() {
            Self::stamp_auto(&mut Arc::make_mut(template).uids);
        }
    }

    /// Stamp `auto` and `persistent_id` on an object template, keeping any
    /// value already present. Returns whether anything was added.
    pub fn stamp_template(&self, template: &mut ObjectTemplate) -> bool {
        let mut changed = false;
        if !template.uids.contains_key(AUTO_SCOPE) {
            Self::stamp_auto(&mut template.uids);
            changed = true;
        }
        if !template.uids.contains_key(PERSISTENT_ID_SCOPE) {
            let pid = self.persistent_id(template.kind, &template.name);
            template.uids.insert(PERSISTENT_ID_SCOPE.to_string(), pid);
            changed = true;
        }
        changed
    }
}
