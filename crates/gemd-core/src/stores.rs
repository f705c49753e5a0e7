//! Host-owned map of open template stores, keyed by store id.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::formats::JsonEncoder;
use crate::registry::TemplateRegistry;
use crate::GemdError;

/// Named lookup `store_id → TemplateRegistry`.
///
/// Each store is opened (initialized and loaded) exactly once.
#[derive(Debug, Default)]
pub struct TemplateStores {
    stores: BTreeMap<String, TemplateRegistry>,
}

impl TemplateStores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store with the JSON encoder, or return it if already open.
    pub fn open(
        &mut self,
        id: &str,
        root: impl Into<PathBuf>,
    ) -> Result<&mut TemplateRegistry, GemdError> {
        if !self.stores.contains_key(id) {
            let registry = TemplateRegistry::open(id, root, Box::new(JsonEncoder::pretty()))?;
            self.stores.insert(id.to_string(), registry);
        }
        self.get_mut(id)
    }

    pub fn get(&self, id: &str) -> Result<&TemplateRegistry, GemdError> {
        self.stores
            .get(id)
            .ok_or_else(|| GemdError::NotFound(format!("template store '{}'", id)))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut TemplateRegistry, GemdError> {
        self.stores
            .get_mut(id)
            .ok_or_else(|| GemdError::NotFound(format!("template store '{}'", id)))
    }

    /// Ids of the open stores, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_once_then_lookup() {
        let dir = TempDir::new().expect("tempdir");
        let mut stores = TemplateStores::new();
        stores.open("lab", dir.path()).expect("open");
        stores.open("lab", dir.path().join("ignored")).expect("reopen");

        assert!(!dir.path().join("ignored").exists());
        assert_eq!(stores.get("lab").expect("get").id(), "lab");
        assert_eq!(stores.ids().collect::<Vec<_>>(), vec!["lab"]);
    }

    #[test]
    fn missing_store_is_not_found() {
        let mut stores = TemplateStores::new();
        assert!(matches!(stores.get("nope"), Err(GemdError::NotFound(_))));
        assert!(matches!(stores.get_mut("nope"), Err(GemdError::NotFound(_))));
    }
}
