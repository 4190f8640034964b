//! In-memory state store.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::port::StateStore;

#[derive(Default)]
struct Entries {
    values: HashMap<String, Value>,
    owners: HashMap<String, String>,
}

/// Process-local [`StateStore`] with first-writer key ownership.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<Entries>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner that claimed `key`, if any.
    #[must_use]
    pub fn owner_of(&self, key: &str) -> Option<String> {
        self.entries.read().owners.get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().values.get(key).cloned()
    }

    fn set(&self, owner: &str, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.owners.get(key) {
            Some(current) if current != owner => {
                return Err(Error::KeyOwned {
                    key: key.to_string(),
                    owner: current.clone(),
                });
            }
            Some(_) => {}
            None => {
                entries.owners.insert(key.to_string(), owner.to_string());
            }
        }
        entries.values.insert(key.to_string(), value);
        Ok(())
    }
}
