//! In-process storage, the default home of the session registries.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Serialize, de::DeserializeOwned};

use super::traits::{HasId, Storage};
use crate::error::{IterloopError, Result};

/// Storage that keeps every collection in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: RwLock<HashMap<String, BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn create<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IterloopError::Storage(e.to_string()))?;
        let records = collections.entry(collection.to_string()).or_default();
        if records.contains_key(record.id()) {
            return Err(IterloopError::Storage(format!(
                "Record already exists in {}: {}",
                collection,
                record.id()
            )));
        }
        records.insert(record.id().to_string(), value);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IterloopError::Storage(e.to_string()))?;
        match collections.get(collection).and_then(|records| records.get(id)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn update<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IterloopError::Storage(e.to_string()))?;
        let slot = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(record.id()))
            .ok_or_else(|| IterloopError::SessionNotFound(record.id().to_string()))?;
        *slot = value;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IterloopError::Storage(e.to_string()))?;
        collections
            .get_mut(collection)
            .and_then(|records| records.remove(id))
            .map(|_| ())
            .ok_or_else(|| IterloopError::SessionNotFound(id.to_string()))
    }

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IterloopError::Storage(e.to_string()))?;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        records
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(IterloopError::from))
            .collect()
    }
}
