//! Storage that fails selected collections on demand, for exercising the
//! nodes' degraded paths.

use std::collections::HashSet;
use std::sync::RwLock;

use serde::{Serialize, de::DeserializeOwned};

use super::memory::MemoryStorage;
use super::traits::{HasId, Storage};
use crate::error::{IterloopError, Result};

#[derive(Debug, Default)]
pub(crate) struct FaultyStorage {
    inner: MemoryStorage,
    read_faults: RwLock<HashSet<String>>,
    write_faults: RwLock<HashSet<String>>,
}

impl FaultyStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every get/list on `collection` fail from now on.
    pub(crate) fn fail_reads(&self, collection: &str) {
        self.read_faults.write().unwrap().insert(collection.to_string());
    }

    /// Make every create/update/delete on `collection` fail from now on.
    pub(crate) fn fail_writes(&self, collection: &str) {
        self.write_faults.write().unwrap().insert(collection.to_string());
    }

    fn check(faults: &RwLock<HashSet<String>>, collection: &str) -> Result<()> {
        if faults.read().unwrap().contains(collection) {
            return Err(IterloopError::Storage(format!("{} is unavailable", collection)));
        }
        Ok(())
    }
}

impl Storage for FaultyStorage {
    fn create<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        Self::check(&self.write_faults, collection)?;
        self.inner.create(collection, record)
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        Self::check(&self.read_faults, collection)?;
        self.inner.get(collection, id)
    }

    fn update<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        Self::check(&self.write_faults, collection)?;
        self.inner.update(collection, record)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        Self::check(&self.write_faults, collection)?;
        self.inner.delete(collection, id)
    }

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        Self::check(&self.read_faults, collection)?;
        self.inner.list(collection)
    }
}
