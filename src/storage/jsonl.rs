//! JSONL-based storage implementation with in-memory caching.
//!
//! Lets loop state outlive the process, so separate invocations (for example
//! one CLI call per graph evaluation) can share sessions.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::traits::{HasId, Storage};
use crate::error::{IterloopError, Result};

/// One line of a collection file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    record: serde_json::Value,
}

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a collection.
    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    /// Load a collection into cache if not already loaded.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|e| IterloopError::Storage(e.to_string()))?;
            if cache.contains_key(collection) {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(|e| IterloopError::Storage(e.to_string()))?;
        if cache.contains_key(collection) {
            return Ok(());
        }

        let path = self.collection_path(collection);
        let records = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let mut records = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    records.push(serde_json::from_str(&line)?);
                }
            }
            records
        } else {
            Vec::new()
        };

        cache.insert(collection.to_string(), records);
        Ok(())
    }

    /// Append a record to the JSONL file.
    fn append_to_file(&self, collection: &str, record: &StoredRecord) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Rewrite the entire collection file from cache.
    fn rewrite_file(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = File::create(&path)?;
        for record in records {
            writeln!(file, "{}", serde_json::to_string(record)?)?;
        }
        Ok(())
    }
}

impl Storage for JsonlStorage {
    fn create<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;

        let stored = StoredRecord {
            id: record.id().to_string(),
            record: serde_json::to_value(record)?,
        };

        let mut cache = self.cache.write().map_err(|e| IterloopError::Storage(e.to_string()))?;
        let records = cache
            .get_mut(collection)
            .ok_or_else(|| IterloopError::Storage(format!("Collection not loaded: {}", collection)))?;
        if records.iter().any(|r| r.id == stored.id) {
            return Err(IterloopError::Storage(format!(
                "Record already exists in {}: {}",
                collection, stored.id
            )));
        }

        // Append to file first (source of truth)
        self.append_to_file(collection, &stored)?;
        records.push(stored);

        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(|e| IterloopError::Storage(e.to_string()))?;
        let records = cache
            .get(collection)
            .ok_or_else(|| IterloopError::Storage(format!("Collection not loaded: {}", collection)))?;

        match records.iter().find(|r| r.id == id) {
            Some(stored) => Ok(Some(serde_json::from_value(stored.record.clone())?)),
            None => Ok(None),
        }
    }

    fn update<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;

        let value = serde_json::to_value(record)?;

        let mut cache = self.cache.write().map_err(|e| IterloopError::Storage(e.to_string()))?;
        let records = cache
            .get_mut(collection)
            .ok_or_else(|| IterloopError::Storage(format!("Collection not loaded: {}", collection)))?;

        let stored = records
            .iter_mut()
            .find(|r| r.id == record.id())
            .ok_or_else(|| IterloopError::SessionNotFound(record.id().to_string()))?;
        stored.record = value;

        self.rewrite_file(collection, records)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.ensure_loaded(collection)?;

        let mut cache = self.cache.write().map_err(|e| IterloopError::Storage(e.to_string()))?;
        let records = cache
            .get_mut(collection)
            .ok_or_else(|| IterloopError::Storage(format!("Collection not loaded: {}", collection)))?;

        let original_len = records.len();
        records.retain(|r| r.id != id);
        if records.len() == original_len {
            return Err(IterloopError::SessionNotFound(id.to_string()));
        }

        self.rewrite_file(collection, records)
    }

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(|e| IterloopError::Storage(e.to_string()))?;
        let records = cache
            .get(collection)
            .ok_or_else(|| IterloopError::Storage(format!("Collection not loaded: {}", collection)))?;

        records
            .iter()
            .map(|r| serde_json::from_value(r.record.clone()).map_err(IterloopError::from))
            .collect()
    }
}
