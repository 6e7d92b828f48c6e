//! Session-specific storage helpers.

use super::traits::Storage;
use crate::domain::{LoopSession, ResultSession};
use crate::error::{IterloopError, Result};

/// Collection name for source-side sessions.
pub const LOOP_SESSIONS_COLLECTION: &str = "loop_sessions";

/// Collection name for sink-side sessions.
pub const RESULT_SESSIONS_COLLECTION: &str = "result_sessions";

/// Typed view of the loop sessions.
pub struct LoopSessionStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> LoopSessionStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn get(&self, loop_id: &str) -> Result<Option<LoopSession>> {
        self.storage.get(LOOP_SESSIONS_COLLECTION, loop_id)
    }

    pub fn create(&self, session: &LoopSession) -> Result<()> {
        self.storage.create(LOOP_SESSIONS_COLLECTION, session)
    }

    pub fn update(&self, session: &LoopSession) -> Result<()> {
        self.storage.update(LOOP_SESSIONS_COLLECTION, session)
    }

    /// Delete a session. Returns false if there was nothing to delete.
    pub fn delete(&self, loop_id: &str) -> Result<bool> {
        absent_is_false(self.storage.delete(LOOP_SESSIONS_COLLECTION, loop_id))
    }

    pub fn list(&self) -> Result<Vec<LoopSession>> {
        self.storage.list(LOOP_SESSIONS_COLLECTION)
    }
}

/// Typed view of the result sessions.
pub struct ResultSessionStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> ResultSessionStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn get(&self, loop_id: &str) -> Result<Option<ResultSession>> {
        self.storage.get(RESULT_SESSIONS_COLLECTION, loop_id)
    }

    pub fn create(&self, session: &ResultSession) -> Result<()> {
        self.storage.create(RESULT_SESSIONS_COLLECTION, session)
    }

    pub fn update(&self, session: &ResultSession) -> Result<()> {
        self.storage.update(RESULT_SESSIONS_COLLECTION, session)
    }

    /// Delete a session. Returns false if there was nothing to delete.
    pub fn delete(&self, loop_id: &str) -> Result<bool> {
        absent_is_false(self.storage.delete(RESULT_SESSIONS_COLLECTION, loop_id))
    }

    pub fn list(&self) -> Result<Vec<ResultSession>> {
        self.storage.list(RESULT_SESSIONS_COLLECTION)
    }
}

fn absent_is_false(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(IterloopError::SessionNotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
