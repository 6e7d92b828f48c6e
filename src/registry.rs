//! Process-wide session registry
//!
//! Both loop nodes are rebuilt from scratch on every graph evaluation, so the
//! only memory a loop has is what sits in this registry between passes. The
//! source owns the loop sessions, the sink owns the result sessions; both
//! share one storage backend.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use log::{debug, info};
use serde::Serialize;

use crate::error::Result;
use crate::id::now_ms;
use crate::storage::{LoopSessionStore, MemoryStorage, ResultSessionStore, Storage};

/// The two session stores over one storage backend.
#[derive(Debug)]
pub struct LoopRegistry<S: Storage> {
    storage: Arc<S>,
}

/// One loop as seen from both sides of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub loop_id: String,
    pub total_iterations: Option<usize>,
    pub current_index: Option<usize>,
    pub received_count: Option<usize>,
    pub origin_id: Option<String>,
    pub updated_at: u64,
}

impl<S: Storage> LoopRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Source-side sessions
    pub fn loops(&self) -> LoopSessionStore<'_, S> {
        LoopSessionStore::new(&self.storage)
    }

    /// Sink-side sessions
    pub fn results(&self) -> ResultSessionStore<'_, S> {
        ResultSessionStore::new(&self.storage)
    }

    /// Release both sessions of a loop. Returns true if anything was removed.
    pub fn clear_loop(&self, loop_id: &str) -> Result<bool> {
        let removed_results = self.results().delete(loop_id)?;
        let removed_loop = self.loops().delete(loop_id)?;
        if removed_results || removed_loop {
            debug!("Released sessions for loop {}", loop_id);
        }
        Ok(removed_results || removed_loop)
    }

    /// Every loop with state on either side, ordered by id.
    pub fn active_loops(&self) -> Result<Vec<LoopSummary>> {
        let mut summaries: BTreeMap<String, LoopSummary> = BTreeMap::new();

        for session in self.loops().list()? {
            summaries.insert(
                session.loop_id.clone(),
                LoopSummary {
                    total_iterations: Some(session.total()),
                    current_index: Some(session.current_index),
                    received_count: None,
                    origin_id: Some(session.origin_id),
                    updated_at: session.updated_at,
                    loop_id: session.loop_id,
                },
            );
        }

        for session in self.results().list()? {
            let summary = summaries
                .entry(session.loop_id.clone())
                .or_insert_with(|| LoopSummary {
                    loop_id: session.loop_id.clone(),
                    total_iterations: Some(session.total_expected),
                    current_index: None,
                    received_count: None,
                    origin_id: None,
                    updated_at: session.updated_at,
                });
            summary.received_count = Some(session.received_count);
            summary.updated_at = summary.updated_at.max(session.updated_at);
        }

        Ok(summaries.into_values().collect())
    }

    /// Release loops untouched for longer than `max_age_ms`.
    ///
    /// Abandoned loops are never cleaned up by the nodes themselves; this is
    /// the manual way out. Returns the ids that were released.
    pub fn purge_older_than(&self, max_age_ms: u64) -> Result<Vec<String>> {
        let cutoff = now_ms().saturating_sub(max_age_ms);
        let mut purged = Vec::new();
        for summary in self.active_loops()? {
            if summary.updated_at < cutoff && self.clear_loop(&summary.loop_id)? {
                purged.push(summary.loop_id);
            }
        }
        if !purged.is_empty() {
            info!("Purged {} abandoned loop(s)", purged.len());
        }
        Ok(purged)
    }
}

impl<S: Storage> Clone for LoopRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl LoopRegistry<MemoryStorage> {
    /// In-memory registry private to the caller.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Handle on the process-wide in-memory registry.
    pub fn shared() -> LoopRegistry<MemoryStorage> {
        static SHARED: OnceLock<LoopRegistry<MemoryStorage>> = OnceLock::new();
        SHARED.get_or_init(LoopRegistry::in_memory).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoopSession, ResultSession};
    use serde_json::json;

    fn seeded() -> LoopRegistry<MemoryStorage> {
        let registry = LoopRegistry::in_memory();
        registry
            .loops()
            .create(&LoopSession::new("l1", vec![vec![json!(1)], vec![json!(2)]], "src-1"))
            .unwrap();
        registry.results().create(&ResultSession::new("l1", 2).unwrap()).unwrap();
        registry
            .loops()
            .create(&LoopSession::new("l2", vec![vec![json!("x")]], "src-2"))
            .unwrap();
        registry
    }

    #[test]
    fn test_clear_loop_removes_both_sides() {
        let registry = seeded();
        assert!(registry.clear_loop("l1").unwrap());
        assert!(registry.loops().get("l1").unwrap().is_none());
        assert!(registry.results().get("l1").unwrap().is_none());
        assert!(!registry.clear_loop("l1").unwrap());
    }

    #[test]
    fn test_active_loops_merges_sides() {
        let registry = seeded();
        let active = registry.active_loops().unwrap();
        assert_eq!(active.len(), 2);

        assert_eq!(active[0].loop_id, "l1");
        assert_eq!(active[0].total_iterations, Some(2));
        assert_eq!(active[0].received_count, Some(0));
        assert_eq!(active[0].origin_id.as_deref(), Some("src-1"));

        assert_eq!(active[1].loop_id, "l2");
        assert_eq!(active[1].received_count, None);
    }

    #[test]
    fn test_result_only_loop_is_listed() {
        let registry = LoopRegistry::in_memory();
        registry.results().create(&ResultSession::new("orphan", 3).unwrap()).unwrap();
        let active = registry.active_loops().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].total_iterations, Some(3));
        assert_eq!(active[0].current_index, None);
    }

    #[test]
    fn test_purge_older_than() {
        let registry = seeded();
        let mut stale = registry.loops().get("l2").unwrap().unwrap();
        stale.updated_at = 0;
        registry.loops().update(&stale).unwrap();

        let purged = registry.purge_older_than(60_000).unwrap();
        assert_eq!(purged, vec!["l2".to_string()]);
        assert!(registry.loops().get("l1").unwrap().is_some());
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = LoopRegistry::in_memory();
        let other = registry.clone();
        other.results().create(&ResultSession::new("l1", 1).unwrap()).unwrap();
        assert!(registry.results().get("l1").unwrap().is_some());
    }

    #[test]
    fn test_shared_is_process_wide() {
        let loop_id = crate::id::generate_loop_id();
        LoopRegistry::shared()
            .results()
            .create(&ResultSession::new(loop_id.as_str(), 1).unwrap())
            .unwrap();

        assert!(LoopRegistry::shared().results().get(&loop_id).unwrap().is_some());
        assert!(LoopRegistry::in_memory().results().get(&loop_id).unwrap().is_none());
        assert!(LoopRegistry::shared().clear_loop(&loop_id).unwrap());
    }
}
