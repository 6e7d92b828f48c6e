//! Session records kept between graph evaluations
//!
//! A `LoopSession` belongs to the source and holds the combinations of one
//! loop. A `ResultSession` belongs to the sink and holds the results collected
//! so far. Both are keyed by loop id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IterloopError, Result};
use crate::id::now_ms;
use crate::storage::HasId;

/// Source-side state for one loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSession {
    pub loop_id: String,

    /// Full Cartesian product of the inputs; never changes after creation
    pub combinations: Vec<Vec<Value>>,

    /// Last index served. Bookkeeping only: the control payload decides what
    /// gets served.
    pub current_index: usize,

    /// Source node that created the loop
    pub origin_id: String,

    pub created_at: u64,
    pub updated_at: u64,
}

impl LoopSession {
    pub fn new(loop_id: impl Into<String>, combinations: Vec<Vec<Value>>, origin_id: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            loop_id: loop_id.into(),
            combinations,
            current_index: 0,
            origin_id: origin_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total(&self) -> usize {
        self.combinations.len()
    }

    /// Combination at `index`, recording it as served.
    pub fn serve(&mut self, index: usize) -> Option<Vec<Value>> {
        let item = self.combinations.get(index).cloned()?;
        self.current_index = index;
        self.updated_at = now_ms();
        Some(item)
    }
}

impl HasId for LoopSession {
    fn id(&self) -> &str {
        &self.loop_id
    }
}

/// One position in a result buffer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    #[default]
    Empty,
    Filled(Value),
}

impl Slot {
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Empty => None,
        }
    }
}

/// What happened when a result was offered to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored,
    /// Slot already held a result; left untouched
    Duplicate,
    OutOfRange,
}

/// Sink-side state for one loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSession {
    pub loop_id: String,

    /// Fixed length, one slot per combination
    pub results: Vec<Slot>,

    /// Always equals the number of filled slots
    pub received_count: usize,

    pub total_expected: usize,

    pub created_at: u64,
    pub updated_at: u64,
}

impl ResultSession {
    /// Empty buffer of `total_expected` slots.
    ///
    /// Fails with `InvalidContext` if the buffer cannot be allocated.
    pub fn new(loop_id: impl Into<String>, total_expected: usize) -> Result<Self> {
        let mut results = Vec::new();
        results.try_reserve_exact(total_expected).map_err(|e| {
            IterloopError::InvalidContext(format!("cannot hold {} results: {}", total_expected, e))
        })?;
        results.resize(total_expected, Slot::Empty);

        let now = now_ms();
        Ok(Self {
            loop_id: loop_id.into(),
            results,
            received_count: 0,
            total_expected,
            created_at: now,
            updated_at: now,
        })
    }

    /// Write `value` at `index` unless that slot is already filled.
    pub fn record(&mut self, index: usize, value: Value) -> RecordOutcome {
        let Some(slot) = self.results.get_mut(index) else {
            return RecordOutcome::OutOfRange;
        };
        if slot.is_filled() {
            return RecordOutcome::Duplicate;
        }
        *slot = Slot::Filled(value);
        self.received_count += 1;
        self.updated_at = now_ms();
        RecordOutcome::Stored
    }

    pub fn is_complete(&self) -> bool {
        self.received_count == self.total_expected
    }

    /// Results in combination order, `None` where nothing arrived.
    pub fn collect(&self) -> Vec<Option<Value>> {
        self.results.iter().map(|slot| slot.value().cloned()).collect()
    }
}

impl HasId for ResultSession {
    fn id(&self) -> &str {
        &self.loop_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loop_session_serve_in_range() {
        let mut session = LoopSession::new("l1", vec![vec![json!(1)], vec![json!(2)]], "src-1");
        assert_eq!(session.serve(1), Some(vec![json!(2)]));
        assert_eq!(session.current_index, 1);
    }

    #[test]
    fn test_loop_session_serve_out_of_range_keeps_index() {
        let mut session = LoopSession::new("l1", vec![vec![json!(1)]], "src-1");
        assert_eq!(session.serve(5), None);
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn test_result_session_starts_empty() {
        let session = ResultSession::new("l1", 3).unwrap();
        assert_eq!(session.results.len(), 3);
        assert_eq!(session.received_count, 0);
        assert!(!session.is_complete());
    }

    #[test]
    fn test_result_session_rejects_unallocatable_size() {
        let err = ResultSession::new("l1", usize::MAX).unwrap_err();
        assert!(matches!(err, IterloopError::InvalidContext(_)));
    }

    #[test]
    fn test_result_session_zero_is_complete() {
        let session = ResultSession::new("l1", 0).unwrap();
        assert!(session.is_complete());
        assert!(session.collect().is_empty());
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut session = ResultSession::new("l1", 2).unwrap();
        assert_eq!(session.record(0, json!("first")), RecordOutcome::Stored);
        assert_eq!(session.record(0, json!("second")), RecordOutcome::Duplicate);
        assert_eq!(session.received_count, 1);
        assert_eq!(session.collect(), vec![Some(json!("first")), None]);
    }

    #[test]
    fn test_record_out_of_range() {
        let mut session = ResultSession::new("l1", 1).unwrap();
        assert_eq!(session.record(1, json!(1)), RecordOutcome::OutOfRange);
        assert_eq!(session.received_count, 0);
    }

    #[test]
    fn test_null_result_counts_as_filled() {
        let mut session = ResultSession::new("l1", 1).unwrap();
        session.record(0, Value::Null);
        assert!(session.is_complete());

        let json = serde_json::to_string(&session).unwrap();
        let restored: ResultSession = serde_json::from_str(&json).unwrap();
        assert!(restored.results[0].is_filled());
        assert_eq!(restored.collect(), vec![Some(Value::Null)]);
    }
}
