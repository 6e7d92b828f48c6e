//! Sink output types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resubmit::ResubmitRequest;

/// How a loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStatus {
    /// Every combination produced a result
    Complete,
    /// Source finished before every slot was filled
    Aborted,
    /// Nothing to collect: zero iterations or an unusable context
    Empty,
}

/// What the sink produces for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutput {
    /// Loop continues; the host should re-evaluate with this request
    Continue(ResubmitRequest),
    /// Loop is over and its state has been released
    Finished {
        results: Vec<Option<Value>>,
        status: LoopStatus,
    },
}

impl SinkOutput {
    pub fn empty() -> Self {
        SinkOutput::Finished {
            results: Vec::new(),
            status: LoopStatus::Empty,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SinkOutput::Finished { .. })
    }

    pub fn status(&self) -> Option<LoopStatus> {
        match self {
            SinkOutput::Finished { status, .. } => Some(*status),
            SinkOutput::Continue(_) => None,
        }
    }

    /// Collected slots, empty while the loop is still running
    pub fn results(&self) -> &[Option<Value>] {
        match self {
            SinkOutput::Finished { results, .. } => results,
            SinkOutput::Continue(_) => &[],
        }
    }

    /// Results as plain values, unfilled slots as null
    pub fn into_values(self) -> Vec<Value> {
        match self {
            SinkOutput::Finished { results, .. } => {
                results.into_iter().map(|r| r.unwrap_or(Value::Null)).collect()
            }
            SinkOutput::Continue(_) => Vec::new(),
        }
    }

    pub fn resubmit_request(&self) -> Option<&ResubmitRequest> {
        match self {
            SinkOutput::Continue(request) => Some(request),
            SinkOutput::Finished { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ControlPayload;
    use serde_json::json;

    #[test]
    fn test_empty_output() {
        let out = SinkOutput::empty();
        assert!(out.is_terminal());
        assert_eq!(out.status(), Some(LoopStatus::Empty));
        assert!(out.results().is_empty());
    }

    #[test]
    fn test_continue_output() {
        let request = ResubmitRequest::new("node-9", ControlPayload::next("l1", 1, None));
        let out = SinkOutput::Continue(request.clone());
        assert!(!out.is_terminal());
        assert_eq!(out.status(), None);
        assert_eq!(out.resubmit_request(), Some(&request));
        assert!(out.into_values().is_empty());
    }

    #[test]
    fn test_into_values_fills_gaps_with_null() {
        let out = SinkOutput::Finished {
            results: vec![Some(json!(1)), None],
            status: LoopStatus::Aborted,
        };
        assert_eq!(out.into_values(), vec![json!(1), Value::Null]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LoopStatus::Aborted).unwrap(), "\"aborted\"");
    }
}
