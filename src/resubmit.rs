//! Resubmission port
//!
//! The sink decides when a loop must advance; actually re-evaluating the graph
//! belongs to the host. The host plugs in a `Resubmitter` that receives the
//! next control payload and arranges for the graph to run again with it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::info;

use crate::domain::ControlPayload;
use crate::error::{IterloopError, Result};

/// Request to re-evaluate a graph with a new source control payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResubmitRequest {
    /// Graph or node identifier the sink was given
    pub graph_id: String,
    /// Payload to substitute into the source's control input
    pub control: ControlPayload,
}

impl ResubmitRequest {
    pub fn new(graph_id: impl Into<String>, control: ControlPayload) -> Self {
        Self {
            graph_id: graph_id.into(),
            control,
        }
    }

    pub fn control_json(&self) -> String {
        self.control.to_json()
    }
}

/// Host capability: re-evaluate a graph with a parameter override.
pub trait Resubmitter: Send + Sync {
    fn resubmit(&self, request: &ResubmitRequest) -> Result<()>;
}

impl<T: Resubmitter + ?Sized> Resubmitter for Arc<T> {
    fn resubmit(&self, request: &ResubmitRequest) -> Result<()> {
        (**self).resubmit(request)
    }
}

/// Logs each request and leaves requeueing to whoever reads the sink output.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResubmitter;

impl Resubmitter for LogResubmitter {
    fn resubmit(&self, request: &ResubmitRequest) -> Result<()> {
        info!(
            "Resubmit requested for graph {}: {}",
            request.graph_id,
            request.control_json()
        );
        Ok(())
    }
}

/// Collects requests in arrival order for an in-process driver to consume.
#[derive(Debug, Default)]
pub struct QueueResubmitter {
    queue: Mutex<VecDeque<ResubmitRequest>>,
}

impl QueueResubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest pending request.
    pub fn pop(&self) -> Result<Option<ResubmitRequest>> {
        let mut queue = self.queue.lock().map_err(|e| IterloopError::Resubmit(e.to_string()))?;
        Ok(queue.pop_front())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Resubmitter for QueueResubmitter {
    fn resubmit(&self, request: &ResubmitRequest) -> Result<()> {
        let mut queue = self.queue.lock().map_err(|e| IterloopError::Resubmit(e.to_string()))?;
        queue.push_back(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_control_json() {
        let request = ResubmitRequest::new("7", ControlPayload::next("l1", 3, Some("src-1".to_string())));
        let parsed = ControlPayload::parse(&request.control_json()).unwrap();
        assert_eq!(parsed.loop_id.as_deref(), Some("l1"));
        assert_eq!(parsed.target_index, 3);
        assert_eq!(parsed.origin_id.as_deref(), Some("src-1"));
    }

    #[test]
    fn test_log_resubmitter_accepts() {
        let request = ResubmitRequest::new("7", ControlPayload::next("l1", 1, None));
        assert!(LogResubmitter.resubmit(&request).is_ok());
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = QueueResubmitter::new();
        assert!(queue.is_empty());

        queue.resubmit(&ResubmitRequest::new("g", ControlPayload::next("l1", 1, None))).unwrap();
        queue.resubmit(&ResubmitRequest::new("g", ControlPayload::next("l1", 2, None))).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().unwrap().unwrap().control.target_index, 1);
        assert_eq!(queue.pop().unwrap().unwrap().control.target_index, 2);
        assert!(queue.pop().unwrap().is_none());
    }
}
