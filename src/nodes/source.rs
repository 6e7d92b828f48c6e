//! IterationSource: serves one combination per graph evaluation.
//!
//! On first sight of a loop the source expands its inputs into the full
//! Cartesian product and stores it as a `LoopSession`. Every later evaluation
//! of the same loop reads that session back and serves the combination named
//! by the control payload's `target_index`.

use log::{debug, info, warn};
use serde_json::Value;

use crate::combinations::{cartesian_product, normalize_inputs};
use crate::domain::{ControlPayload, IterationContext, LoopSession};
use crate::error::IterloopError;
use crate::id::{NO_LOOP_ID, generate_loop_id, generate_origin_id};
use crate::registry::LoopRegistry;
use crate::storage::Storage;

/// What the source emits for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutput {
    /// Combination to feed the loop body, None once the loop is exhausted
    pub item: Option<Vec<Value>>,
    pub context: IterationContext,
}

impl SourceOutput {
    pub fn context_json(&self) -> String {
        self.context.to_json()
    }

    /// The item as a single JSON value (null when there is none).
    pub fn item_value(&self) -> Value {
        self.item.clone().map_or(Value::Null, Value::Array)
    }
}

/// Loop head node
#[derive(Debug)]
pub struct IterationSource<S: Storage> {
    registry: LoopRegistry<S>,
    origin_id: String,
}

impl<S: Storage> IterationSource<S> {
    /// Create a source with a freshly generated identity.
    pub fn new(registry: LoopRegistry<S>) -> Self {
        Self {
            registry,
            origin_id: generate_origin_id(),
        }
    }

    /// Use a host-provided identity, such as the graph node id.
    pub fn with_origin(mut self, origin_id: impl Into<String>) -> Self {
        self.origin_id = origin_id.into();
        self
    }

    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }

    /// Serve the combination the control payload asks for.
    ///
    /// Never fails: an unreadable control payload starts a new loop.
    pub fn execute(&self, inputs: &[Value], control: &str) -> SourceOutput {
        let control = ControlPayload::parse(control).unwrap_or_else(|e| {
            warn!("Could not parse iteration control {:?}: {}; starting a new loop", control, e);
            ControlPayload::default()
        });

        let (mut session, target_index) = match self.existing_session(&control) {
            Some(session) => (session, control.target_index),
            None => {
                let sequences = normalize_inputs(inputs);
                if sequences.is_empty() {
                    debug!("No input sequences; nothing to iterate");
                    return SourceOutput {
                        item: None,
                        context: IterationContext::new(NO_LOOP_ID, 0, 0, true, self.origin_id.clone()),
                    };
                }
                // A stale target index from an unknown loop never applies here.
                (self.start_loop(&sequences), 0)
            }
        };

        let total = session.total();
        let item = if total == 0 {
            debug!("Loop {}: no combinations to iterate", session.loop_id);
            None
        } else if let Some(item) = session.serve(target_index) {
            debug!("Loop {}: iteration {}/{}", session.loop_id, target_index + 1, total);
            if let Err(e) = self.registry.loops().update(&session) {
                warn!("Loop {}: failed to record served index: {}", session.loop_id, e);
            }
            Some(item)
        } else {
            let past_end = IterloopError::IndexOutOfRange {
                index: target_index,
                total,
            };
            debug!("Loop {}: {}; all iterations served", session.loop_id, past_end);
            None
        };

        let is_finished = item.is_none();
        SourceOutput {
            item,
            context: IterationContext::new(session.loop_id, target_index, total, is_finished, session.origin_id),
        }
    }

    fn existing_session(&self, control: &ControlPayload) -> Option<LoopSession> {
        let loop_id = control.loop_id.as_deref().filter(|id| !id.is_empty())?;
        match self.registry.loops().get(loop_id) {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                debug!("Loop {} is not active; starting a new loop", loop_id);
                None
            }
            Err(e) => {
                warn!("Failed to load loop {}: {}; starting a new loop", loop_id, e);
                None
            }
        }
    }

    fn start_loop(&self, sequences: &[Vec<Value>]) -> LoopSession {
        let session = LoopSession::new(generate_loop_id(), cartesian_product(sequences), self.origin_id.clone());
        if let Err(e) = self.registry.loops().create(&session) {
            warn!("Loop {}: failed to store session: {}", session.loop_id, e);
        }
        info!(
            "New loop started. ID: {}, combinations: {}",
            session.loop_id,
            session.total()
        );
        session
    }
}
