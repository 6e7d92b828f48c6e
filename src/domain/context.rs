//! Payloads threaded through one graph evaluation
//!
//! `ControlPayload` is what the host substitutes into the source's control
//! input on resubmission. `IterationContext` is what the source hands to the
//! loop body and on to the sink. Both travel as JSON text.

use serde::{Deserialize, Serialize};

use crate::error::{IterloopError, Result};

/// Control input of the source: which loop to continue and where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPayload {
    /// Loop to continue (None starts a new loop)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_id: Option<String>,
    /// Combination index to serve next
    pub target_index: usize,
    /// Source node that created the loop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
}

impl ControlPayload {
    /// Build the payload that asks a source to serve `target_index` of `loop_id`.
    pub fn next(loop_id: impl Into<String>, target_index: usize, origin_id: Option<String>) -> Self {
        Self {
            loop_id: Some(loop_id.into()),
            target_index,
            origin_id,
        }
    }

    /// Parse control text. Blank text is the default (new loop) payload.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| IterloopError::ControlParse(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Loop identity, position and completion status for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationContext {
    #[serde(default)]
    pub loop_id: Option<String>,
    /// Index just served (None if the sender never set one)
    #[serde(default)]
    pub current_index: Option<usize>,
    #[serde(default)]
    pub total_iterations: usize,
    /// Treated as finished when absent
    #[serde(default = "default_finished")]
    pub is_finished: bool,
    #[serde(default)]
    pub origin_id: Option<String>,
}

fn default_finished() -> bool {
    true
}

impl IterationContext {
    pub fn new(
        loop_id: impl Into<String>,
        current_index: usize,
        total_iterations: usize,
        is_finished: bool,
        origin_id: impl Into<String>,
    ) -> Self {
        Self {
            loop_id: Some(loop_id.into()),
            current_index: Some(current_index),
            total_iterations,
            is_finished,
            origin_id: Some(origin_id.into()),
        }
    }

    /// Parse context text produced by a source.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| IterloopError::ControlParse(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Loop id and index, or `InvalidContext` if either is missing.
    pub fn identity(&self) -> Result<(&str, usize)> {
        let loop_id = self
            .loop_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IterloopError::InvalidContext("missing loop_id".to_string()))?;
        let index = self
            .current_index
            .ok_or_else(|| IterloopError::InvalidContext("missing current_index".to_string()))?;
        Ok((loop_id, index))
    }
}
