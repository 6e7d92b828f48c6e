//! Loop runner implementation - drives a loop the way a host executor would.
//!
//! Each pass rebuilds both nodes from scratch and evaluates
//! source -> body -> sink, exactly like a fresh graph evaluation. The only
//! thing carried from one pass to the next is the control payload taken from
//! the sink's resubmission request.

use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::domain::SinkOutput;
use crate::error::{IterloopError, Result};
use crate::id::generate_origin_id;
use crate::nodes::{IterationSink, IterationSource};
use crate::registry::LoopRegistry;
use crate::resubmit::QueueResubmitter;
use crate::storage::Storage;

/// Configuration for the LoopRunner.
#[derive(Debug, Clone)]
pub struct LoopRunnerConfig {
    /// Give up after this many graph evaluations
    pub max_passes: usize,
    /// Identifier reported to the sink as its graph/node id
    pub graph_id: String,
}

impl Default for LoopRunnerConfig {
    fn default() -> Self {
        Self {
            max_passes: 10_000,
            graph_id: "iterloop-runner".to_string(),
        }
    }
}

/// What happened over a whole loop
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Terminal sink output
    pub output: SinkOutput,
    /// Graph evaluations performed
    pub passes: usize,
    /// Resubmissions requested by the sink
    pub resubmissions: usize,
    /// Loop id assigned by the source on the first pass
    pub loop_id: Option<String>,
}

/// In-process stand-in for the host executor.
pub struct LoopRunner<S: Storage> {
    registry: LoopRegistry<S>,
    config: LoopRunnerConfig,
}

impl<S: Storage> LoopRunner<S> {
    pub fn new(registry: LoopRegistry<S>) -> Self {
        Self {
            registry,
            config: LoopRunnerConfig::default(),
        }
    }

    pub fn with_config(registry: LoopRegistry<S>, config: LoopRunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Run `body` once per combination of `inputs` until the sink finishes.
    pub fn run<F>(&self, inputs: &[Value], mut body: F) -> Result<RunReport>
    where
        F: FnMut(&[Value]) -> Value,
    {
        let resubmitter = Arc::new(QueueResubmitter::new());
        let origin_id = generate_origin_id();
        let mut control = String::new();
        let mut loop_id: Option<String> = None;
        let mut passes = 0;
        let mut resubmissions = 0;

        loop {
            if passes >= self.config.max_passes {
                if let Some(id) = &loop_id {
                    self.registry.clear_loop(id)?;
                }
                return Err(IterloopError::PassLimitExceeded(self.config.max_passes));
            }
            passes += 1;

            let source = IterationSource::new(self.registry.clone()).with_origin(origin_id.as_str());
            let emitted = source.execute(inputs, &control);
            if loop_id.is_none() {
                loop_id = emitted.context.loop_id.clone();
            }

            let result = match &emitted.item {
                Some(item) => body(item),
                None => Value::Null,
            };

            let sink = IterationSink::new(self.registry.clone(), Arc::clone(&resubmitter));
            let output = sink.execute(result, &emitted.context_json(), &self.config.graph_id);
            if output.is_terminal() {
                info!(
                    "Loop {} finished after {} passes ({:?})",
                    loop_id.as_deref().unwrap_or("-"),
                    passes,
                    output.status()
                );
                return Ok(RunReport {
                    output,
                    passes,
                    resubmissions,
                    loop_id,
                });
            }

            let request = resubmitter
                .pop()?
                .ok_or_else(|| IterloopError::Resubmit("sink continued without a request".to_string()))?;
            resubmissions += 1;
            control = request.control_json();
            debug!("Pass {}: resubmitting with {}", passes, control);
        }
    }
}
