//! IterationSink: collects one result per evaluation and decides what's next.
//!
//! Per loop id the sink moves through
//! `no session -> collecting -> (complete | aborted)`. It keeps collecting and
//! asking for resubmission while the source is not finished. Once the source
//! reports finished, the sink hands back the results and releases both
//! sessions of the loop, whether or not every slot was filled.

use log::{debug, info, warn};
use serde_json::Value;

use crate::domain::{ControlPayload, IterationContext, LoopStatus, RecordOutcome, ResultSession, SinkOutput};
use crate::error::{IterloopError, Result};
use crate::id::NO_LOOP_ID;
use crate::registry::LoopRegistry;
use crate::resubmit::{ResubmitRequest, Resubmitter};
use crate::storage::Storage;

/// Loop tail node
#[derive(Debug)]
pub struct IterationSink<S: Storage, R: Resubmitter> {
    registry: LoopRegistry<S>,
    resubmitter: R,
}

impl<S: Storage, R: Resubmitter> IterationSink<S, R> {
    pub fn new(registry: LoopRegistry<S>, resubmitter: R) -> Self {
        Self { registry, resubmitter }
    }

    /// Record `iteration_result` for the iteration described by `context`.
    ///
    /// `node_id` identifies this node in the host graph and is passed along
    /// with any resubmission request. Never fails: unusable contexts produce
    /// an empty finished output.
    pub fn execute(&self, iteration_result: Value, context: &str, node_id: &str) -> SinkOutput {
        let ctx = match IterationContext::parse(context) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Could not parse loop context {:?}: {}", context, e);
                return SinkOutput::empty();
            }
        };

        let (loop_id, index) = match ctx.identity() {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Rejecting loop context: {}", e);
                return SinkOutput::empty();
            }
        };

        if loop_id == NO_LOOP_ID && ctx.total_iterations == 0 {
            debug!("Source had nothing to iterate");
            return SinkOutput::empty();
        }

        let (mut session, is_new) = match self.open_results(loop_id, index, &ctx) {
            Ok(opened) => opened,
            Err(e @ IterloopError::InvalidContext(_)) => {
                warn!("Loop {}: rejecting loop context: {}", loop_id, e);
                return SinkOutput::empty();
            }
            Err(e) => {
                warn!("Loop {}: failed to load results: {}; abandoning loop", loop_id, e);
                self.release(loop_id);
                return SinkOutput::empty();
            }
        };

        let mut changed = is_new;
        if !ctx.is_finished {
            match session.record(index, iteration_result) {
                RecordOutcome::Stored => {
                    changed = true;
                    debug!(
                        "Loop {}: collected result for index {} ({}/{})",
                        loop_id, index, session.received_count, session.total_expected
                    );
                }
                RecordOutcome::Duplicate => {
                    warn!("Loop {}: result for index {} already collected; ignoring", loop_id, index);
                }
                RecordOutcome::OutOfRange => {
                    warn!(
                        "Loop {}: index {} is outside {} expected results",
                        loop_id, index, session.total_expected
                    );
                }
            }
        }

        if ctx.is_finished {
            return self.finish(loop_id, session);
        }

        let Some(next_index) = index.checked_add(1) else {
            warn!("Loop {}: no iteration follows index {}; abandoning loop", loop_id, index);
            self.release(loop_id);
            return SinkOutput::empty();
        };

        if changed {
            let stored = if is_new {
                self.registry.results().create(&session)
            } else {
                self.registry.results().update(&session)
            };
            if let Err(e) = stored {
                warn!("Loop {}: failed to store results: {}", loop_id, e);
            }
        }

        let request = ResubmitRequest::new(
            node_id,
            ControlPayload::next(loop_id, next_index, ctx.origin_id.clone()),
        );
        debug!("Loop {}: requesting next iteration (target_index {})", loop_id, next_index);
        if let Err(e) = self.resubmitter.resubmit(&request) {
            warn!("Loop {}: resubmission failed: {}", loop_id, e);
        }
        SinkOutput::Continue(request)
    }

    /// Load the loop's result buffer, or size a new one from the context.
    ///
    /// A new buffer must agree with the source's session when there is one,
    /// and an unfinished context must point inside it.
    fn open_results(&self, loop_id: &str, index: usize, ctx: &IterationContext) -> Result<(ResultSession, bool)> {
        if let Some(session) = self.registry.results().get(loop_id)? {
            return Ok((session, false));
        }

        let total = ctx.total_iterations;
        if let Some(source) = self.registry.loops().get(loop_id)? {
            if source.total() != total {
                return Err(IterloopError::InvalidContext(format!(
                    "total_iterations {} does not match the loop's {} combinations",
                    total,
                    source.total()
                )));
            }
        }
        if !ctx.is_finished && index >= total {
            return Err(IterloopError::InvalidContext(format!(
                "index {} is outside {} iterations",
                index, total
            )));
        }

        Ok((ResultSession::new(loop_id, total)?, true))
    }

    fn finish(&self, loop_id: &str, session: ResultSession) -> SinkOutput {
        let status = if session.total_expected == 0 {
            LoopStatus::Empty
        } else if session.is_complete() {
            LoopStatus::Complete
        } else {
            LoopStatus::Aborted
        };

        match status {
            LoopStatus::Complete => info!(
                "Loop {}: all {} results collected. Loop complete.",
                loop_id, session.received_count
            ),
            LoopStatus::Aborted => warn!(
                "Loop {}: source finished with {}/{} results; returning partial results",
                loop_id, session.received_count, session.total_expected
            ),
            LoopStatus::Empty => info!("Loop {}: no iterations to collect. Loop complete.", loop_id),
        }

        self.release(loop_id);

        SinkOutput::Finished {
            results: session.collect(),
            status,
        }
    }

    fn release(&self, loop_id: &str) {
        if let Err(e) = self.registry.clear_loop(loop_id) {
            warn!("Loop {}: failed to release sessions: {}", loop_id, e);
        }
    }
}
