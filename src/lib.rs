//! Iterloop - cross-invocation loop iteration for node-graph executors
//!
//! A loop is a pair of nodes: an [`IterationSource`] that hands out one
//! combination of its inputs per evaluation, and an [`IterationSink`] that
//! collects the body's result and asks the host to evaluate the graph again
//! until every combination has been processed. Loop state lives in a
//! [`LoopRegistry`] so it survives between separate evaluations.

pub mod combinations;
pub mod domain;
pub mod error;
pub mod id;
pub mod nodes;
pub mod registry;
pub mod resubmit;
pub mod runner;
pub mod storage;

pub use domain::{ControlPayload, IterationContext, LoopStatus, SinkOutput};
pub use error::{IterloopError, Result};
pub use nodes::{IterationSink, IterationSource, SourceOutput};
pub use registry::LoopRegistry;
pub use resubmit::{ResubmitRequest, Resubmitter};
