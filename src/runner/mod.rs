//! Loop runner module - drives a loop in-process.
//!
//! Hosts normally own the evaluate/resubmit cycle. This module provides:
//! - LoopRunner for driving one loop from first pass to terminal output
//! - RunReport for what happened along the way

mod loop_runner;

pub use loop_runner::{LoopRunner, LoopRunnerConfig, RunReport};
