//! The two loop nodes placed in a host graph.
//!
//! `IterationSource` sits at the head of the loop body, `IterationSink` at its
//! tail. They talk through the context text the source emits and through the
//! shared `LoopRegistry`.

pub mod sink;
pub mod source;

pub use sink::IterationSink;
pub use source::{IterationSource, SourceOutput};
