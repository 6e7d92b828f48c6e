//! Domain types for iterloop
//!
//! - IterationContext / ControlPayload: the JSON payloads passed between nodes
//! - LoopSession / ResultSession: per-loop state kept between evaluations
//! - SinkOutput / LoopStatus: what the sink hands back to the host

pub mod context;
pub mod outcome;
pub mod session;

pub use context::{ControlPayload, IterationContext};
pub use outcome::{LoopStatus, SinkOutput};
pub use session::{LoopSession, RecordOutcome, ResultSession, Slot};
