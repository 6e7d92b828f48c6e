//! Storage layer for iterloop.
//!
//! Session records survive between graph evaluations only through this layer.
//! `Storage` is the minimal repository interface; `MemoryStorage` keeps state
//! for the life of the process and `JsonlStorage` keeps it on disk.

#[cfg(test)]
pub(crate) mod faulty;
mod jsonl;
mod memory;
mod sessions;
mod traits;

pub use jsonl::JsonlStorage;
pub use memory::MemoryStorage;
pub use sessions::{LOOP_SESSIONS_COLLECTION, LoopSessionStore, RESULT_SESSIONS_COLLECTION, ResultSessionStore};
pub use traits::{HasId, Storage};
