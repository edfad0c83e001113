//! Shared components between unit tests: an in-memory coordinator with
//! real one-shot watch and session semantics, plus cluster fixtures.
mod fixtures;
mod memory;

pub use fixtures::*;
pub use memory::*;
