//! Core types and traits for the daybook summarization pipeline.
//!
//! Everything the handlers exchange over the wire or consume from external
//! collaborators is defined here, so service crates depend on interfaces
//! rather than on each other.

pub mod traits;
pub mod types;
