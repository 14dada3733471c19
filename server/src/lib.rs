//! Daybook server: verified endpoints for the fan-out/fan-in summarization
//! pipeline.
//!
//! One GET trigger enumerates recent notes, diffs and useful URLs and fans
//! them out over the delivery provider's queue; each POST endpoint processes
//! one item and writes its partial result into the rendezvous store; the
//! final aggregation message assembles the daily digest.

pub mod aggregate;
pub mod app;
pub mod enumerate;
pub mod errors;
pub mod prompts;
pub mod routes;
pub mod telemetry;

pub use app::{AppState, create_router};
