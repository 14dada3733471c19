//! Partial-result store backends.
//!
//! The pipeline treats the store as a rendezvous buffer: summarizers write
//! one field each, the aggregator reads the whole hash back. `RedisStore` is
//! the production backend; `MemoryStore` backs tests and local runs.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::{RedisStore, RETENTION_SECONDS};
