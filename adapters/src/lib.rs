//! Clients for the pipeline's external collaborators.
//!
//! Each client implements one `dn_core` trait and owns its `reqwest` handle;
//! base URLs are injectable so every client can run against a mock server.

pub mod ai;
pub mod calendar;
pub mod github;
pub mod scrape;
