//! Integration with the QStash-compatible delivery provider.
//!
//! `Publisher` sends typed messages out (direct scheduled delivery or named
//! queues); `Receiver` gates every inbound message behind the rotating-key
//! signature check. Retry and ordering are the provider's concern, not ours.

mod publisher;
mod receiver;

pub use publisher::{DeliveryMethod, PublishOptions, Publisher, MAX_UNCOMPRESSED_BYTES};
pub use receiver::{sign, Receiver};
