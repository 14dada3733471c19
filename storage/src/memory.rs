use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dn_core::traits::PartialResultStore;
use errors::DigestResult;
use tokio::sync::RwLock;

/// In-memory store keeping insertion order per key. No TTL: tests assert
/// rendezvous semantics, not expiry.
#[derive(Default, Clone)]
pub struct MemoryStore {
    hashes: Arc<RwLock<HashMap<String, Vec<(String, String)>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PartialResultStore for MemoryStore {
    async fn write_field(&self, key: &str, field: &str, value: &str) -> DigestResult<()> {
        let mut hashes = self.hashes.write().await;
        let entries = hashes.entry(key.to_string()).or_default();
        if let Some(existing) = entries.iter_mut().find(|(f, _)| f == field) {
            existing.1 = value.to_string();
        } else {
            entries.push((field.to_string(), value.to_string()));
        }
        Ok(())
    }

    async fn read_all(&self, key: &str) -> DigestResult<Vec<(String, String)>> {
        let hashes = self.hashes.read().await;
        Ok(hashes.get(key).cloned().unwrap_or_default())
    }
}
