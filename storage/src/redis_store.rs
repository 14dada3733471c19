use async_trait::async_trait;
use dn_core::traits::PartialResultStore;
use errors::{DigestError, DigestResult};
use redis::AsyncCommands;
use tracing::debug;

/// Retention window for rendezvous hashes. Results older than this are
/// silently gone, which is the accepted failure mode when aggregation runs
/// late.
pub const RETENTION_SECONDS: i64 = 86_400;

pub struct RedisStore {
    connection_manager: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn new(connection_string: &str) -> DigestResult<Self> {
        let client =
            redis::Client::open(connection_string).map_err(|e| DigestError::Storage {
                backend: "Redis".to_string(),
                reason: e.to_string(),
            })?;

        let connection_manager =
            client
                .get_connection_manager()
                .await
                .map_err(|e| DigestError::Storage {
                    backend: "Redis".to_string(),
                    reason: e.to_string(),
                })?;

        Ok(Self { connection_manager })
    }
}

#[async_trait]
impl PartialResultStore for RedisStore {
    async fn write_field(&self, key: &str, field: &str, value: &str) -> DigestResult<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.hset(key, field, value).await?;
        // TTL is refreshed on every write so the rendezvous window stays
        // alive as long as items keep arriving.
        let _: () = conn.expire(key, RETENTION_SECONDS).await?;
        debug!(key = %key, field = %field, "wrote partial result");
        Ok(())
    }

    async fn read_all(&self, key: &str) -> DigestResult<Vec<(String, String)>> {
        let mut conn = self.connection_manager.clone();
        let entries: Vec<(String, String)> = conn.hgetall(key).await?;
        Ok(entries)
    }
}
