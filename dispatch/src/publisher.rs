use std::io::Write;

use errors::{DigestError, DigestResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

/// Serialized payloads above this size are gzip-compressed and marked as
/// binary. Hard fallback for oversized note bodies, not a user option.
pub const MAX_UNCOMPRESSED_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl DeliveryMethod {
    fn as_str(self) -> &'static str {
        match self {
            DeliveryMethod::Get => "GET",
            DeliveryMethod::Put => "PUT",
            DeliveryMethod::Post => "POST",
            DeliveryMethod::Delete => "DELETE",
            DeliveryMethod::Patch => "PATCH",
        }
    }
}

/// Delivery options for one publish call.
///
/// `queue` routes through a named queue (FIFO-ish, provider-governed retry
/// and parallelism); the remaining knobs only apply to direct delivery.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub queue: Option<String>,
    pub queue_parallelism: Option<u32>,
    /// Relative defer in seconds.
    pub delay_seconds: Option<u64>,
    /// Absolute not-before time, unix seconds.
    pub not_before: Option<i64>,
    /// Overrides the HTTP verb the provider forwards with (default POST).
    pub method: Option<DeliveryMethod>,
}

impl PublishOptions {
    pub fn queue(name: &str) -> Self {
        Self {
            queue: Some(name.to_string()),
            ..Self::default()
        }
    }
}

pub struct Publisher {
    client: Client,
    base_url: String,
    token: String,
    site_url: String,
}

impl Publisher {
    pub fn new(base_url: &str, token: &str, site_url: &str) -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(DigestError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            site_url: site_url.to_string(),
        })
    }

    /// Publish one message to `route` on this service, via the delivery
    /// provider. Returns once the provider acknowledges; any non-success
    /// response is `DispatchFailed` and retrying is the caller's decision.
    pub async fn publish<T: Serialize>(
        &self,
        route: &str,
        message: &T,
        options: &PublishOptions,
    ) -> DigestResult<()> {
        let destination = format!("{}{}", self.site_url, route);
        let serialized = serde_json::to_vec(message)?;
        let (payload, compressed) = encode_payload(serialized);

        let url = if let Some(queue) = &options.queue {
            if let Some(parallelism) = options.queue_parallelism {
                self.upsert_queue(queue, parallelism).await?;
            }
            format!("{}/v2/enqueue/{}/{}", self.base_url, queue, destination)
        } else {
            format!("{}/v2/publish/{}", self.base_url, destination)
        };
        debug!(url = %url, bytes = payload.len(), compressed, "dispatching message");

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token));

        request = if compressed {
            request
                .header("Content-Type", "application/octet-stream")
                .header("Content-Encoding", "gzip")
        } else {
            request.header("Content-Type", "application/json")
        };

        // Delivery knobs are mutually exclusive with the queue path: the
        // queue's own ordering governs when and how a queued message runs.
        if options.queue.is_none() {
            if let Some(delay) = options.delay_seconds {
                request = request.header("Upstash-Delay", format!("{delay}s"));
            }
            if let Some(not_before) = options.not_before {
                request = request.header("Upstash-Not-Before", not_before.to_string());
            }
            if let Some(method) = options.method {
                request = request.header("Upstash-Method", method.as_str());
            }
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::DispatchFailed {
                status: status.as_u16(),
                message,
            });
        }

        info!(route = %route, "message dispatched");
        Ok(())
    }

    async fn upsert_queue(&self, queue: &str, parallelism: u32) -> DigestResult<()> {
        let response = self
            .client
            .post(format!("{}/v2/queues/", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&json!({ "queueName": queue, "parallelism": parallelism }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::TOO_MANY_REQUESTS => Err(DigestError::DispatchFailed {
                status: 429,
                message: "queue upsert rate limited".to_string(),
            }),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(DigestError::DispatchFailed {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Gzip the serialized message when it crosses the size threshold.
/// Returns the bytes to send and whether they are compressed.
fn encode_payload(serialized: Vec<u8>) -> (Vec<u8>, bool) {
    if serialized.len() <= MAX_UNCOMPRESSED_BYTES {
        return (serialized, false);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // Writing to a Vec cannot fail.
    encoder.write_all(&serialized).expect("gzip into Vec");
    (encoder.finish().expect("gzip into Vec"), true)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn small_payload_not_compressed() {
        let (payload, compressed) = encode_payload(b"{\"a\":1}".to_vec());
        assert!(!compressed);
        assert_eq!(payload, b"{\"a\":1}");
    }

    #[test]
    fn large_payload_round_trips_through_gzip() {
        let original = serde_json::to_vec(&serde_json::json!({
            "note": "x".repeat(MAX_UNCOMPRESSED_BYTES + 1),
        }))
        .unwrap();
        let (payload, compressed) = encode_payload(original.clone());
        assert!(compressed);
        assert!(payload.len() < original.len());

        let mut decoder = flate2::read::GzDecoder::new(payload.as_slice());
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn threshold_is_exclusive() {
        let (_, compressed) = encode_payload(vec![b'x'; MAX_UNCOMPRESSED_BYTES]);
        assert!(!compressed);
        let (_, compressed) = encode_payload(vec![b'x'; MAX_UNCOMPRESSED_BYTES + 1]);
        assert!(compressed);
    }
}
