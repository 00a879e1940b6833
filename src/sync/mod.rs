//! Remote sync sink - best-effort append of step totals to a document store

use std::time::Duration;
use anyhow::{bail, Result};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Sync sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Enable remote appends
    pub enabled: bool,

    /// Base URL of the document store
    pub endpoint: String,

    /// Logical collection records are appended to
    pub collection: String,

    /// Identifier stamped on every record
    pub user_id: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:8765".to_string(),
            collection: "stepCounts".to_string(),
            user_id: "user123".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Telemetry document appended on every accepted increment.
///
/// Carries the running total at the time of the increment, not the raw
/// delta. Append-only and not authoritative - the local counter store is
/// the durability source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub record_id: Uuid,
    pub user_id: String,
    pub steps: u64,
    pub timestamp_millis: i64,
}

impl SyncRecord {
    pub fn new(user_id: &str, steps: u64) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            steps,
            timestamp_millis: Utc::now().timestamp_millis(),
        }
    }
}

/// Append-only client for the remote document collection
pub struct RemoteSink {
    client: Client,
    enabled: bool,
    endpoint: String,
    collection: String,
    user_id: String,
}

impl RemoteSink {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            enabled: config.enabled,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            user_id: config.user_id.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.collection)
    }

    /// Append one record, awaiting the result
    pub async fn append(&self, record: &SyncRecord) -> Result<()> {
        Self::post(self.client.clone(), self.collection_url(), record.clone()).await
    }

    /// Fire-and-forget append of the current total.
    ///
    /// The write is spawned; its error is logged and then discarded.
    /// There is no retry queue and no dead-letter path - a failed record
    /// is gone for good.
    pub fn dispatch(&self, steps: u64) {
        if !self.enabled {
            return;
        }

        let record = SyncRecord::new(&self.user_id, steps);
        let client = self.client.clone();
        let url = self.collection_url();

        tokio::spawn(async move {
            let steps = record.steps;
            if let Err(e) = Self::post(client, url, record).await {
                warn!("Failed to append step record ({} steps): {}", steps, e);
            }
        });
    }

    async fn post(client: Client, url: String, record: SyncRecord) -> Result<()> {
        let response = client.post(&url).json(&record).send().await?;

        if !response.status().is_success() {
            bail!("sink returned HTTP {}", response.status());
        }

        debug!("Step record appended: {} steps", record.steps);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn sink_for(server: &mockito::ServerGuard, enabled: bool) -> RemoteSink {
        RemoteSink::new(&SyncConfig {
            enabled,
            endpoint: server.url(),
            ..SyncConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_append_posts_one_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stepCounts")
            .match_body(Matcher::PartialJson(json!({
                "user_id": "user123",
                "steps": 42,
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let sink = sink_for(&server, true);
        sink.append(&SyncRecord::new("user123", 42)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_append_surfaces_http_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/stepCounts")
            .with_status(500)
            .create_async()
            .await;

        let sink = sink_for(&server, true);
        let result = sink.append(&SyncRecord::new("user123", 1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_appends_in_the_background() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stepCounts")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let sink = sink_for(&server, true);
        sink.dispatch(7);

        tokio::time::sleep(Duration::from_millis(300)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dispatch_swallows_sink_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stepCounts")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let sink = sink_for(&server, true);
        sink.dispatch(7);

        // The record is dropped; nothing retries
        tokio::time::sleep(Duration::from_millis(300)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_disabled_sink_dispatches_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stepCounts")
            .expect(0)
            .create_async()
            .await;

        let sink = sink_for(&server, false);
        sink.dispatch(7);

        tokio::time::sleep(Duration::from_millis(200)).await;
        mock.assert_async().await;
    }

    #[test]
    fn test_records_get_distinct_ids() {
        let a = SyncRecord::new("user123", 1);
        let b = SyncRecord::new("user123", 1);
        assert_ne!(a.record_id, b.record_id);
    }
}
