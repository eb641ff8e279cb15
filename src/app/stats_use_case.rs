use crate::app::ports::{BlobStore, InstallSource};
use crate::domain::StatsSnapshot;
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub const STATS_CONTENT_TYPE: &str = "application/json";

/// Rebuilds the install statistics and overwrites the published snapshot.
pub struct StatsAggregator {
    installs: Arc<dyn InstallSource>,
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    key: String,
}

impl StatsAggregator {
    pub fn new(
        installs: Arc<dyn InstallSource>,
        blobs: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            installs,
            blobs,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub async fn snapshot(&self) -> Result<StatsSnapshot> {
        let installs = self.installs.cumulative_installs().await?;
        Ok(StatsSnapshot {
            generated_at: Utc::now(),
            installs,
        })
    }

    /// Returns the JSON that was written.
    pub async fn compute_and_publish(&self) -> Result<String> {
        let snapshot = self.snapshot().await?;
        let body = serde_json::to_string(&snapshot)?;

        self.blobs
            .put_object(&self.bucket, &self.key, body.clone().into_bytes(), STATS_CONTENT_TYPE)
            .await?;

        crate::metrics::stats::published(snapshot.installs.len());
        info!(
            bucket = %self.bucket,
            key = %self.key,
            days = snapshot.installs.len(),
            "Published install stats"
        );
        Ok(body)
    }
}
