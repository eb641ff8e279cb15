//! Entry points for the two invocations: a queue batch of SMS jobs and a
//! scheduled stats rebuild. Clients are built once and shared; each
//! invocation opens and drops its own database connection.

use crate::app::config_resolver::{ConfigResolver, EnvConfigProvider, RemoteConfigProvider};
use crate::app::ports::{BlobStore, GatewayFactory, QueuePublisher};
use crate::app::sms_use_case::SmsDispatcher;
use crate::app::stats_use_case::StatsAggregator;
use crate::config::{DeploymentMode, Settings};
use crate::db::DatabaseManager;
use crate::domain::QueueEvent;
use crate::error::Result;
use crate::infra::aws_stores::{S3BlobStore, SecretsManagerStore, SqsQueuePublisher, SsmParameterStore};
use crate::infra::notify_client::NotifyGatewayFactory;
use aws_config::BehaviorVersion;
use std::sync::Arc;
use tracing::info;

pub struct Handlers {
    settings: Settings,
    resolver: ConfigResolver,
    gateways: Arc<dyn GatewayFactory>,
    publisher: Arc<dyn QueuePublisher>,
    blobs: Arc<dyn BlobStore>,
}

impl Handlers {
    pub fn new(
        settings: Settings,
        resolver: ConfigResolver,
        gateways: Arc<dyn GatewayFactory>,
        publisher: Arc<dyn QueuePublisher>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            settings,
            resolver,
            gateways,
            publisher,
            blobs,
        }
    }

    /// Wire the production adapters. The deployment mode decides whether
    /// configuration comes from the environment or from SSM and Secrets
    /// Manager under `CONFIG_VAR_PREFIX`.
    pub async fn from_env(settings: Settings) -> Result<Self> {
        let aws = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mode = DeploymentMode::from_env();
        let prefix = mode.config_prefix()?;
        info!(?mode, "Loaded AWS configuration");

        let resolver = ConfigResolver::select(mode, EnvConfigProvider::from_env(), || {
            RemoteConfigProvider::new(
                prefix,
                Arc::new(SsmParameterStore::new(&aws)),
                Arc::new(SecretsManagerStore::new(&aws)),
            )
        });

        let gateways = Arc::new(NotifyGatewayFactory::new(
            reqwest::Client::new(),
            settings.notify_base_url.clone(),
        ));

        Ok(Self::new(
            settings,
            resolver,
            gateways,
            Arc::new(SqsQueuePublisher::new(&aws)),
            Arc::new(S3BlobStore::new(&aws)),
        ))
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub async fn connect_database(&self) -> Result<DatabaseManager> {
        DatabaseManager::connect(&self.resolver.database().await?).await
    }

    /// Always `true` once the loop completes; requeued jobs are not
    /// failures of the invocation.
    pub async fn handle_sms(&self, event: &QueueEvent) -> Result<bool> {
        let db = Arc::new(self.connect_database().await?);

        let dispatcher = SmsDispatcher::new(
            self.resolver.clone(),
            self.gateways.clone(),
            db,
            self.publisher.clone(),
        )
        .with_retry_delay(self.settings.retry_delay_secs)
        .with_metric_platform(self.settings.sms_metric_platform.clone());

        let outcome = dispatcher.dispatch(&event.records).await?;
        info!(
            sent = outcome.sent,
            requeued = outcome.requeued,
            skipped = outcome.skipped,
            "SMS batch complete"
        );
        Ok(true)
    }

    pub async fn handle_stats(&self) -> Result<String> {
        let db = Arc::new(self.connect_database().await?);
        let bucket = self.resolver.assets_bucket().await?;

        let aggregator = StatsAggregator::new(db, self.blobs.clone(), bucket, self.settings.stats_key.clone());
        aggregator.compute_and_publish().await
    }
}
