use crate::domain::{DatabaseConfig, InstallPoint, InteropConfig, Personalisation, SmsConfig};
use crate::error::{DeliveryError, Result};
use async_trait::async_trait;

/// A source of configuration bundles. One implementation per deployment mode.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn sms_config(&self) -> Result<SmsConfig>;
    async fn assets_bucket(&self) -> Result<String>;
    async fn database_config(&self) -> Result<DatabaseConfig>;
    async fn interop_config(&self) -> Result<InteropConfig>;
}

/// Plain string values, looked up by full name.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// Secret strings, looked up by full id.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_string(&self, id: &str) -> Result<String>;
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_sms(
        &self,
        template_id: &str,
        recipient: &str,
        personalisation: &Personalisation,
        sender_id: &str,
    ) -> std::result::Result<(), DeliveryError>;
}

/// Builds a gateway once the batch's API key is known.
pub trait GatewayFactory: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Box<dyn NotificationGateway>>;
}

#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn send_message(&self, queue_url: &str, body: &str, delay_seconds: u32) -> Result<()>;
}

#[async_trait]
pub trait MetricsRecorder: Send + Sync {
    /// Upsert today's counter for `(event, platform, version)` by one.
    async fn increment(&self, event: &str, platform: &str, version: &str) -> Result<()>;
}

#[async_trait]
pub trait InstallSource: Send + Sync {
    /// One point per registration day, ascending, with a running total.
    async fn cumulative_installs(&self) -> Result<Vec<InstallPoint>>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Overwrite `key` with a private object.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}
