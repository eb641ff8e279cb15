//! AWS-backed adapters: SSM parameters, Secrets Manager secrets, the SQS
//! retry queue and the S3 stats bucket. Each wraps a client built once from
//! the shared SDK config.

use crate::app::ports::{BlobStore, ParameterStore, QueuePublisher, SecretStore};
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::debug;

pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        debug!(name, "Fetching parameter");
        let output = self
            .client
            .get_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                NotifyError::Config(format!(
                    "Failed to fetch parameter {name}: {}",
                    aws_sdk_ssm::error::DisplayErrorContext(&e)
                ))
            })?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| NotifyError::Config(format!("Parameter {name} has no value")))
    }
}

pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret_string(&self, id: &str) -> Result<String> {
        debug!(id, "Fetching secret");
        let output = self
            .client
            .get_secret_value()
            .secret_id(id)
            .send()
            .await
            .map_err(|e| {
                NotifyError::Config(format!(
                    "Failed to fetch secret {id}: {}",
                    aws_sdk_secretsmanager::error::DisplayErrorContext(&e)
                ))
            })?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| NotifyError::Config(format!("Secret {id} has no string value")))
    }
}

pub struct SqsQueuePublisher {
    client: aws_sdk_sqs::Client,
}

impl SqsQueuePublisher {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(config),
        }
    }
}

#[async_trait]
impl QueuePublisher for SqsQueuePublisher {
    async fn send_message(&self, queue_url: &str, body: &str, delay_seconds: u32) -> Result<()> {
        let delay = i32::try_from(delay_seconds)
            .map_err(|_| NotifyError::Queue(format!("Delay of {delay_seconds}s is out of range")))?;

        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .delay_seconds(delay)
            .send()
            .await
            .map_err(|e| {
                NotifyError::Queue(format!(
                    "Failed to publish to {queue_url}: {}",
                    aws_sdk_sqs::error::DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}

pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                NotifyError::Storage(format!(
                    "Failed to write s3://{bucket}/{key}: {}",
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        debug!(bucket, key, size, "Wrote object");
        Ok(())
    }
}
