use crate::app::config_resolver::ConfigResolver;
use crate::app::ports::{GatewayFactory, MetricsRecorder, NotificationGateway, QueuePublisher};
use crate::app::retry_queue::RetryQueue;
use crate::domain::{NotificationJob, Personalisation, QueueRecord, SmsConfig, SMS_SENT_EVENT};
use crate::error::{DeliveryError, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Terminal state of one job within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Sent,
    Requeued,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub sent: usize,
    pub requeued: usize,
    pub skipped: usize,
}

/// Sends a batch of notification jobs one at a time, falling back to the
/// retry queue for any job the provider does not accept.
pub struct SmsDispatcher {
    resolver: ConfigResolver,
    gateways: Arc<dyn GatewayFactory>,
    metrics: Arc<dyn MetricsRecorder>,
    publisher: Arc<dyn QueuePublisher>,
    retry_delay_secs: u32,
    metric_platform: String,
}

impl SmsDispatcher {
    pub fn new(
        resolver: ConfigResolver,
        gateways: Arc<dyn GatewayFactory>,
        metrics: Arc<dyn MetricsRecorder>,
        publisher: Arc<dyn QueuePublisher>,
    ) -> Self {
        Self {
            resolver,
            gateways,
            metrics,
            publisher,
            retry_delay_secs: 30,
            metric_platform: "lambda".to_string(),
        }
    }

    pub fn with_retry_delay(mut self, seconds: u32) -> Self {
        self.retry_delay_secs = seconds;
        self
    }

    pub fn with_metric_platform(mut self, platform: impl Into<String>) -> Self {
        self.metric_platform = platform.into();
        self
    }

    /// Configuration is resolved once; a failure there aborts the whole
    /// batch before anything is sent.
    pub async fn dispatch(&self, records: &[QueueRecord]) -> Result<BatchOutcome> {
        let config = self.resolver.sms().await?;
        let gateway = self.gateways.connect(&config.api_key)?;
        let retry = RetryQueue::new(self.publisher.clone(), config.queue_url.clone());

        let mut outcome = BatchOutcome::default();
        for record in records {
            let job: NotificationJob = match serde_json::from_str(&record.body) {
                Ok(job) => job,
                Err(e) => {
                    warn!("Skipping unreadable notification record: {}", e);
                    crate::metrics::sms::skipped();
                    outcome.skipped += 1;
                    continue;
                }
            };

            match self.process(gateway.as_ref(), &retry, &config, &job).await? {
                JobOutcome::Sent => outcome.sent += 1,
                JobOutcome::Requeued => outcome.requeued += 1,
            }
        }

        Ok(outcome)
    }

    pub async fn process(
        &self,
        gateway: &dyn NotificationGateway,
        retry: &RetryQueue,
        config: &SmsConfig,
        job: &NotificationJob,
    ) -> Result<JobOutcome> {
        match self.send(gateway, config, job).await {
            Ok(()) => {
                self.metrics
                    .increment(SMS_SENT_EVENT, &self.metric_platform, "")
                    .await?;
                crate::metrics::sms::sent();

                if let Some(job_id) = job.job_id_label() {
                    info!("{} successfully sent", job_id);
                }
                Ok(JobOutcome::Sent)
            }
            Err(e) => {
                error!(job = %job.reference(), "SMS send failed: {}", e);
                info!("retrying {} in {} seconds", job.reference(), self.retry_delay_secs);

                retry.schedule_retry(job, self.retry_delay_secs).await?;
                crate::metrics::sms::requeued();
                Ok(JobOutcome::Requeued)
            }
        }
    }

    async fn send(
        &self,
        gateway: &dyn NotificationGateway,
        config: &SmsConfig,
        job: &NotificationJob,
    ) -> std::result::Result<(), DeliveryError> {
        let personalisation = Personalisation {
            code: job.code.clone(),
            date: job.test_date_label()?,
        };

        gateway
            .send_sms(&config.sms_template, &job.mobile, &personalisation, &config.sms_sender)
            .await
    }
}
