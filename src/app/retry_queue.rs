use crate::app::ports::QueuePublisher;
use crate::domain::NotificationJob;
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Re-publishes failed jobs to the callback queue with a visibility delay.
///
/// No attempt count travels with the job, so a job that keeps failing is
/// retried for as long as it keeps coming back.
pub struct RetryQueue {
    publisher: Arc<dyn QueuePublisher>,
    queue_url: String,
}

impl RetryQueue {
    pub fn new(publisher: Arc<dyn QueuePublisher>, queue_url: impl Into<String>) -> Self {
        Self {
            publisher,
            queue_url: queue_url.into(),
        }
    }

    pub async fn schedule_retry(&self, job: &NotificationJob, delay_seconds: u32) -> Result<()> {
        let body = serde_json::to_string(job)?;
        self.publisher
            .send_message(&self.queue_url, &body, delay_seconds)
            .await?;

        debug!(job = %job.reference(), delay_seconds, "Job re-published");
        Ok(())
    }
}
