use anyhow::Result;
use async_trait::async_trait;
use notify_handlers::app::config_resolver::{ConfigResolver, EnvConfigProvider};
use notify_handlers::app::ports::{BlobStore, GatewayFactory, NotificationGateway, QueuePublisher};
use notify_handlers::config::Settings;
use notify_handlers::db::DatabaseManager;
use notify_handlers::domain::{DatabaseConfig, Personalisation, QueueEvent};
use notify_handlers::error::DeliveryError;
use notify_handlers::handlers::Handlers;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::Mutex;

struct FlakyGateway {
    fail_codes: Vec<String>,
}

#[async_trait]
impl NotificationGateway for FlakyGateway {
    async fn send_sms(
        &self,
        _template_id: &str,
        _recipient: &str,
        personalisation: &Personalisation,
        _sender_id: &str,
    ) -> std::result::Result<(), DeliveryError> {
        if self.fail_codes.contains(&personalisation.code) {
            return Err(DeliveryError::Rejected {
                status: 429,
                body: "rate limited".to_string(),
            });
        }
        Ok(())
    }
}

struct FlakyGatewayFactory {
    fail_codes: Vec<String>,
}

impl GatewayFactory for FlakyGatewayFactory {
    fn connect(&self, _api_key: &str) -> notify_handlers::error::Result<Box<dyn NotificationGateway>> {
        Ok(Box::new(FlakyGateway {
            fail_codes: self.fail_codes.clone(),
        }))
    }
}

#[derive(Default)]
struct RecordingQueue {
    messages: Mutex<Vec<(String, String, u32)>>,
}

#[async_trait]
impl QueuePublisher for RecordingQueue {
    async fn send_message(
        &self,
        queue_url: &str,
        body: &str,
        delay_seconds: u32,
    ) -> notify_handlers::error::Result<()> {
        self.messages
            .lock()
            .await
            .push((queue_url.to_string(), body.to_string(), delay_seconds));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryBucket {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

#[async_trait]
impl BlobStore for MemoryBucket {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> notify_handlers::error::Result<()> {
        self.objects
            .lock()
            .await
            .insert(format!("{bucket}/{key}"), (body, content_type.to_string()));
        Ok(())
    }
}

async fn prepare_db(path: &Path) -> Result<DatabaseManager> {
    let db = DatabaseManager::connect(&DatabaseConfig {
        url: path.to_string_lossy().to_string(),
        auth_token: String::new(),
    })
    .await?;
    db.run_migrations().await?;
    Ok(db)
}

fn handlers_for(
    db_path: &Path,
    fail_codes: &[&str],
    queue: Arc<RecordingQueue>,
    bucket: Arc<MemoryBucket>,
) -> Handlers {
    let env = EnvConfigProvider::from_vars([
        ("SMS_API_KEY".to_string(), "key".to_string()),
        ("CALLBACK_QUEUE_URL".to_string(), "https://sqs.test/callback".to_string()),
        ("SMS_SENDER".to_string(), "sender".to_string()),
        ("SMS_TEMPLATE".to_string(), "template".to_string()),
        ("ASSETS_BUCKET".to_string(), "assets".to_string()),
        ("LIBSQL_URL".to_string(), db_path.to_string_lossy().to_string()),
    ]);

    Handlers::new(
        Settings::default(),
        ConfigResolver::new(Arc::new(env)),
        Arc::new(FlakyGatewayFactory {
            fail_codes: fail_codes.iter().map(|c| c.to_string()).collect(),
        }),
        queue,
        bucket,
    )
}

#[tokio::test]
async fn test_sms_handler_counts_sends_and_requeues_failures() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("notify.db");
    let db = prepare_db(&db_path).await?;

    let queue = Arc::new(RecordingQueue::default());
    let handlers = handlers_for(&db_path, &["FAIL01"], queue.clone(), Arc::new(MemoryBucket::default()));

    let failed_job = json!({
        "code": "FAIL01",
        "mobile": "+353851111111",
        "onsetDate": "2020-10-01",
        "testDate": "2020-10-03T00:00:00.000Z",
        "jobId": "job-2"
    });
    let event: QueueEvent = serde_json::from_value(json!({
        "Records": [
            {"body": json!({
                "code": "OK0001",
                "mobile": "+353850000000",
                "onsetDate": "2020-10-01",
                "testDate": "2020-10-03",
                "jobId": "job-1"
            }).to_string()},
            {"body": failed_job.to_string()},
        ]
    }))?;

    assert!(handlers.handle_sms(&event).await?);

    let today = chrono::Utc::now().date_naive();
    assert_eq!(db.metric_value(today, "SMS_SENT", "lambda", "").await?, Some(1));

    let messages = queue.messages.lock().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "https://sqs.test/callback");
    assert_eq!(serde_json::from_str::<Value>(&messages[0].1)?, failed_job);
    assert_eq!(messages[0].2, 30);

    Ok(())
}

#[tokio::test]
async fn test_sms_handler_accepts_empty_event() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("notify.db");
    prepare_db(&db_path).await?;

    let handlers = handlers_for(
        &db_path,
        &[],
        Arc::new(RecordingQueue::default()),
        Arc::new(MemoryBucket::default()),
    );
    let event: QueueEvent = serde_json::from_str("{}")?;

    assert!(handlers.handle_sms(&event).await?);
    Ok(())
}

#[tokio::test]
async fn test_stats_handler_publishes_cumulative_installs() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("notify.db");
    let db = prepare_db(&db_path).await?;
    for ts in [
        "2020-10-04 09:00:00",
        "2020-10-04 10:00:00",
        "2020-10-04 11:00:00",
        "2020-10-05 09:00:00",
        "2020-10-05 23:00:00",
    ] {
        db.connection()
            .execute("INSERT INTO registrations (created_at) VALUES (?1)", libsql::params![ts])
            .await?;
    }

    let bucket = Arc::new(MemoryBucket::default());
    let handlers = handlers_for(&db_path, &[], Arc::new(RecordingQueue::default()), bucket.clone());

    let returned = handlers.handle_stats().await?;

    let objects = bucket.objects.lock().await;
    let (body, content_type) = &objects["assets/stats.json"];
    assert_eq!(content_type, "application/json");
    assert_eq!(body, returned.as_bytes());

    let value: Value = serde_json::from_slice(body)?;
    assert_eq!(value["installs"], json!([["2020-10-04", 3], ["2020-10-05", 5]]));
    assert!(value["generatedAt"].is_string());

    Ok(())
}
