use crate::app::ports::{InstallSource, MetricsRecorder};
use crate::domain::{DatabaseConfig, InstallPoint};
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use libsql::{Builder, Connection, Database};
use tracing::{debug, info};

/// One database connection, opened at the start of an invocation and
/// dropped at its end.
pub struct DatabaseManager {
    _db: Database,
    conn: Connection,
}

impl DatabaseManager {
    /// Connect to Turso/sqld for network urls, otherwise open a local file
    /// (or `:memory:`).
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let built = if config.is_remote() {
            info!("Connecting to remote database at {}", config.url);
            Builder::new_remote(config.url.clone(), config.auth_token.clone())
                .build()
                .await
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            info!("Opening local database at {}", path);
            Builder::new_local(path).build().await
        };
        let db = built.map_err(|e| NotifyError::Database {
            message: format!("Failed to connect to database: {e}"),
        })?;

        let conn = db.connect().map_err(|e| NotifyError::Database {
            message: format!("Failed to get database connection: {e}"),
        })?;

        Ok(Self { _db: db, conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the `metrics` and `registrations` tables if missing.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../migrations/001_create_metrics_and_registrations.sql");

        self.conn
            .execute_batch(migration_sql)
            .await
            .map_err(|e| NotifyError::Database {
                message: format!("Failed to run migrations: {e}"),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Create the counter at 1 or add 1 to it.
    pub async fn increment_metric_on(
        &self,
        date: NaiveDate,
        event: &str,
        os: &str,
        version: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO metrics (date, event, os, version, value) VALUES (?1, ?2, ?3, ?4, 1) \
                 ON CONFLICT (date, event, os, version) DO UPDATE SET value = value + 1",
                libsql::params![date.format("%Y-%m-%d").to_string(), event, os, version],
            )
            .await
            .map_err(|e| NotifyError::Database {
                message: format!("Failed to upsert metric {event}: {e}"),
            })?;

        debug!(event, os, version, "Incremented metric");
        Ok(())
    }

    pub async fn metric_value(
        &self,
        date: NaiveDate,
        event: &str,
        os: &str,
        version: &str,
    ) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM metrics WHERE date = ?1 AND event = ?2 AND os = ?3 AND version = ?4",
                libsql::params![date.format("%Y-%m-%d").to_string(), event, os, version],
            )
            .await
            .map_err(|e| NotifyError::Database {
                message: format!("Failed to query metric: {e}"),
            })?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<i64>(0)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MetricsRecorder for DatabaseManager {
    async fn increment(&self, event: &str, platform: &str, version: &str) -> Result<()> {
        self.increment_metric_on(Utc::now().date_naive(), event, platform, version)
            .await
    }
}

#[async_trait]
impl InstallSource for DatabaseManager {
    async fn cumulative_installs(&self) -> Result<Vec<InstallPoint>> {
        let mut rows = self
            .conn
            .query(
                "SELECT day, SUM(installs) OVER (ORDER BY day) AS total \
                 FROM (SELECT date(created_at) AS day, COUNT(id) AS installs \
                       FROM registrations GROUP BY date(created_at)) \
                 ORDER BY day",
                (),
            )
            .await
            .map_err(|e| NotifyError::Database {
                message: format!("Failed to query installs: {e}"),
            })?;

        let mut points = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| NotifyError::Database {
            message: format!("Failed to read row: {e}"),
        })? {
            let day: String = row.get(0).map_err(|e| NotifyError::Database {
                message: format!("Failed to get day: {e}"),
            })?;
            let total: i64 = row.get(1).map_err(|e| NotifyError::Database {
                message: format!("Failed to get total: {e}"),
            })?;
            let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|e| NotifyError::Database {
                message: format!("Unexpected day '{day}': {e}"),
            })?;

            points.push(InstallPoint(day, total));
        }

        Ok(points)
    }
}
