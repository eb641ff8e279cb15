//! Data shapes shared by the handlers, the ports and the adapters.

use crate::error::DeliveryError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Metric event recorded for every SMS the provider accepts.
pub const SMS_SENT_EVENT: &str = "SMS_SENT";

/// A test-result notification as delivered on the queue.
///
/// Only the fields needed to send are typed. `onsetDate` and `jobId` keep
/// whatever JSON arrived, and an absent field stays absent while `null`
/// stays `null`, so a retry re-publishes the job exactly as it was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    pub code: String,
    pub mobile: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub onset_date: Option<Value>,
    pub test_date: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Value>,
}

/// `Some(Value::Null)` for an explicit `null`; absent fields fall back to
/// `None` through `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl NotificationJob {
    /// The job id as text, if it is set to anything other than `null`,
    /// `false` or an empty string.
    pub fn job_id_label(&self) -> Option<String> {
        match self.job_id.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Name used in log lines: the job id, or `request` when there is none.
    pub fn reference(&self) -> String {
        self.job_id_label().unwrap_or_else(|| "request".to_string())
    }

    /// Short label for the SMS body, e.g. `05 Mar`.
    pub fn test_date_label(&self) -> std::result::Result<String, DeliveryError> {
        let date = parse_calendar_date(&self.test_date)
            .ok_or_else(|| DeliveryError::InvalidTestDate(self.test_date.clone()))?;
        Ok(date.format("%d %b").to_string())
    }
}

/// Timestamps carrying an offset are normalised to UTC first, with either
/// `T` or a space between date and time. Anything else that starts with a
/// `YYYY-MM-DD` date uses that date.
fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw.replacen(' ', "T", 1)) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }

    let (date, rest) = (raw.get(..10)?, raw.get(10..)?);
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Template values substituted into the delivered SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Personalisation {
    pub code: String,
    pub date: String,
}

/// One record of a queue-triggered invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueRecord {
    pub body: String,
}

/// Event payload delivered to the SMS handler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsConfig {
    pub api_key: String,
    #[serde(default)]
    pub queue_url: String,
    pub sms_sender: String,
    pub sms_template: String,
}

impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("api_key", &"<redacted>")
            .field("queue_url", &self.queue_url)
            .field("sms_sender", &self.sms_sender)
            .field("sms_template", &self.sms_template)
            .finish()
    }
}

/// Connection settings for the libSQL database holding `metrics` and
/// `registrations`. A url without a network scheme is a local file path.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: String,
}

impl DatabaseConfig {
    pub fn is_remote(&self) -> bool {
        ["libsql://", "http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteropConfig {
    pub max_age: u64,
    pub token: String,
    pub url: String,
}

impl fmt::Debug for InteropConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteropConfig")
            .field("max_age", &self.max_age)
            .field("token", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

/// Cumulative registrations up to and including `0`. Serialises as
/// `["YYYY-MM-DD", n]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallPoint(pub NaiveDate, pub i64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub installs: Vec<InstallPoint>,
}
