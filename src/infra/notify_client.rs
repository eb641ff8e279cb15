use crate::app::ports::{GatewayFactory, NotificationGateway};
use crate::domain::Personalisation;
use crate::error::{DeliveryError, NotifyError, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::debug;

const UUID_LEN: usize = 36;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Serialize)]
struct SendSmsRequest<'a> {
    phone_number: &'a str,
    template_id: &'a str,
    personalisation: &'a Personalisation,
    reference: Option<&'a str>,
    sms_sender_id: &'a str,
}

/// Client for the Notify SMS endpoint. Each send is signed with a fresh
/// short-lived JWT.
pub struct NotifyClient {
    http: reqwest::Client,
    base_url: String,
    service_id: String,
    secret: String,
}

impl NotifyClient {
    /// Keys look like `{name}-{service_id}-{secret}` where both ids are
    /// 36-character UUIDs.
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Result<Self> {
        let key = api_key.trim();
        if key.len() < 2 * UUID_LEN + 1 || !key.is_ascii() {
            return Err(NotifyError::Config("SMS API key is malformed".to_string()));
        }

        let secret = &key[key.len() - UUID_LEN..];
        let service_id = &key[key.len() - 2 * UUID_LEN - 1..key.len() - UUID_LEN - 1];

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_id: service_id.to_string(),
            secret: secret.to_string(),
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    fn bearer_token(&self) -> std::result::Result<String, DeliveryError> {
        let claims = Claims {
            iss: &self.service_id,
            iat: chrono::Utc::now().timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }
}

#[async_trait]
impl NotificationGateway for NotifyClient {
    async fn send_sms(
        &self,
        template_id: &str,
        recipient: &str,
        personalisation: &Personalisation,
        sender_id: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let body = SendSmsRequest {
            phone_number: recipient,
            template_id,
            personalisation,
            reference: None,
            sms_sender_id: sender_id,
        };

        let resp = self
            .http
            .post(format!("{}/v2/notifications/sms", self.base_url))
            .bearer_auth(self.bearer_token()?)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Notify accepted SMS");
        Ok(())
    }
}

/// Shares one HTTP client across every gateway it hands out.
pub struct NotifyGatewayFactory {
    http: reqwest::Client,
    base_url: String,
}

impl NotifyGatewayFactory {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl GatewayFactory for NotifyGatewayFactory {
    fn connect(&self, api_key: &str) -> Result<Box<dyn NotificationGateway>> {
        Ok(Box::new(NotifyClient::new(self.http.clone(), &self.base_url, api_key)?))
    }
}
