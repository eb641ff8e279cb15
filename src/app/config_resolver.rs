use crate::app::ports::{ConfigProvider, ParameterStore, SecretStore};
use crate::config::DeploymentMode;
use crate::domain::{DatabaseConfig, InteropConfig, SmsConfig};
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Sms,
    StatsBucket,
    Database,
    Interop,
}

impl FromStr for ConfigKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Self::Sms),
            "stats-bucket" => Ok(Self::StatsBucket),
            "database" => Ok(Self::Database),
            "interop" => Ok(Self::Interop),
            other => Err(format!(
                "unknown config kind '{other}' (expected sms, stats-bucket, database or interop)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigBundle {
    Sms(SmsConfig),
    StatsBucket(String),
    Database(DatabaseConfig),
    Interop(InteropConfig),
}

/// Resolves configuration through the provider chosen at startup.
#[derive(Clone)]
pub struct ConfigResolver {
    provider: Arc<dyn ConfigProvider>,
}

impl ConfigResolver {
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self { provider }
    }

    /// Pick the provider for `mode`. The remote provider is only built in
    /// production.
    pub fn select<F>(mode: DeploymentMode, env: EnvConfigProvider, remote: F) -> Self
    where
        F: FnOnce() -> RemoteConfigProvider,
    {
        match mode {
            DeploymentMode::Production => Self::new(Arc::new(remote())),
            DeploymentMode::Development => Self::new(Arc::new(env)),
        }
    }

    pub async fn resolve(&self, kind: ConfigKind) -> Result<ConfigBundle> {
        debug!(?kind, "Resolving configuration");
        Ok(match kind {
            ConfigKind::Sms => ConfigBundle::Sms(self.sms().await?),
            ConfigKind::StatsBucket => ConfigBundle::StatsBucket(self.assets_bucket().await?),
            ConfigKind::Database => ConfigBundle::Database(self.database().await?),
            ConfigKind::Interop => ConfigBundle::Interop(self.interop().await?),
        })
    }

    pub async fn sms(&self) -> Result<SmsConfig> {
        self.provider.sms_config().await
    }

    pub async fn assets_bucket(&self) -> Result<String> {
        self.provider.assets_bucket().await
    }

    pub async fn database(&self) -> Result<DatabaseConfig> {
        self.provider.database_config().await
    }

    pub async fn interop(&self) -> Result<InteropConfig> {
        self.provider.interop_config().await
    }
}

/// Development provider: every field comes from a named environment variable.
pub struct EnvConfigProvider {
    vars: HashMap<String, String>,
}

impl EnvConfigProvider {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    fn var(&self, name: &str) -> String {
        match self.vars.get(name) {
            Some(value) => value.clone(),
            None => {
                warn!("Environment variable {} is not set", name);
                String::new()
            }
        }
    }

    fn number(&self, name: &str) -> Result<u64> {
        match self.vars.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(0),
            Some(raw) => raw.parse().map_err(|_| {
                NotifyError::Config(format!("{name} must be a whole number, got '{raw}'"))
            }),
        }
    }
}

#[async_trait]
impl ConfigProvider for EnvConfigProvider {
    async fn sms_config(&self) -> Result<SmsConfig> {
        Ok(SmsConfig {
            api_key: self.var("SMS_API_KEY"),
            queue_url: self.var("CALLBACK_QUEUE_URL"),
            sms_sender: self.var("SMS_SENDER"),
            sms_template: self.var("SMS_TEMPLATE"),
        })
    }

    async fn assets_bucket(&self) -> Result<String> {
        Ok(self.var("ASSETS_BUCKET"))
    }

    async fn database_config(&self) -> Result<DatabaseConfig> {
        Ok(DatabaseConfig {
            url: self.var("LIBSQL_URL"),
            auth_token: self.var("LIBSQL_AUTH_TOKEN"),
        })
    }

    async fn interop_config(&self) -> Result<InteropConfig> {
        Ok(InteropConfig {
            max_age: self.number("INTEROP_MAX_AGE")?,
            token: self.var("INTEROP_TOKEN"),
            url: self.var("INTEROP_URL"),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSecret {
    auth_token: String,
}

/// Production provider: secrets and parameters named `{prefix}{id}`.
pub struct RemoteConfigProvider {
    prefix: String,
    parameters: Arc<dyn ParameterStore>,
    secrets: Arc<dyn SecretStore>,
}

impl RemoteConfigProvider {
    pub fn new(
        prefix: impl Into<String>,
        parameters: Arc<dyn ParameterStore>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            parameters,
            secrets,
        }
    }

    async fn parameter(&self, id: &str) -> Result<String> {
        self.parameters.get_parameter(&format!("{}{}", self.prefix, id)).await
    }

    async fn secret<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let name = format!("{}{}", self.prefix, id);
        let raw = self.secrets.get_secret_string(&name).await?;
        serde_json::from_str(&raw)
            .map_err(|e| NotifyError::Config(format!("Secret {name} is not valid JSON: {e}")))
    }
}

#[async_trait]
impl ConfigProvider for RemoteConfigProvider {
    async fn sms_config(&self) -> Result<SmsConfig> {
        let (mut config, queue_url) =
            tokio::try_join!(self.secret::<SmsConfig>("sms"), self.parameter("sms_url"))?;
        config.queue_url = queue_url;
        Ok(config)
    }

    async fn assets_bucket(&self) -> Result<String> {
        self.parameter("s3_assets_bucket").await
    }

    async fn database_config(&self) -> Result<DatabaseConfig> {
        let (secret, url) = tokio::try_join!(
            self.secret::<DatabaseSecret>("db-credentials"),
            self.parameter("db_url")
        )?;
        Ok(DatabaseConfig {
            url,
            auth_token: secret.auth_token,
        })
    }

    async fn interop_config(&self) -> Result<InteropConfig> {
        self.secret("interop").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockStore {
        values: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MockStore {
        fn with(values: &[(&str, &str)]) -> Self {
            Self {
                values: values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn lookup(&self, name: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.values
                .get(name)
                .cloned()
                .ok_or_else(|| NotifyError::Config(format!("{name} not found")))
        }
    }

    #[async_trait]
    impl ParameterStore for MockStore {
        async fn get_parameter(&self, name: &str) -> Result<String> {
            self.lookup(name)
        }
    }

    #[async_trait]
    impl SecretStore for MockStore {
        async fn get_secret_string(&self, id: &str) -> Result<String> {
            self.lookup(id)
        }
    }

    fn remote(params: Arc<MockStore>, secrets: Arc<MockStore>) -> RemoteConfigProvider {
        RemoteConfigProvider::new("covid-", params, secrets)
    }

    #[tokio::test]
    async fn test_development_reads_environment_only() {
        let params = Arc::new(MockStore::default());
        let secrets = Arc::new(MockStore::default());
        let env = EnvConfigProvider::from_vars([
            ("SMS_API_KEY", "key"),
            ("CALLBACK_QUEUE_URL", "https://sqs.local/retry"),
            ("SMS_SENDER", "sender-1"),
            ("SMS_TEMPLATE", "template-1"),
            ("ASSETS_BUCKET", "assets"),
            ("LIBSQL_URL", "/tmp/dev.db"),
            ("INTEROP_MAX_AGE", "14"),
            ("INTEROP_TOKEN", "tok"),
            ("INTEROP_URL", "https://interop.local"),
        ]);

        let (p, s) = (params.clone(), secrets.clone());
        let resolver = ConfigResolver::select(DeploymentMode::Development, env, move || remote(p, s));

        let sms = resolver.sms().await.unwrap();
        assert_eq!(sms.queue_url, "https://sqs.local/retry");
        assert_eq!(sms.sms_template, "template-1");
        assert_eq!(
            resolver.resolve(ConfigKind::StatsBucket).await.unwrap(),
            ConfigBundle::StatsBucket("assets".to_string())
        );
        let db = resolver.database().await.unwrap();
        assert_eq!(db.url, "/tmp/dev.db");
        assert_eq!(db.auth_token, "");
        assert_eq!(resolver.interop().await.unwrap().max_age, 14);

        assert_eq!(params.calls.load(Ordering::SeqCst), 0);
        assert_eq!(secrets.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_development_rejects_non_numeric_max_age() {
        let env = EnvConfigProvider::from_vars([("INTEROP_MAX_AGE", "two weeks")]);
        let err = env.interop_config().await.unwrap_err();
        assert!(matches!(err, NotifyError::Config(msg) if msg.contains("INTEROP_MAX_AGE")));
    }

    #[tokio::test]
    async fn test_production_sms_combines_secret_and_parameter() {
        let params = Arc::new(MockStore::with(&[("covid-sms_url", "https://sqs.aws/retry")]));
        let secrets = Arc::new(MockStore::with(&[(
            "covid-sms",
            r#"{"apiKey":"k","smsSender":"s","smsTemplate":"t"}"#,
        )]));
        let (p, s) = (params.clone(), secrets.clone());
        let resolver = ConfigResolver::select(
            DeploymentMode::Production,
            EnvConfigProvider::from_vars([("SMS_API_KEY", "from-env")]),
            move || remote(p, s),
        );

        match resolver.resolve(ConfigKind::Sms).await.unwrap() {
            ConfigBundle::Sms(sms) => {
                assert_eq!(sms.api_key, "k");
                assert_eq!(sms.queue_url, "https://sqs.aws/retry");
                assert_eq!(sms.sms_sender, "s");
                assert_eq!(sms.sms_template, "t");
            }
            other => panic!("unexpected bundle {other:?}"),
        }
        assert_eq!(params.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secrets.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_production_database_and_interop() {
        let params = Arc::new(MockStore::with(&[
            ("covid-db_url", "libsql://db.example"),
            ("covid-s3_assets_bucket", "prod-assets"),
        ]));
        let secrets = Arc::new(MockStore::with(&[
            ("covid-db-credentials", r#"{"authToken":"secret-token"}"#),
            ("covid-interop", r#"{"maxAge":7,"token":"t","url":"https://interop"}"#),
        ]));
        let resolver = ConfigResolver::new(Arc::new(remote(params, secrets)));

        let db = resolver.database().await.unwrap();
        assert_eq!(db.url, "libsql://db.example");
        assert_eq!(db.auth_token, "secret-token");
        assert_eq!(resolver.assets_bucket().await.unwrap(), "prod-assets");
        assert_eq!(resolver.interop().await.unwrap().max_age, 7);
    }

    #[tokio::test]
    async fn test_production_fetch_failure_propagates() {
        let params = Arc::new(MockStore::default());
        let secrets = Arc::new(MockStore::with(&[(
            "covid-sms",
            r#"{"apiKey":"k","smsSender":"s","smsTemplate":"t"}"#,
        )]));
        let resolver = ConfigResolver::new(Arc::new(remote(params, secrets)));

        let err = resolver.sms().await.unwrap_err();
        assert!(matches!(err, NotifyError::Config(msg) if msg.contains("covid-sms_url")));
    }

    #[tokio::test]
    async fn test_malformed_secret_is_config_error() {
        let params = Arc::new(MockStore::default());
        let secrets = Arc::new(MockStore::with(&[("covid-interop", "not json")]));
        let resolver = ConfigResolver::new(Arc::new(remote(params, secrets)));
        assert!(matches!(resolver.interop().await, Err(NotifyError::Config(_))));
    }

    #[test]
    fn test_config_kind_from_str() {
        assert_eq!("stats-bucket".parse::<ConfigKind>().unwrap(), ConfigKind::StatsBucket);
        assert!("queue".parse::<ConfigKind>().is_err());
    }
}
