//! Server configuration, loaded once at startup.

use prospect_core::defaults::MAX_BODY_BYTES;
use prospect_core::MessageDefaults;
use prospect_db::PoolConfig;
use prospect_sync::TriggerConfig;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/prospect";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Effective configuration injected into the router state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Base URL the automation tool uses to reach the inbound webhooks.
    pub public_base_url: String,
    pub trigger: TriggerConfig,
    pub lead_webhook_secret: Option<String>,
    pub search_update_secret: Option<String>,
    pub messages: MessageDefaults,
    pub max_body_bytes: usize,
    pub pool: PoolConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_base_url: default_public_base_url(DEFAULT_HOST, DEFAULT_PORT),
            trigger: TriggerConfig::default(),
            lead_webhook_secret: None,
            search_update_secret: None,
            messages: MessageDefaults::default(),
            max_body_bytes: MAX_BODY_BYTES,
            pool: PoolConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DATABASE_URL` | `postgres://localhost/prospect` |
    /// | `HOST` / `PORT` | `0.0.0.0` / `3000` |
    /// | `PUBLIC_BASE_URL` | `http://localhost:{PORT}` |
    /// | `TRIGGER_URL`, `TRIGGER_TIMEOUT_SECS`, `TRIGGER_DISPATCH` | see [`TriggerConfig::from_env`] |
    /// | `LEAD_WEBHOOK_SECRET`, `SEARCH_UPDATE_SECRET` | unset (no check) |
    /// | `DEFAULT_WHATSAPP_MESSAGE`, `DEFAULT_EMAIL_SUBJECT`, `DEFAULT_EMAIL_BODY` | built-in texts |
    /// | `WHATSAPP_COUNTRY_CODE` | `55` |
    /// | `MAX_BODY_BYTES` | 2 MiB |
    /// | `DB_MAX_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_SECS` | see [`PoolConfig::from_env`] |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env_string("HOST").unwrap_or(defaults.host);
        let port = env_string("PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let public_base_url = env_string("PUBLIC_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_public_base_url(&host, port));

        let messages = MessageDefaults {
            whatsapp_message: env_string("DEFAULT_WHATSAPP_MESSAGE")
                .unwrap_or(defaults.messages.whatsapp_message),
            email_subject: env_string("DEFAULT_EMAIL_SUBJECT")
                .unwrap_or(defaults.messages.email_subject),
            email_body: env_string("DEFAULT_EMAIL_BODY").unwrap_or(defaults.messages.email_body),
            whatsapp_country_code: env_string("WHATSAPP_COUNTRY_CODE")
                .filter(|c| c.chars().all(|ch| ch.is_ascii_digit()))
                .unwrap_or(defaults.messages.whatsapp_country_code),
        };

        Self {
            database_url: env_string("DATABASE_URL").unwrap_or(defaults.database_url),
            host,
            port,
            public_base_url,
            trigger: TriggerConfig::from_env(),
            lead_webhook_secret: env_string("LEAD_WEBHOOK_SECRET"),
            search_update_secret: env_string("SEARCH_UPDATE_SECRET"),
            messages,
            max_body_bytes: env_string("MAX_BODY_BYTES")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(MAX_BODY_BYTES),
            pool: PoolConfig::from_env(),
        }
    }

    pub fn lead_webhook_url(&self) -> String {
        format!("{}/webhook", self.public_base_url)
    }

    pub fn search_update_url(&self) -> String {
        format!("{}/update_search", self.public_base_url)
    }
}

/// Non-blank environment value.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_public_base_url(host: &str, port: u16) -> String {
    let host = if host == "0.0.0.0" { "localhost" } else { host };
    format!("http://{}:{}", host, port)
}
