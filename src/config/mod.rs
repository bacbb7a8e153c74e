//! Configuration management
//!
//! YAML configuration with environment variable overrides. Secrets (signing
//! key, encryption key, webhook secret, platform credentials) are normally
//! supplied through the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::services::AuthError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub shopify: ShopifyConfig,
    pub search: SearchConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Credential and token configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC key for all signed tokens (at least 32 characters)
    #[serde(default)]
    pub signing_key: String,
    /// Hex-encoded 32-byte key for the token vault
    #[serde(default)]
    pub encryption_key: String,
    /// Deployment-wide webhook shared secret
    #[serde(default)]
    pub webhook_secret: String,
    /// Static key gating the session endpoints; open when unset
    #[serde(default)]
    pub session_api_key: Option<String>,
    #[serde(default = "default_session_ttl")]
    pub user_token_ttl_hours: i64,
    #[serde(default = "default_session_ttl")]
    pub store_token_ttl_hours: i64,
    #[serde(default = "default_state_ttl")]
    pub oauth_state_ttl_minutes: i64,
    /// Upper bound on the persistence read made by API key resolution
    #[serde(default = "default_lookup_timeout")]
    pub api_key_lookup_timeout_ms: u64,
    /// Upper bound on the background last-used update
    #[serde(default = "default_touch_timeout")]
    pub last_used_update_timeout_ms: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
}

fn default_session_ttl() -> i64 {
    24
}

fn default_state_ttl() -> i64 {
    15
}

fn default_lookup_timeout() -> u64 {
    5000
}

fn default_touch_timeout() -> u64 {
    3000
}

fn default_password_min_length() -> usize {
    8
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_key", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("session_api_key", &self.session_api_key.as_ref().map(|_| "<redacted>"))
            .field("user_token_ttl_hours", &self.user_token_ttl_hours)
            .field("store_token_ttl_hours", &self.store_token_ttl_hours)
            .field("oauth_state_ttl_minutes", &self.oauth_state_ttl_minutes)
            .field("api_key_lookup_timeout_ms", &self.api_key_lookup_timeout_ms)
            .field("last_used_update_timeout_ms", &self.last_used_update_timeout_ms)
            .field("password_min_length", &self.password_min_length)
            .finish()
    }
}

impl AuthConfig {
    /// Decode the vault key, which must be exactly 32 bytes
    pub fn encryption_key_bytes(&self) -> Result<Vec<u8>, AuthError> {
        let key = hex::decode(self.encryption_key.trim()).map_err(|_| {
            AuthError::ConfigurationFatal("encryption key must be hex encoded".to_string())
        })?;
        if key.len() != 32 {
            return Err(AuthError::ConfigurationFatal(format!(
                "encryption key must be 32 bytes, got {}",
                key.len()
            )));
        }
        Ok(key)
    }
}

/// E-commerce platform (Shopify) app configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct ShopifyConfig {
    #[serde(default)]
    pub api_key: String,
    /// Shared secret for OAuth callback signatures
    #[serde(default)]
    pub api_secret: String,
    /// Public base URL of this app
    #[serde(default)]
    pub app_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_shopify_timeout")]
    pub request_timeout_secs: u64,
}

fn default_scopes() -> String {
    "read_products,write_products,read_product_listings,read_collection_listings,read_inventory,write_webhooks".to_string()
}

fn default_shopify_timeout() -> u64 {
    15
}

impl fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("app_url", &self.app_url)
            .field("scopes", &self.scopes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ShopifyConfig {
    /// OAuth redirect used when the caller supplies none
    pub fn default_redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app_url.trim_end_matches('/'))
    }
}

/// Upstream search engine configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Console,
    File,
    Both,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/mgsearch")
}

fn default_log_prefix() -> String {
    "mgsearch".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

impl Default for AppConfig {
    /// Secrets are left empty and must come from the file or environment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                cors_origins: Vec::new(),
            },
            auth: AuthConfig {
                signing_key: String::new(),
                encryption_key: String::new(),
                webhook_secret: String::new(),
                session_api_key: None,
                user_token_ttl_hours: default_session_ttl(),
                store_token_ttl_hours: default_session_ttl(),
                oauth_state_ttl_minutes: default_state_ttl(),
                api_key_lookup_timeout_ms: default_lookup_timeout(),
                last_used_update_timeout_ms: default_touch_timeout(),
                password_min_length: default_password_min_length(),
            },
            shopify: ShopifyConfig {
                api_key: String::new(),
                api_secret: String::new(),
                app_url: String::new(),
                scopes: default_scopes(),
                request_timeout_secs: default_shopify_timeout(),
            },
            search: SearchConfig {
                url: "http://127.0.0.1:7700".to_string(),
                api_key: String::new(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/mgsearch.db?mode=rwc".to_string(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("MGSEARCH_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/mgsearch/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("mgsearch/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides from `lookup`
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MGSEARCH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(key) = lookup("JWT_SIGNING_KEY") {
            self.auth.signing_key = key;
        }
        if let Some(key) = lookup("ENCRYPTION_KEY") {
            self.auth.encryption_key = key;
        }
        if let Some(secret) = lookup("SHOPIFY_WEBHOOK_SECRET") {
            self.auth.webhook_secret = secret;
        }
        if let Some(key) = lookup("SESSION_API_KEY") {
            self.auth.session_api_key = if key.is_empty() { None } else { Some(key) };
        }

        if let Some(key) = lookup("SHOPIFY_API_KEY") {
            self.shopify.api_key = key;
        }
        if let Some(secret) = lookup("SHOPIFY_API_SECRET") {
            self.shopify.api_secret = secret;
        }
        if let Some(url) = lookup("SHOPIFY_APP_URL") {
            self.shopify.app_url = url;
        }
        if let Some(scopes) = lookup("SHOPIFY_SCOPES") {
            self.shopify.scopes = scopes;
        }

        if let Some(url) = lookup("MEILISEARCH_URL") {
            self.search.url = url;
        }
        if let Some(key) = lookup("MEILISEARCH_API_KEY") {
            self.search.api_key = key;
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MGSEARCH_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
    }

    /// Validate configuration; any failure aborts startup
    pub fn validate(&self) -> Result<(), AuthError> {
        let fatal = |msg: &str| Err(AuthError::ConfigurationFatal(msg.to_string()));

        if self.auth.signing_key.len() < 32 {
            return fatal("token signing key must be at least 32 characters long");
        }
        self.auth.encryption_key_bytes()?;
        if self.auth.webhook_secret.is_empty() {
            return fatal("webhook secret is required");
        }
        if self.shopify.api_key.is_empty() || self.shopify.api_secret.is_empty() {
            return fatal("Shopify API key and secret are required");
        }
        if self.shopify.app_url.is_empty() {
            return fatal("Shopify app URL is required");
        }
        if self.search.url.is_empty() || self.search.api_key.is_empty() {
            return fatal("search engine URL and API key are required");
        }
        if self.server.port == 0 {
            return fatal("server port cannot be 0");
        }
        if self.database.url.is_empty() {
            return fatal("database URL cannot be empty");
        }

        Ok(())
    }
}
