use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_LINE_POLICY: &str = "lenient";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Shared secret for verifying identity-provider JWTs (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Expected issuer of identity-provider tokens
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// Expected audience of identity-provider tokens
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Public base URL of the storefront UI, used to build the hosted payment
    /// session's success and cancel redirects
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,

    /// Display name used in outbound email
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Settlement currency for hosted payment sessions
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Partial-failure policy for cart lines referencing unknown products:
    /// "lenient" drops them, "strict" rejects the whole checkout
    #[serde(default = "default_line_policy")]
    #[validate(custom = "validate_line_policy")]
    pub checkout_line_policy: String,

    /// Payment provider API base URL
    #[serde(default = "default_payment_gateway_url")]
    pub payment_gateway_url: String,

    /// Payment provider API secret key
    #[validate(length(min = 1))]
    pub payment_gateway_secret_key: String,

    /// Shared secret for verifying payment webhook signatures
    #[validate(length(min = 1))]
    pub payment_webhook_secret: String,

    /// Maximum accepted clock skew for signed webhook timestamps (seconds)
    #[serde(default = "default_webhook_tolerance_secs")]
    pub payment_webhook_tolerance_secs: u64,

    /// Transactional email API base URL
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,

    /// Transactional email API key (empty disables nothing; sends fail and are logged)
    #[serde(default)]
    pub email_api_key: String,

    /// Sender address for transactional email
    #[serde(default = "default_email_from")]
    pub email_from: String,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_auth_issuer() -> String {
    "storefront-auth".to_string()
}
fn default_auth_audience() -> String {
    "storefront-api".to_string()
}
fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_store_name() -> String {
    "Storefront".to_string()
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
fn default_line_policy() -> String {
    DEFAULT_LINE_POLICY.to_string()
}
fn default_payment_gateway_url() -> String {
    "https://api.payments.example.com".to_string()
}
fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}
fn default_email_api_url() -> String {
    "https://api.mail.example.com".to_string()
}
fn default_email_from() -> String {
    "orders@storefront.example".to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn validate_line_policy(value: &str) -> Result<(), ValidationError> {
    match value {
        "lenient" | "strict" => Ok(()),
        _ => Err(ValidationError::new("checkout_line_policy")),
    }
}

impl AppConfig {
    /// Construct a configuration programmatically (used by tests and tooling);
    /// everything not passed explicitly takes its default.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        payment_gateway_secret_key: impl Into<String>,
        payment_webhook_secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            jwt_secret: jwt_secret.into(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            app_base_url: default_app_base_url(),
            store_name: default_store_name(),
            currency: default_currency(),
            checkout_line_policy: default_line_policy(),
            payment_gateway_url: default_payment_gateway_url(),
            payment_gateway_secret_key: payment_gateway_secret_key.into(),
            payment_webhook_secret: payment_webhook_secret.into(),
            payment_webhook_tolerance_secs: default_webhook_tolerance_secs(),
            email_api_url: default_email_api_url(),
            email_api_key: String::new(),
            email_from: default_email_from(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            auto_migrate: false,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("dev")
            || self.environment.eq_ignore_ascii_case("test")
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.cors_allow_any_origin || self.is_development()
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Load configuration from config files and APP__-prefixed environment
/// variables, failing fast on anything missing or invalid.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Secrets have no defaults on purpose; check them up front so the error
    // names the missing variable instead of a generic deserialize failure.
    for (key, env_var) in [
        ("jwt_secret", "APP__JWT_SECRET"),
        ("payment_gateway_secret_key", "APP__PAYMENT_GATEWAY_SECRET_KEY"),
        ("payment_webhook_secret", "APP__PAYMENT_WEBHOOK_SECRET"),
    ] {
        if config.get_string(key).is_err() {
            error!("{} is not configured. Set the {} environment variable.", key, env_var);
            return Err(AppConfigError::Load(ConfigError::NotFound(format!(
                "{key} is required but not configured. Set {env_var}."
            ))));
        }
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            "sk_test_gateway",
            "whsec_test",
            "127.0.0.1",
            18_080,
            "test",
        )
    }

    #[test]
    fn programmatic_config_passes_validation() {
        test_config().validate().expect("config should validate");
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let mut cfg = test_config();
        cfg.jwt_secret = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_line_policy_fails_validation() {
        let mut cfg = test_config();
        cfg.checkout_line_policy = "best-effort".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn development_environment_allows_permissive_cors() {
        let mut cfg = test_config();
        cfg.environment = "development".to_string();
        assert!(cfg.should_allow_permissive_cors());

        cfg.environment = "production".to_string();
        assert!(!cfg.should_allow_permissive_cors());

        cfg.cors_allow_any_origin = true;
        assert!(cfg.should_allow_permissive_cors());
    }
}
