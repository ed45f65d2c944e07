use super::error::ConfigError;
use crate::db::repository::order::OrderDefaults;
use crate::resilience::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;

/// Terminal configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATABASE_URL | assembled from DB_SERVER / DB_NAME | kitchen store URL |
/// | DB_SERVER | . | directory holding the store file |
/// | DB_NAME | kitchen | store file stem |
/// | DB_MAX_RETRIES | 3 | attempts per store operation |
/// | DB_RETRY_DELAY_MS | 2000 | backoff between attempts |
/// | DB_RUN_MIGRATIONS | true | apply the embedded schema on connect |
/// | DEVICE_CONFIG_PATH | ConfigDesktopApp.txt | device identity file |
/// | STORE_CODE | 42 | order header store code |
/// | CUSTOMER_NAME | Default RR Customer | order header customer |
/// | CUSTOMER_MOBILE | 09999990001 | order header mobile |
/// | ORDER_TYPE | Desktop | order type marker |
/// | PAYMENT_METHOD | C | payment marker |
/// | RECEIPT_WIDTH | 42 | text receipt width |
/// | LOG_LEVEL | info | log level |
/// | LOG_DIR | - | daily log file directory |
/// | ENVIRONMENT | development | development / production |
///
/// Unlike unset variables, malformed values are errors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kitchen store connection URL
    pub database_url: String,
    /// Apply embedded migrations on every (re)connect
    pub run_migrations: bool,
    pub retry: RetryPolicy,
    pub device_config_path: String,
    /// Fixed header fields for this terminal class
    pub order_defaults: OrderDefaults,
    pub receipt_width: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// development | production
    pub environment: String,
}

impl Config {
    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let text = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => {
                let server = text("DB_SERVER", ".");
                let name = text("DB_NAME", "kitchen");
                format!(
                    "sqlite://{}/{}.db",
                    server.trim_end_matches('/'),
                    name
                )
            }
        };

        let defaults = OrderDefaults::default();
        let order_defaults = OrderDefaults {
            customer_mobile: text("CUSTOMER_MOBILE", &defaults.customer_mobile),
            customer_name: text("CUSTOMER_NAME", &defaults.customer_name),
            store_code: parse_var(&var, "STORE_CODE", defaults.store_code)?,
            order_type: text("ORDER_TYPE", &defaults.order_type),
            payment_method: text("PAYMENT_METHOD", &defaults.payment_method),
        };

        let max_attempts: u32 = parse_var(&var, "DB_MAX_RETRIES", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_MAX_RETRIES".into(),
                value: "0".into(),
            });
        }
        let retry = RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(parse_var(&var, "DB_RETRY_DELAY_MS", 2000)?),
        };

        Ok(Self {
            database_url,
            run_migrations: parse_var(&var, "DB_RUN_MIGRATIONS", true)?,
            retry,
            device_config_path: text("DEVICE_CONFIG_PATH", "ConfigDesktopApp.txt"),
            order_defaults,
            receipt_width: parse_var(&var, "RECEIPT_WIDTH", 42)?,
            log_level: text("LOG_LEVEL", "info"),
            log_dir: var("LOG_DIR"),
            environment: text("ENVIRONMENT", "development"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T, V>(var: &V, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
