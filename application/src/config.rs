//! [`Config`]-related definitions.

use std::time;

use common::{money::Currency, Percent};
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use service::infra::payment::{retry, stripe};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Payment provider configuration.
    pub payments: Payments,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret shared with the identity service.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default(SecretString::from("secret"))]
    pub jwt_secret: SecretString,

    /// Fees configuration.
    pub fees: Fees,

    /// Payouts configuration.
    pub payouts: Payouts,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            fees:
                Fees {
                    service_fee_percent,
                    platform_fee_percent,
                },
            payouts: Payouts { delay },
            tasks: Tasks { complete_stays },
        } = value;
        Self {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.expose_secret().as_bytes(),
            ),
            fees: service::Fees {
                service_fee: service_fee_percent,
                platform_fee: platform_fee_percent,
            },
            payout_delay: delay,
            complete_stays: service::task::complete_stays::Config {
                interval: complete_stays.interval,
            },
        }
    }
}

/// Fees configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Fees {
    /// Fee charged to guests on top of a stay subtotal.
    #[default(Percent::whole(8))]
    pub service_fee_percent: Percent,

    /// Fee withheld from host payouts.
    #[default(Percent::whole(15))]
    pub platform_fee_percent: Percent,
}

/// Payouts configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Payouts {
    /// Delay between requesting a payout and its scheduled transfer.
    #[default(time::Duration::from_secs(7 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub delay: time::Duration,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `CompleteStays` task configuration.
    pub complete_stays: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Payment provider configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Payments {
    /// Secret API key.
    #[default(SecretString::from(""))]
    pub api_key: SecretString,

    /// Secret the webhook deliveries are signed with.
    #[default(SecretString::from(""))]
    pub webhook_secret: SecretString,

    /// Maximum age of an accepted webhook signature.
    #[default(time::Duration::from_secs(5 * 60))]
    #[serde(with = "humantime_serde")]
    pub webhook_tolerance: time::Duration,

    /// Currency the payments are collected in.
    #[default(Currency::Usd)]
    pub currency: Currency,

    /// API base URL.
    #[default(stripe::DEFAULT_BASE_URL.to_owned())]
    pub base_url: String,

    /// Timeout of a single HTTP request.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,

    /// Retries of the idempotent requests.
    pub retries: Retries,
}

impl From<Payments> for stripe::Config {
    fn from(value: Payments) -> Self {
        let Payments {
            api_key,
            webhook_secret,
            webhook_tolerance,
            currency,
            base_url,
            timeout,
            retries,
        } = value;
        Self {
            api_key,
            webhook_secret,
            webhook_tolerance,
            currency,
            base_url,
            timeout,
            retry: retries.into(),
        }
    }
}

/// Retries configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Retries {
    /// Maximum number of attempts, including the first one.
    #[default(3)]
    pub max_attempts: u32,

    /// Delay before the first retry, doubled after each one.
    #[default(time::Duration::from_millis(200))]
    #[serde(with = "humantime_serde")]
    pub initial_delay: time::Duration,

    /// Upper bound of the delay between retries.
    #[default(time::Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub max_delay: time::Duration,
}

impl From<Retries> for retry::Config {
    fn from(value: Retries) -> Self {
        let Retries {
            max_attempts,
            initial_delay,
            max_delay,
        } = value;
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            ..Self::default()
        }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default(SecretString::from("postgres"))]
    pub password: SecretString,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password.expose_secret().to_owned()),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{money::Currency, Percent};
    use secrecy::ExposeSecret as _;

    use super::Config;

    #[test]
    fn defaults_missing_file() {
        let config = Config::new("missing.toml").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.service.fees.service_fee_percent, Percent::whole(8));
        assert_eq!(
            config.service.fees.platform_fee_percent,
            Percent::whole(15),
        );
        assert_eq!(
            config.service.payouts.delay,
            Duration::from_secs(7 * 24 * 60 * 60),
        );
        assert_eq!(config.payments.currency, Currency::Usd);
        assert_eq!(config.payments.retries.max_attempts, 3);
        assert_eq!(config.postgres.password.expose_secret(), "postgres");
    }
}
