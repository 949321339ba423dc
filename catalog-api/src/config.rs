use std::str::FromStr;

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};

use crate::domain::search::SearchConfig;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub search: SearchSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    /// Origin allowed by CORS, e.g. the storefront URL
    pub app_url: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct SearchSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub default_limit: u32,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_limit: u32,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub cache_ttl_seconds: i64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub cache_sweep_interval_seconds: u64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub refresh_batch_size: i64,
    /// Zero disables the periodic compatibility refresh.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub refresh_interval_seconds: u64,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl SearchSettings {
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            cache_ttl: time::Duration::seconds(self.cache_ttl_seconds),
            refresh_batch_size: self.refresh_batch_size,
        }
    }

    pub fn cache_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_sweep_interval_seconds.max(1))
    }

    pub fn refresh_interval(&self) -> Option<std::time::Duration> {
        (self.refresh_interval_seconds > 0)
            .then(|| std::time::Duration::from_secs(self.refresh_interval_seconds))
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("current directory: {e}")))?;
    let config_directory = base_path.join("config");

    let environment_name = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());
    let environment = Environment::from_str(&environment_name).map_err(|_| {
        config::ConfigError::Message(format!("unknown APP_ENVIRONMENT '{environment_name}'"))
    })?;
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("CATALOG")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
