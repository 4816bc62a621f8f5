use std::net::Ipv4Addr;
use std::num::NonZeroU32;
use std::time::Duration;

use camino::Utf8Path;
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ApiError, ApiResult};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct AccountConfig {
    pub url: Url,
    pub username: String,
    pub password: Option<String>,
    pub password_env: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct BridgeConfig {
    pub ipaddress: Ipv4Addr,
    pub http_port: u16,
    /// Timezone used to present telemetry timestamps.
    pub timezone: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PollingConfig {
    pub interval_secs: NonZeroU32,
    pub timeout_secs: NonZeroU32,
    pub setup_retry_secs: NonZeroU32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct AppConfig {
    pub account: AccountConfig,
    pub bridge: BridgeConfig,
    pub polling: PollingConfig,
}

impl AccountConfig {
    const DEFAULT_PASSWORD_ENV: &'static str = "SONIC_PASSWORD";

    fn password_env_name(&self) -> &str {
        self.password_env
            .as_deref()
            .unwrap_or(Self::DEFAULT_PASSWORD_ENV)
    }

    /// Password from the config file, or from the environment if the file
    /// does not set one.
    pub fn resolve_password(&self) -> ApiResult<String> {
        if let Some(password) = self.password.as_deref().filter(|x| !x.is_empty()) {
            return Ok(password.to_string());
        }

        let env_name = self.password_env_name();
        match std::env::var(env_name) {
            Ok(password) if !password.trim().is_empty() => Ok(password),
            _ => Err(ApiError::MissingPassword(env_name.to_string())),
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.get().into())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.get().into())
    }

    #[must_use]
    pub fn setup_retry(&self) -> Duration {
        Duration::from_secs(self.setup_retry_secs.get().into())
    }
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("account.url", herolabs::client::HeroLabsClient::DEFAULT_URL)?
        .set_default("bridge.ipaddress", "0.0.0.0")?
        .set_default("bridge.http_port", 8080)?
        .set_default("bridge.timezone", "Europe/London")?
        .set_default("polling.interval_secs", 60)?
        .set_default("polling.timeout_secs", 10)?
        .set_default("polling.setup_retry_secs", 30)
}

pub fn parse(filename: &Utf8Path) -> Result<AppConfig, ConfigError> {
    let settings = builder()?
        .add_source(config::File::with_name(filename.as_str()))
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
pub fn parse_str(yaml: &str) -> Result<AppConfig, ConfigError> {
    let settings = builder()?
        .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
        .build()?;

    settings.try_deserialize()
}
