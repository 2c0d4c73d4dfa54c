use crate::api::{endpoint, Endpoints};
use crate::coordinator::SCAN_INTERVAL;
use crate::entry::EntryData;
use crate::model::DEFAULT_COUNTRY;
use config::{Config, ConfigError, Source};
use serde::Deserialize;
use std::time::Duration;

pub const ENV_PREFIX: &str = "OBI";

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

fn default_interval() -> u64 {
    SCAN_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub login_url: String,
    pub api_url: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub bridge_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    /// Seconds between refreshes.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl Settings {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            login_url: self.login_url.to_owned(),
            api_url: self.api_url.to_owned(),
        }
    }

    pub fn entry_data(&self) -> EntryData {
        EntryData {
            email: self.email.to_owned(),
            password: self.password.to_owned(),
            country: self.country.to_owned(),
            bridge_id: self.bridge_id.clone(),
            device_id: self.device_id.clone(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

/// Read settings from `source` on top of the default endpoints.
pub fn settings_from<T>(source: T) -> Result<Settings, ConfigError>
where
    T: 'static + Source + Send + Sync,
{
    let mut settings = Config::default();
    settings
        .set_default("login_url", endpoint::LOGIN_URL)?
        .set_default("api_url", endpoint::API_URL)?
        .merge(source)?;

    settings.try_into()
}

/// Read settings from `OBI_*` environment variables.
pub fn read_settings() -> Result<Settings, ConfigError> {
    settings_from(config::Environment::with_prefix(ENV_PREFIX))
}
