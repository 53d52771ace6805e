use crate::api::{API_URL, REFRESH_INTERVAL};
use crate::model::{Credentials, Device};
use config::{Config, ConfigError, Environment};
use std::time::Duration;

const ENV_PREFIX: &str = "SOLAX";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SolaxConfig {
    pub name: String,
    pub api_key: String,
    pub sn: String,
    pub has_battery: bool,
    pub api_url: String,
    /// Refresh interval in seconds
    pub interval: u64,
}

impl SolaxConfig {
    pub fn device(&self) -> Device {
        Device {
            name: self.name.to_owned(),
            credentials: Credentials {
                token_id: self.api_key.to_owned(),
                sn: self.sn.to_owned(),
            },
            has_battery: self.has_battery,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

fn with_defaults(settings: &mut Config) -> Result<&mut Config, ConfigError> {
    settings
        .set_default("has_battery", false)?
        .set_default("api_url", API_URL)?
        .set_default("interval", REFRESH_INTERVAL.as_secs() as i64)
}

/// Read settings from `SOLAX_*` environment variables.
pub fn read_settings() -> Result<SolaxConfig, ConfigError> {
    let mut settings = Config::default();
    with_defaults(&mut settings)?.merge(Environment::with_prefix(ENV_PREFIX))?;

    settings.try_into()
}
