use anyhow::{ensure, Context};
use case_data_source::DataSourceConfig;
use notifications::config::TelegramConfig;
use region_subscription::config::StoreConfig;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use shared_kernel::configuration::config;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub interval_secs: u64,
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub data_source: DataSourceConfig,
    pub store: StoreConfig,
    pub refresh: RefreshSettings,
    pub telegram: TelegramConfig,
}

impl Settings {
    pub fn parse() -> anyhow::Result<Settings> {
        let settings = config::<Settings>()
            .context("Failed to deserialize settings to refresh_and_notify settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.refresh.interval_secs > 0, "refresh.interval_secs must be positive");
        ensure!(
            self.data_source.timeout_secs > 0,
            "data_source.timeout_secs must be positive"
        );
        ensure!(
            self.telegram.timeout_secs > 0,
            "telegram.timeout_secs must be positive"
        );
        ensure!(
            !self.telegram.bot_token.expose_secret().trim().is_empty(),
            "telegram.bot_token is empty, set APP_TELEGRAM__BOT_TOKEN"
        );
        Ok(())
    }
}
