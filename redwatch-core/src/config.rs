use crate::error::ConfigError;
use crate::types::{Credentials, FeedSource, FilterMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const MIN_POLL_INTERVAL_MINUTES: u64 = 1;
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 60;

fn default_poll_interval() -> u64 {
    5
}

fn default_volume() -> u8 {
    50
}

fn default_history_cap() -> usize {
    100
}

fn default_seen_cap() -> usize {
    1000
}

/// Application configuration, loaded from a TOML file at startup.
/// Credentials may be left blank; the pipeline reports
/// `MissingCredentials` at runtime instead of refusing to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    /// Feed endpoints to poll, in configured order.
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,

    #[serde(default)]
    pub sound_enabled: bool,

    #[serde(default = "default_volume")]
    pub notification_volume: u8,

    #[serde(default)]
    pub filter: FilterMode,

    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    #[serde(default = "default_seen_cap")]
    pub seen_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            sources: Vec::new(),
            poll_interval_minutes: default_poll_interval(),
            sound_enabled: false,
            notification_volume: default_volume(),
            filter: FilterMode::default(),
            history_cap: default_history_cap(),
            seen_cap: default_seen_cap(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        info!(
            sources = config.sources.len(),
            interval_minutes = config.poll_interval_minutes,
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_POLL_INTERVAL_MINUTES..=MAX_POLL_INTERVAL_MINUTES)
            .contains(&self.poll_interval_minutes)
        {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_minutes".to_string(),
                value: self.poll_interval_minutes.to_string(),
            });
        }
        if self.notification_volume > 100 {
            return Err(ConfigError::InvalidValue {
                field: "notification_volume".to_string(),
                value: self.notification_volume.to_string(),
            });
        }
        if self.history_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_cap".to_string(),
                value: "0".to_string(),
            });
        }
        for source in &self.sources {
            if url::Url::parse(source).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "sources".to_string(),
                    value: source.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn feed_sources(&self) -> Vec<FeedSource> {
        self.sources.iter().map(FeedSource::new).collect()
    }
}
