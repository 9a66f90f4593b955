//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;
use crate::application::services::bot::DEFAULT_MAX_CONCURRENT;
use crate::application::services::KeepaliveSettings;
use crate::domain::entities::HELP_KEYWORD;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub rtm: RtmConfig,
    pub keepalive: KeepaliveConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub help_keyword: String,
}

/// Session negotiation and streaming connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RtmConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub origin: String,
    pub connect_timeout_secs: u64,
    pub tcp_keepalive_secs: u64,
    pub tls_handshake_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KeepaliveConfig {
    pub initial_delay_secs: u64,
    pub interval_secs: u64,
    pub ack_timeout_secs: u64,
    pub first_id: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatchConfig {
    pub max_concurrent: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "rtm-bot".to_string(),
            help_keyword: HELP_KEYWORD.to_string(),
        }
    }
}

impl Default for RtmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api/rtm.start".to_string(),
            token: None,
            origin: "https://api.slack.com/".to_string(),
            connect_timeout_secs: 30,
            tcp_keepalive_secs: 30,
            tls_handshake_timeout_secs: 15,
            request_timeout_secs: 30,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        let settings = KeepaliveSettings::default();
        Self {
            initial_delay_secs: settings.initial_delay.as_secs(),
            interval_secs: settings.interval.as_secs(),
            ack_timeout_secs: settings.ack_timeout.as_secs(),
            first_id: settings.first_id,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl RtmConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Upper bound for dialing plus the TLS and websocket handshakes
    pub fn upgrade_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.saturating_add(self.tls_handshake_timeout_secs))
    }
}

impl From<&KeepaliveConfig> for KeepaliveSettings {
    fn from(config: &KeepaliveConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            interval: Duration::from_secs(config.interval_secs),
            ack_timeout: Duration::from_secs(config.ack_timeout_secs),
            first_id: config.first_id,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Override settings from `RTM_TOKEN` and `RTM_API_URL`
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("RTM_TOKEN") {
            self.rtm.token = Some(token);
        }

        if let Ok(url) = std::env::var("RTM_API_URL") {
            self.rtm.api_url = url;
        }
    }

    /// Token for the session API, rejecting blank values
    pub fn token(&self) -> Result<&str, ConfigError> {
        match self.rtm.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ConfigError::MissingField("rtm.token".to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.help_keyword.trim().is_empty() {
            return Err(ConfigError::InvalidValue("bot.help-keyword must not be empty".to_string()));
        }
        if !self.rtm.api_url.starts_with("http://") && !self.rtm.api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(format!("rtm.api-url is not an http(s) url: {}", self.rtm.api_url)));
        }
        let timeouts = [
            ("rtm.connect-timeout-secs", self.rtm.connect_timeout_secs),
            ("rtm.tls-handshake-timeout-secs", self.rtm.tls_handshake_timeout_secs),
            ("rtm.request-timeout-secs", self.rtm.request_timeout_secs),
            ("keepalive.interval-secs", self.keepalive.interval_secs),
            ("keepalive.ack-timeout-secs", self.keepalive.ack_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::InvalidValue(format!("{} must be greater than zero", name)));
        }
        if self.dispatch.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue("dispatch.max-concurrent must be greater than zero".to_string()));
        }
        Ok(())
    }
}
