//! Bot configuration
//!
//! Layered with figment: built-in defaults, an optional TOML file, the
//! bare `BOT_TOKEN`/`API_TOKEN`/`MODEL`/`MODEL_VERSION` variables, and
//! finally `PHOTOBOT_*` variables for any key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "photobot.toml";

/// Environment variables read without a prefix
const RAW_ENV_KEYS: [&str; 4] = ["BOT_TOKEN", "API_TOKEN", "MODEL", "MODEL_VERSION"];

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: String,
    /// Replicate API token
    pub api_token: String,
    /// Replicate model identifier (`owner/name`)
    pub model: String,
    /// Replicate model version hash
    pub model_version: String,
    /// Root of the references/ and generated/ directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_replicate_api_url")]
    pub replicate_api_url: String,
    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_prediction_poll_interval_ms")]
    pub prediction_poll_interval_ms: u64,
    /// Upper bound on a single prediction, including polling
    #[serde(default = "default_prediction_timeout_secs")]
    pub prediction_timeout_secs: u64,
    /// Simultaneous backend calls across all users
    #[serde(default = "default_max_concurrent_generations")]
    pub max_concurrent_generations: usize,
    /// Abandoned conversations are dropped after this long
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Timeout for Replicate polls and output downloads
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Pause after a failed getUpdates
    #[serde(default = "default_poll_retry_delay_ms")]
    pub poll_retry_delay_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_replicate_api_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_prediction_poll_interval_ms() -> u64 {
    1000
}

fn default_prediction_timeout_secs() -> u64 {
    600
}

fn default_max_concurrent_generations() -> usize {
    4
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_poll_retry_delay_ms() -> u64 {
    5000
}

/// Optional settings with their defaults, merged first so that every
/// later provider only has to supply what it overrides.
#[derive(Serialize)]
struct Defaults {
    data_dir: PathBuf,
    telegram_api_url: String,
    replicate_api_url: String,
    poll_timeout_secs: u64,
    prediction_poll_interval_ms: u64,
    prediction_timeout_secs: u64,
    max_concurrent_generations: usize,
    session_ttl_secs: u64,
    http_timeout_secs: u64,
    poll_retry_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            telegram_api_url: default_telegram_api_url(),
            replicate_api_url: default_replicate_api_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            prediction_poll_interval_ms: default_prediction_poll_interval_ms(),
            prediction_timeout_secs: default_prediction_timeout_secs(),
            max_concurrent_generations: default_max_concurrent_generations(),
            session_ttl_secs: default_session_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            poll_retry_delay_ms: default_poll_retry_delay_ms(),
        }
    }
}

impl Config {
    /// Build the figment used by [`Config::load`]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Defaults::default()))
            .merge(Toml::file(file))
            .merge(Env::raw().only(&RAW_ENV_KEYS))
            .merge(Env::prefixed("PHOTOBOT_"))
    }

    /// Load configuration. Missing required values are an error.
    pub fn load(config_file: Option<&Path>) -> Result<Self, figment::Error> {
        let config: Config = Self::figment(config_file).extract()?;
        Ok(config)
    }

    /// Model reference as `owner/name:version`
    pub fn model_ref(&self) -> String {
        format!("{}:{}", self.model, self.model_version)
    }

    pub fn references_dir(&self) -> PathBuf {
        self.data_dir.join("references")
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.data_dir.join("generated")
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn prediction_poll_interval(&self) -> Duration {
        Duration::from_millis(self.prediction_poll_interval_ms)
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_secs(self.prediction_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_retry_delay(&self) -> Duration {
        Duration::from_millis(self.poll_retry_delay_ms)
    }
}
