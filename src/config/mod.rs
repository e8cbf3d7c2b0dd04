//! Client configuration.
//!
//! Configuration comes from a YAML file, environment variables, or both.
//! Environment variables always override file values, file values override
//! defaults. Everything the core needs (service address, identity provider,
//! voice, output path) travels as an explicit [`Config`] value — nothing is
//! read from process-wide state past this module.
//!
//! # Example
//! ```rust,no_run
//! use vocalis::config::Config;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Environment variables only
//! let config = Config::from_env()?;
//!
//! // YAML file with environment overrides
//! let config = Config::from_file(Path::new("config.yaml"))?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core::synthesis::{SessionConfig, SynthesisOptions, DEFAULT_VOICE};

/// Default output file name when neither configuration nor CLI overrides it.
pub const DEFAULT_OUTPUT_PATH: &str = "synthesized_audio.wav";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Identity provider settings for the client-credentials grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoConfig {
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Telegram delivery settings. Present only when delivery is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Synthesis service endpoint, e.g. `https://tts.example.com:443`.
    pub endpoint: String,

    /// Voice identifier sent with each request.
    pub voice: String,

    /// Bound on the readiness wait when connecting. `0` means wait
    /// indefinitely, matching the service's original channel contract.
    pub connect_timeout_secs: u64,

    pub sso: SsoConfig,

    pub output_path: PathBuf,

    pub delivery: Option<DeliveryConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    tts: Option<YamlTts>,
    sso: Option<YamlSso>,
    output_path: Option<String>,
    telegram: Option<YamlTelegram>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlTts {
    endpoint: Option<String>,
    voice: Option<String>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlSso {
    server_url: Option<String>,
    realm: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlTelegram {
    bot_token: Option<String>,
    chat_id: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(YamlConfig::default())
    }

    /// Loads configuration from a YAML file, then applies environment
    /// variable overrides.
    ///
    /// Priority order (highest to lowest): environment variables, file
    /// values, defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: YamlConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::build(raw)
    }

    fn build(raw: YamlConfig) -> Result<Self, ConfigError> {
        let tts = raw.tts.unwrap_or_default();
        let sso = raw.sso.unwrap_or_default();
        let telegram = raw.telegram.unwrap_or_default();

        let config = Self {
            endpoint: env_var("TTS_ENDPOINT").or(tts.endpoint).unwrap_or_default(),
            voice: env_var("TTS_VOICE")
                .or(tts.voice)
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            connect_timeout_secs: match env_var("TTS_CONNECT_TIMEOUT_SECS") {
                Some(v) => v.parse().map_err(|_| {
                    ConfigError::Validation(format!(
                        "TTS_CONNECT_TIMEOUT_SECS must be a number, got '{v}'"
                    ))
                })?,
                None => tts.connect_timeout_secs.unwrap_or(0),
            },
            sso: SsoConfig {
                server_url: env_var("SSO_SERVER_URL")
                    .or(sso.server_url)
                    .unwrap_or_default(),
                realm: env_var("SSO_REALM").or(sso.realm).unwrap_or_default(),
                client_id: env_var("SSO_CLIENT_ID")
                    .or(sso.client_id)
                    .unwrap_or_default(),
                client_secret: env_var("SSO_CLIENT_SECRET")
                    .or(sso.client_secret)
                    .unwrap_or_default(),
            },
            output_path: PathBuf::from(
                env_var("OUTPUT_PATH")
                    .or(raw.output_path)
                    .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
            ),
            delivery: match (
                env_var("TELEGRAM_BOT_TOKEN").or(telegram.bot_token),
                env_var("TELEGRAM_CHAT_ID").or(telegram.chat_id),
            ) {
                (Some(bot_token), Some(chat_id)) => Some(DeliveryConfig { bot_token, chat_id }),
                (None, None) => None,
                _ => {
                    return Err(ConfigError::Validation(
                        "telegram delivery needs both bot_token and chat_id".to_string(),
                    ));
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "TTS endpoint is not configured (set TTS_ENDPOINT or tts.endpoint)".to_string(),
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "TTS endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        Ok(())
    }

    /// Session settings for the streaming call.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.endpoint.clone(),
            connect_timeout: match self.connect_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    /// Per-request synthesis options.
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            voice: self.voice.clone(),
        }
    }
}
