//! Delivery of the finished audio file to a Telegram chat.
//!
//! Called only after the assembler has finalized the container; a delivery
//! failure never invalidates the file on disk. One round trip, no retry.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DeliveryConfig;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const SEND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid delivery configuration: {0}")]
    Configuration(String),

    #[error("failed to read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected ({status}): {description}")]
    Rejected {
        status: StatusCode,
        description: String,
    },
}

/// Bot-style push of an audio file to a named chat.
pub struct TelegramDelivery {
    http: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramDelivery")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramDelivery {
    /// Creates a delivery client for the configured bot and chat.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Configuration`] if the bot token or chat id
    /// is empty, or the HTTP client cannot be built.
    pub fn new(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        if config.bot_token.trim().is_empty() || config.chat_id.trim().is_empty() {
            return Err(DeliveryError::Configuration(
                "bot token and chat id must not be empty".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| {
                DeliveryError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Overrides the API base URL. Used by tests to point at a local fake.
    #[doc(hidden)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Uploads the finished audio file via the bot `sendAudio` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the file cannot be read, the request
    /// fails in transit, or the API answers with a non-success status.
    pub async fn send_audio(&self, path: &Path) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        debug!(path = %path.display(), bytes = bytes.len(), "uploading audio file");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("audio", part);

        let url = format!("{}/bot{}/sendAudio", self.api_base, self.bot_token);
        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("description")
                        .and_then(|d| d.as_str())
                        .map(|s| s.to_string())
                })
                .unwrap_or(body);
            return Err(DeliveryError::Rejected {
                status,
                description,
            });
        }

        info!(chat_id = %self.chat_id, "audio delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn delivery_config() -> DeliveryConfig {
        DeliveryConfig {
            bot_token: "12345:abc".to_string(),
            chat_id: "-100200300".to_string(),
        }
    }

    fn write_fake_wav(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("audio.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"RIFF....WAVE").unwrap();
        path
    }

    #[test]
    fn test_new_rejects_empty_token() {
        let config = DeliveryConfig {
            bot_token: String::new(),
            chat_id: "-1".to_string(),
        };
        assert!(matches!(
            TelegramDelivery::new(&config),
            Err(DeliveryError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_redacts_bot_token() {
        let delivery = TelegramDelivery::new(&delivery_config()).unwrap();
        let rendered = format!("{delivery:?}");
        assert!(!rendered.contains("12345:abc"));
    }

    #[tokio::test]
    async fn test_send_audio_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot12345:abc/sendAudio"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = write_fake_wav(&dir);

        let delivery = TelegramDelivery::new(&delivery_config())
            .unwrap()
            .with_api_base(mock_server.uri());

        delivery.send_audio(&audio).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_audio_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = write_fake_wav(&dir);

        let delivery = TelegramDelivery::new(&delivery_config())
            .unwrap()
            .with_api_base(mock_server.uri());

        match delivery.send_audio(&audio).await {
            Err(DeliveryError::Rejected {
                status,
                description,
            }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert!(description.contains("blocked"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_audio_missing_file() {
        let delivery = TelegramDelivery::new(&delivery_config()).unwrap();
        let result = delivery
            .send_audio(Path::new("/nonexistent/audio.wav"))
            .await;
        assert!(matches!(result, Err(DeliveryError::Io(_))));
    }
}
