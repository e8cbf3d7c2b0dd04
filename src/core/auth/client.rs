use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::SsoConfig;

use super::error::{AuthError, AuthResult};

/// Timeout for the token round trip. The identity provider either answers
/// quickly or not at all; there is no retry here.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cap error bodies quoted back to the operator.
const MAX_ERROR_BODY_LEN: usize = 500;

/// A bearer token obtained from the identity provider.
///
/// Scoped to a single synthesis session; dropped when the session ends.
#[derive(Clone)]
pub struct Credential {
    access_token: String,
    expires_in_secs: u64,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_in_secs: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in_secs,
        }
    }

    /// The raw bearer token, without the `Bearer ` prefix.
    pub fn token(&self) -> &str {
        &self.access_token
    }

    /// Provider-reported lifetime. Informational only: this client never
    /// refreshes a token, it fetches a fresh one per session.
    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in_secs
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Trait seam for bearer-token acquisition.
///
/// Production code uses [`IdentityClient`]; tests substitute a fake so the
/// streaming pipeline can run without a reachable identity provider.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Performs one credential exchange and returns the resulting token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the provider is unreachable, rejects the
    /// credentials, or answers with an unparseable payload. Failures are
    /// surfaced immediately; no retry is attempted.
    async fn fetch_token(&self) -> AuthResult<Credential>;
}

/// Shape of the provider's token response. Only the fields this client
/// consumes are modeled.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// HTTP client for the OAuth2 client-credentials grant against a
/// Keycloak-style identity provider.
///
/// The token endpoint is derived from the issuer URL and realm:
/// `{server_url}/realms/{realm}/protocol/openid-connect/token`. TLS
/// certificate validation is always on; there is deliberately no knob to
/// disable it.
pub struct IdentityClient {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl IdentityClient {
    /// Creates a client for the configured identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if any of the required fields
    /// (server URL, realm, client id, client secret) is empty.
    pub fn new(config: &SsoConfig) -> AuthResult<Self> {
        if config.server_url.trim().is_empty() {
            return Err(AuthError::Configuration(
                "SSO server URL is not configured".to_string(),
            ));
        }
        if config.realm.trim().is_empty() {
            return Err(AuthError::Configuration(
                "SSO realm is not configured".to_string(),
            ));
        }
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(AuthError::Configuration(
                "SSO client id/secret are not configured".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to create HTTP client: {e}")))?;

        let token_url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            config.server_url.trim_end_matches('/'),
            config.realm
        );

        Ok(Self {
            http,
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for IdentityClient {
    async fn fetch_token(&self) -> AuthResult<Credential> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnreachable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            let capped = if body.len() > MAX_ERROR_BODY_LEN {
                format!("{}... (truncated)", &body[..MAX_ERROR_BODY_LEN])
            } else {
                body
            };
            return Err(AuthError::Rejected {
                status,
                body: capped,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(AuthError::MalformedResponse(
                "provider returned an empty access_token".to_string(),
            ));
        }

        debug!(expires_in = token.expires_in, "obtained access token");

        Ok(Credential::new(token.access_token, token.expires_in))
    }
}

/// A token provider for tests: returns a fixed token or a fixed error.
#[cfg(test)]
pub(crate) struct MockTokenProvider {
    pub token: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
impl MockTokenProvider {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            error: None,
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            token: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl TokenProvider for MockTokenProvider {
    async fn fetch_token(&self) -> AuthResult<Credential> {
        if let Some(ref error) = self.error {
            Err(AuthError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                body: error.clone(),
            })
        } else if let Some(ref token) = self.token {
            Ok(Credential::new(token.clone(), 300))
        } else {
            Err(AuthError::Configuration(
                "mock provider not configured".to_string(),
            ))
        }
    }
}
