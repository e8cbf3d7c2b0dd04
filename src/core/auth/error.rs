use thiserror::Error;

/// Errors raised while exchanging client credentials for a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The exchange cannot be attempted: required configuration is missing
    /// or empty.
    #[error("invalid auth configuration: {0}")]
    Configuration(String),

    /// The identity provider could not be reached, or the request failed in
    /// transit (DNS, TLS, timeout).
    #[error("identity provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// The provider answered with a non-success status: invalid secret,
    /// unknown client, disabled realm, and so on.
    #[error("credential exchange rejected ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The provider answered 200 but the token payload could not be parsed.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
