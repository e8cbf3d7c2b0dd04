use thiserror::Error;

use crate::config::ConfigError;
use crate::core::auth::AuthError;
use crate::core::synthesis::{AssemblyError, StreamFailure};
use crate::delivery::DeliveryError;

/// A caller-supplied value violated a precondition (empty text, empty
/// credential, and so on). No I/O was performed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

/// Top-level error for one synthesis run.
///
/// Every layer propagates its failure unchanged; nothing is retried or
/// swallowed below this boundary. `main` reports the kind (and any captured
/// response metadata, see [`StreamFailure::response_metadata`]) and exits
/// non-zero.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The credential exchange with the identity provider failed. No RPC was
    /// attempted.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    /// The streaming call failed before the first chunk was consumed.
    #[error(transparent)]
    Stream(#[from] StreamFailure),

    /// Writing the audio container failed, or the chunk stream broke
    /// mid-assembly. No valid file remains at the output path.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The finished file could not be pushed to the delivery endpoint. The
    /// assembled file itself is intact.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Response metadata captured before the failure, if the session got far
    /// enough to receive any. Useful for correlating with server-side logs.
    pub fn response_metadata(&self) -> Option<&crate::core::synthesis::ResponseMetadata> {
        match self {
            ClientError::Stream(failure) => failure.response_metadata(),
            ClientError::Assembly(AssemblyError::Stream(failure)) => failure.response_metadata(),
            _ => None,
        }
    }
}
