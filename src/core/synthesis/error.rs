use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::session::ResponseMetadata;

/// A streaming session failure: transport trouble, a server error status, or
/// a configuration problem that prevented the call entirely.
///
/// Where the session got far enough to capture the server's initial response
/// metadata, the failure carries it so operators can correlate with
/// server-side logs.
#[derive(Debug, Error)]
pub enum StreamFailure {
    /// The endpoint URL or TLS setup is invalid; no connection was attempted.
    #[error("invalid session configuration: {0}")]
    Configuration(String),

    /// The endpoint never became reachable within the readiness window.
    #[error("synthesis endpoint unreachable: {message}")]
    Unreachable { message: String },

    /// The service rejected the call's credentials.
    #[error("authentication rejected by service: {message}")]
    Unauthenticated {
        message: String,
        response_metadata: Option<ResponseMetadata>,
    },

    /// The call ran out of time.
    #[error("deadline exceeded: {message}")]
    DeadlineExceeded {
        message: String,
        response_metadata: Option<ResponseMetadata>,
    },

    /// The server terminated the call with an error status.
    #[error("server status {code}: {message}")]
    Status {
        code: tonic::Code,
        message: String,
        response_metadata: Option<ResponseMetadata>,
    },

    /// The transport dropped mid-call.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        response_metadata: Option<ResponseMetadata>,
    },
}

impl StreamFailure {
    /// Response metadata captured before the failure, if any.
    pub fn response_metadata(&self) -> Option<&ResponseMetadata> {
        match self {
            StreamFailure::Configuration(_) | StreamFailure::Unreachable { .. } => None,
            StreamFailure::Unauthenticated {
                response_metadata, ..
            }
            | StreamFailure::DeadlineExceeded {
                response_metadata, ..
            }
            | StreamFailure::Status {
                response_metadata, ..
            }
            | StreamFailure::Transport {
                response_metadata, ..
            } => response_metadata.as_ref(),
        }
    }

    /// Maps a gRPC status into the failure taxonomy, attaching whatever
    /// response metadata was captured before the status arrived.
    pub(crate) fn from_status(
        status: tonic::Status,
        response_metadata: Option<ResponseMetadata>,
    ) -> Self {
        let message = status.message().to_string();
        match status.code() {
            tonic::Code::Unauthenticated | tonic::Code::PermissionDenied => {
                error!(code = ?status.code(), message = %message, "service rejected credentials");
                StreamFailure::Unauthenticated {
                    message,
                    response_metadata,
                }
            }
            tonic::Code::DeadlineExceeded => {
                warn!(message = %message, "synthesis call exceeded its deadline");
                StreamFailure::DeadlineExceeded {
                    message,
                    response_metadata,
                }
            }
            tonic::Code::Unavailable => {
                warn!(message = %message, "synthesis service unavailable mid-call");
                StreamFailure::Transport {
                    message,
                    response_metadata,
                }
            }
            code => {
                debug!(code = ?code, message = %message, "synthesis call failed with server status");
                StreamFailure::Status {
                    code,
                    message,
                    response_metadata,
                }
            }
        }
    }
}

/// Failure while assembling the chunk stream into the WAV container.
///
/// Whatever the cause, no valid file remains at the output path afterwards:
/// the assembler writes to a temporary name and only renames on success.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("failed to create output file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("failed to append audio samples: {0}")]
    Write(#[source] hound::Error),

    #[error("failed to finalize audio container: {0}")]
    Finalize(#[source] hound::Error),

    #[error("failed to move finished file into place: {0}")]
    Persist(#[source] std::io::Error),

    /// The stream delivered an odd number of bytes in total; a 16-bit PCM
    /// container cannot hold half a sample.
    #[error("audio stream ended on a half sample ({total_bytes} bytes total)")]
    TruncatedSample { total_bytes: u64 },

    /// The chunk stream itself failed mid-assembly.
    #[error(transparent)]
    Stream(#[from] StreamFailure),
}
