//! One synthesis session, end to end.
//!
//! Credential fetch → trace id → request metadata → synthesis request →
//! streaming session → WAV assembly. Each stage either succeeds or aborts
//! the run; there is no retry anywhere in this flow. Re-running means a
//! brand-new session with a fresh trace id.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::core::auth::TokenProvider;
use crate::core::synthesis::{
    assemble, build_request, AudioFile, ResponseMetadata, SynthesisSession,
};
use crate::core::trace::{RequestMetadata, TraceId};
use crate::errors::ClientResult;

/// Result of a completed synthesis session.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub file: AudioFile,
    /// Correlation ids reported by the service for this session.
    pub response_metadata: ResponseMetadata,
    /// The trace id this client generated for the session.
    pub trace_id: TraceId,
}

impl SynthesisOutcome {
    pub fn path(&self) -> &PathBuf {
        &self.file.path
    }
}

/// Runs one synthesis session and writes the result to the configured
/// output path.
///
/// # Errors
///
/// Propagates the first failure of any stage: [`AuthError`] before any RPC
/// is attempted, [`InvalidArgument`] for empty text or a bad credential,
/// [`StreamFailure`] from the session, [`AssemblyError`] from the container
/// write. A failed run leaves no file at the output path.
///
/// [`AuthError`]: crate::core::auth::AuthError
/// [`InvalidArgument`]: crate::errors::InvalidArgument
/// [`StreamFailure`]: crate::core::synthesis::StreamFailure
/// [`AssemblyError`]: crate::core::synthesis::AssemblyError
pub async fn synthesize_to_file(
    config: &Config,
    tokens: &dyn TokenProvider,
    text: &str,
) -> ClientResult<SynthesisOutcome> {
    let credential = tokens.fetch_token().await?;

    let trace_id = TraceId::generate();
    info!(trace_id = %trace_id, "starting synthesis session");

    let metadata = RequestMetadata::new(&credential, &trace_id)?;
    let request = build_request(text, &config.synthesis_options())?;

    let session = SynthesisSession::new(config.session_config());
    let active = session.start(request, &metadata).await?;
    let response_metadata = active.response_metadata().clone();

    let file = assemble(active.into_chunks(), &config.output_path).await?;

    info!(
        trace_id = %trace_id,
        request_id = response_metadata.request_id.as_deref().unwrap_or(""),
        path = %file.path.display(),
        payload_bytes = file.payload_bytes,
        "synthesis session completed"
    );

    Ok(SynthesisOutcome {
        file,
        response_metadata,
        trace_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SsoConfig;
    use crate::core::auth::MockTokenProvider;
    use crate::errors::ClientError;

    fn test_config(output: PathBuf) -> Config {
        Config {
            endpoint: "http://127.0.0.1:1".to_string(),
            voice: "gandzhaev".to_string(),
            connect_timeout_secs: 1,
            sso: SsoConfig {
                server_url: "http://127.0.0.1:1".to_string(),
                realm: "speech".to_string(),
                client_id: "vocalis".to_string(),
                client_secret: "s3cret".to_string(),
            },
            output_path: output,
            delivery: None,
        }
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_before_any_rpc() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never.wav");
        let config = test_config(out.clone());

        let tokens = MockTokenProvider::with_error("invalid client secret");
        let result = synthesize_to_file(&config, &tokens, "hello").await;

        assert!(matches!(result, Err(ClientError::Auth(_))));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_session() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never.wav");
        let config = test_config(out.clone());

        let tokens = MockTokenProvider::with_token("tok");
        let result = synthesize_to_file(&config, &tokens, "").await;

        assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_surfaces_stream_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never.wav");
        let config = test_config(out.clone());

        let tokens = MockTokenProvider::with_token("tok");
        let result = synthesize_to_file(&config, &tokens, "hello").await;

        assert!(matches!(result, Err(ClientError::Stream(_))));
        assert!(!out.exists());
    }
}
