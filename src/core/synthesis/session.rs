//! Lifecycle of one streaming synthesis call.
//!
//! A session moves `Idle → Connecting → AwaitingResponseMetadata →
//! Streaming → Completed`, with `Errored` reachable from any non-terminal
//! state. The phases are enforced twice over: [`SessionState`] records the
//! current phase for diagnostics, and the API itself is consuming —
//! [`SynthesisSession::start`] swallows the session and hands back an
//! [`ActiveSession`], so reading chunks before the call is dispatched is a
//! compile error rather than a runtime surprise.
//!
//! The channel is tuned the way the service wants it: constant (not
//! exponential) reconnect backoff, no cap on message sizes in either
//! direction, and a readiness wait instead of failing fast while the
//! endpoint is still coming up.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::time::Instant;
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, ClientTlsConfig};
use tracing::{debug, info, warn};

use crate::core::trace::{RequestMetadata, TRACE_ID_KEY};
use crate::proto::v1::tts_client::TtsClient;
use crate::proto::v1::{SynthesisChunk, SynthesizeSpeechRequest};

use super::error::StreamFailure;

/// Fixed interval between connection attempts while waiting for the endpoint
/// to become ready. Deliberately constant, matching the service's channel
/// tuning, not exponential.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Metadata key under which the service reports its own request identifier.
const REQUEST_ID_KEY: &str = "request_id";

/// Phase of a streaming session. Terminal states are `Completed` and
/// `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    AwaitingResponseMetadata,
    Streaming,
    Completed,
    Errored,
}

/// Connection settings for one session, passed in explicitly so the session
/// is testable against in-process fakes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Endpoint URL, e.g. `https://tts.example.com:443`. TLS is applied for
    /// `https` endpoints; plaintext is accepted for local testing.
    pub endpoint: String,

    /// Bound on the readiness wait. `None` preserves the service's original
    /// contract of blocking until the endpoint comes up, however long that
    /// takes.
    pub connect_timeout: Option<Duration>,
}

/// Correlation identifiers delivered in the initial response metadata,
/// before the first audio chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    /// Server-assigned request identifier.
    pub request_id: Option<String>,
    /// The trace id echoed back by the service.
    pub trace_id: Option<String>,
}

impl ResponseMetadata {
    pub(crate) fn from_metadata(map: &MetadataMap) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        Self {
            request_id: get(REQUEST_ID_KEY),
            trace_id: get(TRACE_ID_KEY),
        }
    }
}

/// One streaming RPC call, not yet started.
#[derive(Debug)]
pub struct SynthesisSession {
    config: SessionConfig,
    state: SessionState,
}

impl SynthesisSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Establishes the channel, dispatches the request with its metadata,
    /// and waits for the server's initial response metadata.
    ///
    /// Consumes the session: exactly one call, exactly one chunk sequence.
    /// Retrying is a caller decision and means a brand-new session with a
    /// fresh trace id.
    ///
    /// # Errors
    ///
    /// Returns [`StreamFailure`] if the endpoint configuration is invalid,
    /// the readiness wait is exhausted, or the server rejects the call.
    pub async fn start(
        mut self,
        request: SynthesizeSpeechRequest,
        metadata: &RequestMetadata,
    ) -> Result<ActiveSession, StreamFailure> {
        self.state = SessionState::Connecting;
        debug!(endpoint = %self.config.endpoint, "connecting to synthesis endpoint");

        let channel = self.connect().await?;

        // The service's payloads can exceed default transport limits; lift
        // the caps in both directions.
        let mut client = TtsClient::new(channel)
            .max_decoding_message_size(usize::MAX)
            .max_encoding_message_size(usize::MAX);

        self.state = SessionState::AwaitingResponseMetadata;

        let mut call = tonic::Request::new(request);
        metadata.apply(call.metadata_mut());

        let response = client
            .streaming_synthesize(call)
            .await
            .map_err(|status| StreamFailure::from_status(status, None))?;

        let (headers, stream, _extensions) = response.into_parts();
        let response_metadata = ResponseMetadata::from_metadata(&headers);

        info!(
            request_id = response_metadata.request_id.as_deref().unwrap_or(""),
            trace_id = response_metadata.trace_id.as_deref().unwrap_or(""),
            "synthesis stream opened"
        );

        Ok(ActiveSession {
            response_metadata: response_metadata.clone(),
            chunks: AudioChunkStream {
                inner: stream,
                response_metadata,
                state: SessionState::Streaming,
                received: 0,
            },
        })
    }

    /// Readiness wait: retries the connection at a fixed interval until the
    /// endpoint accepts, or the configured bound runs out.
    async fn connect(&self) -> Result<Channel, StreamFailure> {
        let endpoint = Channel::from_shared(self.config.endpoint.clone()).map_err(|e| {
            StreamFailure::Configuration(format!(
                "invalid endpoint URL '{}': {e}",
                self.config.endpoint
            ))
        })?;

        let endpoint = if self.config.endpoint.starts_with("https://") {
            endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| {
                    StreamFailure::Configuration(format!("failed to configure TLS: {e}"))
                })?
        } else {
            endpoint
        };

        let deadline = self.config.connect_timeout.map(|t| Instant::now() + t);
        let mut attempt: u32 = 0;

        loop {
            match endpoint.connect().await {
                Ok(channel) => {
                    debug!(endpoint = %self.config.endpoint, attempt, "synthesis endpoint ready");
                    return Ok(channel);
                }
                Err(e) => {
                    attempt += 1;
                    if let Some(deadline) = deadline {
                        if Instant::now() + RECONNECT_BACKOFF >= deadline {
                            return Err(StreamFailure::Unreachable {
                                message: format!("gave up after {attempt} attempts: {e}"),
                            });
                        }
                    }
                    warn!(error = %e, attempt, "synthesis endpoint not ready; retrying");
                    tokio::time::sleep(RECONNECT_BACKOFF).await;
                }
            }
        }
    }
}

/// A session past the metadata handshake: the captured correlation ids plus
/// the chunk stream.
pub struct ActiveSession {
    response_metadata: ResponseMetadata,
    chunks: AudioChunkStream,
}

impl ActiveSession {
    pub fn response_metadata(&self) -> &ResponseMetadata {
        &self.response_metadata
    }

    /// Hands over the chunk stream. Forward-only, single consumption: each
    /// chunk can be read exactly once, in arrival order, and the sequence is
    /// not restartable.
    pub fn into_chunks(self) -> AudioChunkStream {
        self.chunks
    }
}

/// The ordered audio chunk sequence of one session.
///
/// Yields chunks exactly as the transport delivers them: no reordering, no
/// deduplication, no buffering of the whole stream. A transport failure or
/// server error status ends the stream with a single [`StreamFailure`]
/// carrying whatever response metadata was captured.
pub struct AudioChunkStream {
    inner: tonic::codec::Streaming<SynthesisChunk>,
    response_metadata: ResponseMetadata,
    state: SessionState,
    received: u64,
}

impl AudioChunkStream {
    /// Current phase: `Streaming` until the server signals end-of-stream
    /// (`Completed`) or fails (`Errored`).
    pub fn state(&self) -> SessionState {
        self.state
    }
}

impl Stream for AudioChunkStream {
    type Item = Result<Bytes, StreamFailure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if matches!(this.state, SessionState::Completed | SessionState::Errored) {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.received += 1;
                debug!(
                    chunk = this.received,
                    bytes = chunk.audio.len(),
                    "received audio chunk"
                );
                Poll::Ready(Some(Ok(Bytes::from(chunk.audio))))
            }
            Poll::Ready(Some(Err(status))) => {
                this.state = SessionState::Errored;
                let failure =
                    StreamFailure::from_status(status, Some(this.response_metadata.clone()));
                Poll::Ready(Some(Err(failure)))
            }
            Poll::Ready(None) => {
                this.state = SessionState::Completed;
                debug!(chunks = this.received, "synthesis stream completed");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
