//! Shared fixtures for integration tests: an in-process fake synthesis
//! service and a canned token provider.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

use vocalis::core::auth::AuthResult;
use vocalis::proto::v1::tts_server::{Tts, TtsServer};
use vocalis::proto::v1::{SynthesisChunk, SynthesizeSpeechRequest};
use vocalis::{Config, Credential, SsoConfig, TokenProvider};

/// One call observed by the fake service: the decoded request plus the
/// request metadata the client attached.
pub struct SeenCall {
    pub request: SynthesizeSpeechRequest,
    pub metadata: MetadataMap,
}

/// Fake synthesis service: replies with fixed response metadata, a fixed
/// chunk sequence, and optionally an error status after the first N chunks.
pub struct FakeTts {
    pub request_id: String,
    pub trace_id: String,
    pub chunks: Vec<Vec<u8>>,
    pub fail_after: Option<usize>,
    pub calls: Arc<Mutex<Vec<SeenCall>>>,
}

impl FakeTts {
    pub fn new(request_id: &str, trace_id: &str, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            request_id: request_id.to_string(),
            trace_id: trace_id.to_string(),
            chunks,
            fail_after: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<SeenCall>>> {
        self.calls.clone()
    }
}

#[tonic::async_trait]
impl Tts for FakeTts {
    type StreamingSynthesizeStream =
        Pin<Box<dyn Stream<Item = Result<SynthesisChunk, Status>> + Send>>;

    async fn streaming_synthesize(
        &self,
        request: Request<SynthesizeSpeechRequest>,
    ) -> Result<Response<Self::StreamingSynthesizeStream>, Status> {
        let metadata = request.metadata().clone();
        let request = request.into_inner();
        self.calls.lock().await.push(SeenCall { request, metadata });

        let mut items: Vec<Result<SynthesisChunk, Status>> = self
            .chunks
            .iter()
            .map(|audio| Ok(SynthesisChunk {
                audio: audio.clone(),
            }))
            .collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(Status::internal("synthesis backend failed")));
        }

        let stream: Self::StreamingSynthesizeStream = Box::pin(futures::stream::iter(items));

        let mut response = Response::new(stream);
        response
            .metadata_mut()
            .insert("request_id", self.request_id.parse().unwrap());
        response
            .metadata_mut()
            .insert("external_trace_id", self.trace_id.parse().unwrap());
        Ok(response)
    }
}

/// Serves the fake on an ephemeral local port and returns its address.
pub async fn spawn_tts(fake: FakeTts) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(TtsServer::new(fake))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    addr
}

/// Token provider that hands out a fixed token without any network I/O.
pub struct StaticTokenProvider(pub &'static str);

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> AuthResult<Credential> {
        Ok(Credential::new(self.0, 300))
    }
}

pub fn test_config(addr: SocketAddr, output: PathBuf) -> Config {
    Config {
        endpoint: format!("http://{addr}"),
        voice: "gandzhaev".to_string(),
        connect_timeout_secs: 5,
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

pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<u8>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let payload: Vec<u8> = reader
        .samples::<i16>()
        .map(|s| s.unwrap().to_le_bytes())
        .flat_map(|b| b.into_iter())
        .collect();
    (spec, payload)
}
