//! The streaming synthesis core: request construction, the streaming RPC
//! session, and WAV assembly of the resulting chunk stream.

mod assembler;
mod error;
mod request;
mod session;

pub use assembler::{assemble, AudioFile, BITS_PER_SAMPLE, CHANNELS};
pub use error::{AssemblyError, StreamFailure};
pub use request::{build_request, SynthesisOptions, DEFAULT_VOICE, SAMPLE_RATE_HZ};
pub use session::{
    ActiveSession, AudioChunkStream, ResponseMetadata, SessionConfig, SessionState,
    SynthesisSession, RECONNECT_BACKOFF,
};
