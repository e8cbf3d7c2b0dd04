//! Assembly of the ordered chunk stream into a WAV container.
//!
//! The container is only ever visible at the output path once it is
//! complete: bytes are written to a `<name>.part` sibling and renamed into
//! place after the stream ends cleanly and the header is finalized. Any
//! failure removes the partial file, so an interrupted run never leaves a
//! file that claims completeness.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::error::{AssemblyError, StreamFailure};
use super::request::SAMPLE_RATE_HZ;

/// The container is always mono.
pub const CHANNELS: u16 = 1;

/// The container always holds 16-bit samples.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Descriptor of a finished, finalized audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    /// Raw PCM payload size, excluding the container header.
    pub payload_bytes: u64,
    /// Number of chunks the stream delivered.
    pub chunks: u64,
}

fn part_path(output_path: &Path) -> PathBuf {
    let mut os = output_path.as_os_str().to_owned();
    os.push(".part");
    PathBuf::from(os)
}

fn discard_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial audio file");
        }
    }
}

/// Appends one chunk's bytes to the writer as 16-bit little-endian samples.
///
/// A sample may be split across a chunk boundary; the dangling byte is
/// carried into the next call.
fn write_chunk(
    writer: &mut hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    carry: &mut Option<u8>,
    chunk: &[u8],
) -> Result<(), hound::Error> {
    let mut data = chunk;

    if let Some(lo) = carry.take() {
        match data.split_first() {
            Some((&hi, rest)) => {
                writer.write_sample(i16::from_le_bytes([lo, hi]))?;
                data = rest;
            }
            None => {
                *carry = Some(lo);
                return Ok(());
            }
        }
    }

    let mut pairs = data.chunks_exact(2);
    for pair in &mut pairs {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    if let [dangling] = pairs.remainder() {
        *carry = Some(*dangling);
    }

    Ok(())
}

/// Consumes the chunk stream in arrival order and writes it into a WAV file
/// at `output_path` (mono, 22050 Hz, 16-bit).
///
/// Chunk bytes are appended verbatim — no resampling, no conversion; the
/// upstream service is trusted to emit PCM matching the declared header. A
/// zero-chunk stream still produces a valid, empty-payload container.
///
/// # Errors
///
/// Returns [`AssemblyError`] on any local I/O failure, on a mid-stream
/// [`StreamFailure`], or if the stream's total byte count is odd. In every
/// error case the partial file is removed and nothing remains at
/// `output_path`.
pub async fn assemble<S>(chunks: S, output_path: &Path) -> Result<AudioFile, AssemblyError>
where
    S: Stream<Item = Result<Bytes, StreamFailure>>,
{
    let part = part_path(output_path);
    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE_HZ,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer =
        hound::WavWriter::create(&part, spec).map_err(|source| AssemblyError::Create {
            path: part.clone(),
            source,
        })?;

    let mut carry: Option<u8> = None;
    let mut payload_bytes: u64 = 0;
    let mut chunk_count: u64 = 0;

    futures::pin_mut!(chunks);

    while let Some(next) = chunks.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(failure) => {
                drop(writer);
                discard_partial(&part);
                return Err(AssemblyError::Stream(failure));
            }
        };

        chunk_count += 1;
        payload_bytes += chunk.len() as u64;

        if let Err(source) = write_chunk(&mut writer, &mut carry, &chunk) {
            drop(writer);
            discard_partial(&part);
            return Err(AssemblyError::Write(source));
        }
    }

    if carry.is_some() {
        drop(writer);
        discard_partial(&part);
        return Err(AssemblyError::TruncatedSample {
            total_bytes: payload_bytes,
        });
    }

    // Header finalization happens strictly after the last sample; until this
    // point the file at the `.part` name does not claim completeness.
    if let Err(source) = writer.finalize() {
        discard_partial(&part);
        return Err(AssemblyError::Finalize(source));
    }

    if let Err(source) = std::fs::rename(&part, output_path) {
        discard_partial(&part);
        return Err(AssemblyError::Persist(source));
    }

    debug!(chunks = chunk_count, payload_bytes, "audio container finalized");
    info!(path = %output_path.display(), "saved synthesized audio");

    Ok(AudioFile {
        path: output_path.to_path_buf(),
        payload_bytes,
        chunks: chunk_count,
    })
}
