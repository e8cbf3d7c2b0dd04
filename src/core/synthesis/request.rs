//! Synthesis request construction.
//!
//! The service contract has many fields; only the text varies per call.
//! Everything else is pinned here so the streaming code never has to care,
//! and so future caller-configurable options (voice, format) have one place
//! to land.

use crate::errors::InvalidArgument;
use crate::proto::v1::{
    synthesize_options::PostprocessingMode, AudioEncoding, SynthesizeOptions as ProtoOptions,
    SynthesizeSpeechRequest, VoiceStyle,
};

/// Output sample rate. Shared with the WAV assembler so the container header
/// always matches what was requested from the service.
pub const SAMPLE_RATE_HZ: u32 = 22_050;

/// Default voice identifier.
pub const DEFAULT_VOICE: &str = "gandzhaev";

/// Model variant requested from the service.
const DEFAULT_MODEL: &str = "default";

/// Caller-facing synthesis options.
///
/// Passed in explicitly (never read from process-wide state) so the request
/// builder stays testable with plain values.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Voice identifier sent to the service.
    pub voice: String,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

/// Builds the immutable synthesis request for one session.
///
/// The text is the only caller-varying input; encoding, sample rate, and the
/// post-processing options are fixed service-contract constants.
///
/// # Errors
///
/// Returns [`InvalidArgument`] if `text` is empty or whitespace-only.
pub fn build_request(
    text: &str,
    options: &SynthesisOptions,
) -> Result<SynthesizeSpeechRequest, InvalidArgument> {
    if text.trim().is_empty() {
        return Err(InvalidArgument(
            "synthesis text must not be empty".to_string(),
        ));
    }

    Ok(SynthesizeSpeechRequest {
        text: text.to_string(),
        encoding: AudioEncoding::LinearPcm as i32,
        sample_rate_hertz: SAMPLE_RATE_HZ as i32,
        voice_name: options.voice.clone(),
        synthesize_options: Some(ProtoOptions {
            postprocessing_mode: PostprocessingMode::PostProcessingDisable as i32,
            model_type: DEFAULT_MODEL.to_string(),
            voice_style: VoiceStyle::VoiceStyleNeutral as i32,
        }),
    })
}
