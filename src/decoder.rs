//! Decode pipeline: SSTV audio (file or microphone) in, image file out.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::assets;
use crate::audio;
use crate::capture::{self, CancelToken, CaptureBackend};
use crate::codec::{DecodedImage, SstvCodec};
use crate::error::{ErrorKind, Result};
use crate::imaging;

/// Bit depth handed to the demodulator; samples are always 16-bit by then.
const DECODE_BIT_DEPTH: u16 = 16;

/// Where the audio to decode comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeSource {
    File(PathBuf),
    /// Record this many seconds from the microphone. The capture is
    /// staged in `recording` and removed once decoding finishes.
    Live {
        duration_secs: f64,
        recording: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub source: DecodeSource,
    pub output: PathBuf,
}

impl DecodeRequest {
    pub fn file(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: DecodeSource::File(source.into()),
            output: output.into(),
        }
    }

    pub fn live(
        duration_secs: f64,
        recording: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: DecodeSource::Live {
                duration_secs,
                recording: recording.into(),
            },
            output: output.into(),
        }
    }
}

/// Outcome of [`decode`]. On failure no image exists at the output path.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Mode announced by the transmission's VIS header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// Decode using the platform's capture backend for live requests.
pub fn decode(codec: &dyn SstvCodec, request: &DecodeRequest) -> DecodeResult {
    let backend = capture::platform_backend(None);
    decode_with(codec, request, backend.as_deref(), &CancelToken::new())
}

/// Decode with an explicit capture backend and cancel token. File requests
/// ignore both.
pub fn decode_with(
    codec: &dyn SstvCodec,
    request: &DecodeRequest,
    backend: Option<&dyn CaptureBackend>,
    cancel: &CancelToken,
) -> DecodeResult {
    let outcome = match &request.source {
        DecodeSource::File(path) => decode_file(codec, path, &request.output),
        DecodeSource::Live {
            duration_secs,
            recording,
        } => decode_live(codec, backend, *duration_secs, cancel, recording, &request.output),
    };

    match outcome {
        Ok(decoded) => {
            log::info!(
                "Decoded {} image into '{}'",
                decoded.mode,
                request.output.display()
            );
            DecodeResult {
                success: true,
                output_path: Some(request.output.clone()),
                mode: Some(decoded.mode.name().to_string()),
                error: None,
                error_kind: None,
            }
        }
        Err(e) => {
            log::error!("Decoding failed: {}", e);
            DecodeResult {
                success: false,
                output_path: None,
                mode: None,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
            }
        }
    }
}

fn decode_file(codec: &dyn SstvCodec, source: &Path, output: &Path) -> Result<DecodedImage> {
    let buffer = audio::read_wav(source)?;
    log::debug!(
        "Read {} samples, {} channel(s) at {} Hz from '{}'",
        buffer.samples.len(),
        buffer.channels,
        buffer.sample_rate,
        source.display()
    );
    let mono = buffer.downmix();
    let pcm = audio::to_pcm16(&mono);

    let mut demodulator = codec.demodulator(buffer.sample_rate, DECODE_BIT_DEPTH);
    demodulator.write_audio(&pcm);
    let decoded = demodulator.render()?;

    if let Err(e) = imaging::save(&decoded.image, output) {
        // Saving can fail after the file was created.
        assets::delete(output);
        return Err(e);
    }
    Ok(decoded)
}

fn decode_live(
    codec: &dyn SstvCodec,
    backend: Option<&dyn CaptureBackend>,
    duration_secs: f64,
    cancel: &CancelToken,
    recording: &Path,
    output: &Path,
) -> Result<DecodedImage> {
    let (samples, sample_rate) = capture::capture_with(backend, duration_secs, cancel)?;

    let recording = TransientFile(recording);
    audio::write_pcm(recording.0, &audio::to_pcm16(&samples), sample_rate, DECODE_BIT_DEPTH)?;
    decode_file(codec, recording.0, output)
}

/// Removes the file when dropped, whatever the outcome.
struct TransientFile<'a>(&'a Path);

impl Drop for TransientFile<'_> {
    fn drop(&mut self) {
        assets::delete(self.0);
    }
}
