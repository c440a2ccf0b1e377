//! Encode pipeline: image file in, SSTV WAV file out.

use serde::Serialize;
use std::path::PathBuf;

use crate::audio;
use crate::codec::SstvCodec;
use crate::error::{ErrorKind, Result};
use crate::imaging;
use crate::modes::SstvMode;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_BIT_DEPTH: u16 = 16;

/// One image to encode.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub mode_name: String,
    pub sample_rate: u32,
    pub bit_depth: u16,
}

impl EncodeRequest {
    /// A request at 44100 Hz, 16-bit.
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>, mode_name: &str) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            mode_name: mode_name.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: DEFAULT_BIT_DEPTH,
        }
    }
}

/// Outcome of [`encode`]. Exactly one of `output_path` and `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub mode: String,
    pub sample_rate: u32,
    pub bit_depth: u16,
}

/// Encode `request.source` into `request.output`.
///
/// Never fails: any error is reported in the returned result.
pub fn encode(codec: &dyn SstvCodec, request: &EncodeRequest) -> EncodeResult {
    let outcome = run(codec, request);
    let (output_path, error, error_kind) = match outcome {
        Ok(path) => {
            log::info!(
                "Encoded '{}' as {} into '{}'",
                request.source.display(),
                request.mode_name,
                path.display()
            );
            (Some(path), None, None)
        }
        Err(e) => {
            log::error!("Encoding '{}' failed: {}", request.source.display(), e);
            (None, Some(e.to_string()), Some(e.kind()))
        }
    };

    EncodeResult {
        success: output_path.is_some(),
        output_path,
        error,
        error_kind,
        mode: request.mode_name.clone(),
        sample_rate: request.sample_rate,
        bit_depth: request.bit_depth,
    }
}

fn run(codec: &dyn SstvCodec, request: &EncodeRequest) -> Result<PathBuf> {
    let mode = SstvMode::resolve(&request.mode_name)?;
    let source = imaging::load(&request.source)?;

    // Probe against the original image for the mode's pixel grid.
    let original = source.to_rgb8();
    let props = codec
        .modulator(mode, &original, request.sample_rate, request.bit_depth)?
        .properties();
    let (width, height) = (props.width(), props.height());
    log::debug!(
        "{} needs {}x{}, source is {}x{}",
        mode,
        width,
        height,
        original.width(),
        original.height()
    );

    let prepared = imaging::prepare(&source, width, height);
    let modulator = codec.modulator(mode, &prepared, request.sample_rate, request.bit_depth)?;
    let samples: Vec<f32> = modulator.samples().collect();
    log::debug!("Generated {} samples for {}", samples.len(), mode);

    let pcm = audio::to_pcm16(&samples);
    audio::write_pcm(&request.output, &pcm, request.sample_rate, request.bit_depth)?;
    Ok(request.output.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LineScanCodec;
    use image::RgbImage;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_unknown_mode_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "in.png", 16, 16);
        let output = dir.path().join("out.wav");

        let result = encode(&LineScanCodec::new(), &EncodeRequest::new(&source, &output, "Robot99"));

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::UnknownMode));
        assert!(result.error.unwrap().contains("Robot99"));
        assert!(result.output_path.is_none());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_image_is_image_read_error() {
        let dir = TempDir::new().unwrap();
        let request = EncodeRequest::new(dir.path().join("nope.png"), dir.path().join("out.wav"), "Robot36");

        let result = encode(&LineScanCodec::new(), &request);

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::ImageReadError));
        assert_eq!(result.mode, "Robot36");
    }

    #[test]
    fn test_bad_bit_depth_is_audio_write_error() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "in.png", 8, 8);
        let mut request = EncodeRequest::new(&source, dir.path().join("out.wav"), "Robot36");
        request.sample_rate = 8000;
        request.bit_depth = 12;

        let result = encode(&LineScanCodec::new(), &request);

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::AudioWriteError));
        assert_eq!(result.bit_depth, 12);
    }

    #[test]
    fn test_encode_writes_tagged_wav() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "in.png", 100, 50);
        let output = dir.path().join("data").join("in.wav");
        let mut request = EncodeRequest::new(&source, &output, "Robot36");
        request.sample_rate = 8000;

        let result = encode(&LineScanCodec::new(), &request);

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output_path.as_deref(), Some(output.as_path()));
        let spec = hound::WavReader::open(&output).unwrap().spec();
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.channels, 1);
    }

    #[test]
    fn test_result_serializes_without_empty_fields() {
        let result = EncodeResult {
            success: true,
            output_path: Some(PathBuf::from("data/a.wav")),
            error: None,
            error_kind: None,
            mode: "PD120".to_string(),
            sample_rate: 44100,
            bit_depth: 16,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"output_path\":\"data/a.wav\""));
        assert!(!json.contains("error"));
    }
}
