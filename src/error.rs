//! Error taxonomy shared by every pipeline.
//!
//! Internal code propagates [`SstvError`] with `?`. The public pipeline
//! entry points turn it into a result value carrying the [`ErrorKind`] tag
//! and the rendered message, so nothing escapes to the caller as a panic.

use serde::Serialize;
use std::path::PathBuf;

/// Errors that can occur while encoding, decoding, capturing or managing files.
#[derive(Debug, thiserror::Error)]
pub enum SstvError {
    #[error("Unsupported SSTV mode: {0}")]
    UnknownMode(String),

    #[error("Failed to read image '{}': {message}", path.display())]
    ImageRead { path: PathBuf, message: String },

    #[error("Failed to write image '{}': {message}", path.display())]
    ImageWrite { path: PathBuf, message: String },

    #[error("Failed to read audio '{}': {message}", path.display())]
    AudioRead { path: PathBuf, message: String },

    #[error("Failed to write audio '{}': {message}", path.display())]
    AudioWrite { path: PathBuf, message: String },

    #[error("Audio capture is not available: {0}")]
    UnsupportedPlatform(String),

    #[error("Audio capture failed: {0}")]
    Capture(String),

    #[error("SSTV codec error ({mode}): {message}")]
    Codec { mode: String, message: String },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Copyable tag identifying which [`SstvError`] variant produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnknownMode,
    ImageReadError,
    ImageWriteError,
    AudioReadError,
    AudioWriteError,
    UnsupportedPlatform,
    CaptureError,
    CodecError,
    FileNotFound,
    InvalidLocation,
    IoError,
}

impl SstvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SstvError::UnknownMode(_) => ErrorKind::UnknownMode,
            SstvError::ImageRead { .. } => ErrorKind::ImageReadError,
            SstvError::ImageWrite { .. } => ErrorKind::ImageWriteError,
            SstvError::AudioRead { .. } => ErrorKind::AudioReadError,
            SstvError::AudioWrite { .. } => ErrorKind::AudioWriteError,
            SstvError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            SstvError::Capture(_) => ErrorKind::CaptureError,
            SstvError::Codec { .. } => ErrorKind::CodecError,
            SstvError::FileNotFound(_) => ErrorKind::FileNotFound,
            SstvError::InvalidLocation(_) => ErrorKind::InvalidLocation,
            SstvError::Io(_) => ErrorKind::IoError,
        }
    }

    pub(crate) fn image_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SstvError::ImageRead {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn image_write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SstvError::ImageWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn audio_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SstvError::AudioRead {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn audio_write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SstvError::AudioWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SstvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_display() {
        let err = SstvError::UnknownMode("Robot99".to_string());
        assert_eq!(err.to_string(), "Unsupported SSTV mode: Robot99");
        assert_eq!(err.kind(), ErrorKind::UnknownMode);
    }

    #[test]
    fn test_image_read_includes_path() {
        let err = SstvError::image_read("/tmp/missing.png", "No such file");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.png"));
        assert!(msg.contains("No such file"));
        assert_eq!(err.kind(), ErrorKind::ImageReadError);
    }

    #[test]
    fn test_codec_error_includes_mode() {
        let err = SstvError::Codec {
            mode: "PD120".to_string(),
            message: "audio ends before the last line".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PD120"));
        assert!(msg.contains("last line"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SstvError = io.into();
        assert_eq!(err.kind(), ErrorKind::IoError);
    }
}
