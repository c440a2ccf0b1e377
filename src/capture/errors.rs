//! Error types for microphone capture.

use crate::error::SstvError;

/// Errors that can occur while recording from an input device
#[derive(Debug)]
pub enum CaptureError {
    /// No capture backend exists for this platform
    NoBackend,
    /// FFmpeg not found
    FfmpegNotFound,
    /// FFmpeg could not be started
    SpawnFailed(std::io::Error),
    /// FFmpeg exited with non-zero status
    ProcessFailed { exit_code: Option<i32>, stderr: String },
    /// The requested duration is not a positive number of seconds
    InvalidDuration(f64),
    /// The device delivered fewer samples than requested
    ShortRecording { expected: usize, received: usize },
    /// Capture was cancelled (e.g., by Ctrl+C)
    Cancelled,
    /// The recorder did not finish within its deadline
    TimedOut { seconds: f64 },
    /// I/O error while reading from the recorder
    Io(std::io::Error),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoBackend => {
                write!(f, "No audio capture backend for {}", std::env::consts::OS)
            }
            CaptureError::FfmpegNotFound => {
                write!(
                    f,
                    "FFmpeg not found. Microphone capture needs ffmpeg on the PATH."
                )
            }
            CaptureError::SpawnFailed(e) => write!(f, "Failed to spawn FFmpeg: {}", e),
            CaptureError::ProcessFailed { exit_code, stderr } => {
                write!(f, "FFmpeg exited with code {:?}", exit_code)?;
                if !stderr.is_empty() {
                    write!(f, "\n{}", stderr)?;
                }
                Ok(())
            }
            CaptureError::InvalidDuration(secs) => {
                write!(f, "Capture duration must be positive, got {}", secs)
            }
            CaptureError::ShortRecording { expected, received } => {
                write!(
                    f,
                    "Input device stopped early: {} of {} samples recorded",
                    received, expected
                )
            }
            CaptureError::Cancelled => write!(f, "Capture cancelled"),
            CaptureError::TimedOut { seconds } => {
                write!(f, "Recorder did not finish within {:.1}s", seconds)
            }
            CaptureError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            CaptureError::FfmpegNotFound
        } else {
            CaptureError::Io(e)
        }
    }
}

impl From<CaptureError> for SstvError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::NoBackend | CaptureError::FfmpegNotFound => {
                SstvError::UnsupportedPlatform(e.to_string())
            }
            other => SstvError::Capture(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_missing_backend_is_unsupported_platform() {
        let err: SstvError = CaptureError::NoBackend.into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPlatform);
        assert!(err.to_string().contains(std::env::consts::OS));
    }

    #[test]
    fn test_missing_ffmpeg_is_unsupported_platform() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: SstvError = CaptureError::from(io).into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPlatform);
        assert!(err.to_string().contains("FFmpeg not found"));
    }

    #[test]
    fn test_process_failed_display() {
        let err = CaptureError::ProcessFailed {
            exit_code: Some(1),
            stderr: "default: No such device".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Some(1)"));
        assert!(msg.contains("No such device"));

        let sstv: SstvError = err.into();
        assert_eq!(sstv.kind(), ErrorKind::CaptureError);
    }

    #[test]
    fn test_short_recording_display() {
        let err = CaptureError::ShortRecording {
            expected: 88200,
            received: 100,
        };
        assert!(err.to_string().contains("100 of 88200"));
    }
}
