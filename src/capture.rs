//! Microphone capture.
//!
//! Callers ask for a number of seconds of audio and get back mono float
//! samples at [`CAPTURE_SAMPLE_RATE`]. Which backend records them is chosen
//! per platform and is invisible past this module.

mod errors;
mod ffmpeg;

pub use errors::CaptureError;
pub use ffmpeg::FfmpegBackend;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Sample rate of every capture.
pub const CAPTURE_SAMPLE_RATE: u32 = 44100;

/// Missing samples tolerated at the end of a recording before it counts as
/// cut short. Devices often round the duration down by a buffer.
const SHORTFALL_TOLERANCE: Duration = Duration::from_millis(100);

/// Shared flag used to abort a running capture from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A source of mono microphone samples.
pub trait CaptureBackend {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Block for `duration`, returning samples in [-1, 1]. Returns
    /// [`CaptureError::Cancelled`] once `cancel` is set.
    fn record(
        &self,
        duration: Duration,
        sample_rate: u32,
        cancel: &CancelToken,
    ) -> std::result::Result<Vec<f32>, CaptureError>;
}

/// The backend for this platform, if any. An explicit `device` replaces the
/// platform default input.
pub fn platform_backend(device: Option<&str>) -> Option<Box<dyn CaptureBackend>> {
    let backend = FfmpegBackend::for_platform()?;
    let backend = match device {
        Some(device) => backend.with_device(device),
        None => backend,
    };
    Some(Box::new(backend))
}

/// Record `duration_secs` seconds from the default input device.
///
/// Blocks for the whole duration.
pub fn capture(duration_secs: f64) -> Result<(Vec<f32>, u32)> {
    let backend = platform_backend(None);
    capture_with(backend.as_deref(), duration_secs, &CancelToken::new())
}

/// Record through an explicit backend. `None` means the platform has none
/// and fails with `UnsupportedPlatform` without blocking.
pub fn capture_with(
    backend: Option<&dyn CaptureBackend>,
    duration_secs: f64,
    cancel: &CancelToken,
) -> Result<(Vec<f32>, u32)> {
    let backend = backend.ok_or(CaptureError::NoBackend)?;
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(CaptureError::InvalidDuration(duration_secs).into());
    }
    let duration = Duration::try_from_secs_f64(duration_secs)
        .map_err(|_| CaptureError::InvalidDuration(duration_secs))?;
    log::info!(
        "Recording {:.1}s from {} at {} Hz",
        duration_secs,
        backend.name(),
        CAPTURE_SAMPLE_RATE
    );

    let mut samples = backend.record(duration, CAPTURE_SAMPLE_RATE, cancel)?;
    fit_length(&mut samples, duration)?;
    for s in samples.iter_mut() {
        *s = s.clamp(-1.0, 1.0);
    }
    Ok((samples, CAPTURE_SAMPLE_RATE))
}

/// Trim or pad `samples` to exactly `duration` worth at the capture rate.
fn fit_length(samples: &mut Vec<f32>, duration: Duration) -> std::result::Result<(), CaptureError> {
    let expected = samples_in(duration);
    let tolerance = samples_in(SHORTFALL_TOLERANCE);
    if samples.len() + tolerance < expected {
        return Err(CaptureError::ShortRecording {
            expected,
            received: samples.len(),
        });
    }
    samples.resize(expected, 0.0);
    Ok(())
}

fn samples_in(duration: Duration) -> usize {
    (duration.as_secs_f64() * CAPTURE_SAMPLE_RATE as f64).round() as usize
}
