//! FFmpeg-backed microphone recording.
//!
//! FFmpeg reads the platform's default input device and writes raw mono
//! `f32le` samples to stdout, which are collected on a reader thread while
//! the caller polls for completion, cancellation or a missed deadline.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::errors::CaptureError;
use super::{CancelToken, CaptureBackend};

/// Extra time FFmpeg gets beyond the requested duration to open the device
/// and flush its output.
const STARTUP_GRACE: Duration = Duration::from_secs(5);
/// How long a signalled FFmpeg may take to exit before it is killed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Records through `ffmpeg -f <format> -i <device>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegBackend {
    format: String,
    device: String,
}

impl FfmpegBackend {
    pub fn new(format: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            device: device.into(),
        }
    }

    /// The input format and default device for the current platform, or
    /// `None` where FFmpeg has no audio input device.
    pub fn for_platform() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::new("avfoundation", ":default"))
        } else if cfg!(target_os = "linux") {
            Some(Self::new("pulse", "default"))
        } else if cfg!(target_os = "windows") {
            Some(Self::new("dshow", "audio=default"))
        } else {
            None
        }
    }

    /// Replace the input device, keeping the platform's input format.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// FFmpeg arguments for a mono float recording of `duration`.
    pub fn args(&self, duration: Duration, sample_rate: u32) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "-i".to_string(),
            self.device.clone(),
            "-t".to_string(),
            format!("{:.3}", duration.as_secs_f64()),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-f".to_string(),
            "f32le".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

impl CaptureBackend for FfmpegBackend {
    fn name(&self) -> &str {
        &self.format
    }

    fn record(
        &self,
        duration: Duration,
        sample_rate: u32,
        cancel: &CancelToken,
    ) -> Result<Vec<f32>, CaptureError> {
        let deadline = duration
            .checked_add(STARTUP_GRACE)
            .ok_or(CaptureError::InvalidDuration(duration.as_secs_f64()))?;
        let args = self.args(duration, sample_rate);
        log::debug!("Running ffmpeg {}", args.join(" "));

        let mut recorder = Recorder::spawn(&args)?;
        let started = Instant::now();

        let status = loop {
            if cancel.is_cancelled() {
                recorder.shutdown()?;
                return Err(CaptureError::Cancelled);
            }
            if let Some(status) = recorder.try_wait()? {
                break status;
            }
            if started.elapsed() > deadline {
                recorder.shutdown()?;
                return Err(CaptureError::TimedOut {
                    seconds: deadline.as_secs_f64(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let bytes = recorder.take_stdout();
        if !status.success() {
            return Err(CaptureError::ProcessFailed {
                exit_code: status.code(),
                stderr: recorder.take_stderr_output().join("\n"),
            });
        }
        Ok(decode_f32le(&bytes))
    }
}

/// Interpret little-endian 32-bit float bytes; a trailing partial sample is
/// dropped.
fn decode_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// A running FFmpeg process with its output pipes drained on background
/// threads.
struct Recorder {
    child: Child,
    stdout_thread: Option<JoinHandle<Vec<u8>>>,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
}

impl Recorder {
    fn spawn(args: &[String]) -> Result<Self, CaptureError> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CaptureError::FfmpegNotFound
                } else {
                    CaptureError::SpawnFailed(e)
                }
            })?;

        let stdout_thread = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                if let Err(e) = stdout.read_to_end(&mut buf) {
                    log::warn!("Reading ffmpeg output failed: {}", e);
                }
                buf
            })
        });

        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                let mut lines = Vec::new();
                for line in reader.lines() {
                    match line {
                        Ok(l) => {
                            log::debug!("[ffmpeg] {}", l);
                            lines.push(l);
                        }
                        Err(_) => break,
                    }
                }
                lines
            })
        });

        Ok(Recorder {
            child,
            stdout_thread,
            stderr_thread,
        })
    }

    fn try_wait(&mut self) -> Result<Option<ExitStatus>, CaptureError> {
        self.child.try_wait().map_err(CaptureError::Io)
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Send SIGINT so FFmpeg closes the device cleanly, then kill it if it
    /// has not exited within the shutdown timeout.
    fn shutdown(&mut self) -> Result<ExitStatus, CaptureError> {
        #[cfg(unix)]
        {
            unsafe {
                let pid = self.child.id() as i32;
                libc::kill(pid, libc::SIGINT);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
        }

        let start = Instant::now();
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() > SHUTDOWN_TIMEOUT {
                        let _ = self.child.kill();
                        return self.child.wait().map_err(CaptureError::Io);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(CaptureError::Io(e)),
            }
        }
    }

    fn take_stdout(&mut self) -> Vec<u8> {
        self.stdout_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }

    fn take_stderr_output(&mut self) -> Vec<String> {
        self.stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.shutdown();
        }
    }
}
