//! WAV file I/O and sample format conversion.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use crate::error::{Result, SstvError};

/// PCM bit depths that can be written.
pub const SUPPORTED_BIT_DEPTHS: [u16; 4] = [8, 16, 24, 32];

/// Decoded audio: interleaved float samples in [-1, 1].
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Average interleaved channels into a single channel.
    pub fn downmix(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

/// Scale float samples by 32767 and clip to the signed 16-bit range.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Read a WAV file into floats, whatever its integer or float encoding.
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(path).map_err(|e| SstvError::audio_read(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SstvError::audio_read(path, e))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| SstvError::audio_read(path, e))?
        }
    };

    Ok(AudioBuffer {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Write mono 16-bit samples tagged as `PCM_<bit_depth>`.
///
/// Samples are rescaled to the target depth. Parent directories are created
/// as needed.
pub fn write_pcm(path: &Path, samples: &[i16], sample_rate: u32, bit_depth: u16) -> Result<()> {
    if !SUPPORTED_BIT_DEPTHS.contains(&bit_depth) {
        return Err(SstvError::audio_write(
            path,
            format!("unsupported PCM bit depth {}", bit_depth),
        ));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SstvError::audio_write(path, e))?;
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bit_depth,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).map_err(|e| SstvError::audio_write(path, e))?;
    for &sample in samples {
        let written = match bit_depth {
            8 => writer.write_sample((sample >> 8) as i8),
            16 => writer.write_sample(sample),
            24 => writer.write_sample((sample as i32) << 8),
            _ => writer.write_sample((sample as i32) << 16),
        };
        written.map_err(|e| SstvError::audio_write(path, e))?;
    }
    writer.finalize().map_err(|e| SstvError::audio_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_to_pcm16_scales_and_clips() {
        let pcm = to_pcm16(&[0.0, 0.5, 1.0, -1.0, 1.7, -2.0]);
        assert_eq!(pcm, vec![0, 16383, 32767, -32767, 32767, -32768]);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let buffer = AudioBuffer {
            samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
            channels: 2,
            sample_rate: 44100,
        };
        assert_eq!(buffer.downmix(), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_mono_is_identity() {
        let buffer = AudioBuffer {
            samples: vec![0.1, 0.2],
            channels: 1,
            sample_rate: 8000,
        };
        assert_eq!(buffer.downmix(), vec![0.1, 0.2]);
    }

    #[test]
    fn test_pcm16_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("tone.wav");
        write_pcm(&path, &[0, 16384, -16384, 32767], 44100, 16).unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.channels, 1);
        assert_eq!(buffer.samples.len(), 4);
        assert!((buffer.samples[1] - 0.5).abs() < 1e-4);
        assert!((buffer.samples[2] + 0.5).abs() < 1e-4);

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
    }

    #[test]
    fn test_pcm24_tagging() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep.wav");
        write_pcm(&path, &[16384], 8000, 24).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        let buffer = read_wav(&path).unwrap();
        assert!((buffer.samples[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("odd.wav");
        let err = write_pcm(&path, &[0], 8000, 12).unwrap_err();
        assert!(err.to_string().contains("bit depth 12"));
        assert!(!path.exists());
    }

    #[test]
    fn test_reads_float_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [0.25f32, -0.75] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.samples, vec![0.25, -0.75]);
    }

    #[test]
    fn test_read_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"RIFF????not a wave").unwrap();
        assert!(matches!(read_wav(&path), Err(SstvError::AudioRead { .. })));
    }
}
