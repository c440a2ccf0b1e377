//! End-to-end tests for the encode and decode pipelines.
//!
//! Covers:
//! - Robot36 black frame at 44100 Hz, 16-bit: result fields and decoded size
//! - Every catalog mode: decoded image matches the declared resolution
//! - Mode recommendation by image size

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use sstv_studio::codec::LineScanCodec;
use sstv_studio::decoder::{decode, DecodeRequest};
use sstv_studio::encoder::{encode, EncodeRequest};
use sstv_studio::modes::{list_modes, recommend, RecommendPolicy};
use sstv_studio::ErrorKind;

/// Sample rate for the all-modes sweep; low to keep the long modes quick.
const SWEEP_SAMPLE_RATE: u32 = 11025;

fn save_image(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

#[test]
fn test_robot36_black_frame_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = save_image(dir.path(), "black.png", &RgbImage::new(320, 240));
    let wav = dir.path().join("data").join("black.wav");

    let result = encode(
        &LineScanCodec::new(),
        &EncodeRequest::new(&source, &wav, "Robot36"),
    );

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.mode, "Robot36");
    assert_eq!(result.sample_rate, 44100);
    assert_eq!(result.bit_depth, 16);
    assert_eq!(result.output_path.as_deref(), Some(wav.as_path()));
    assert_eq!(wav.extension().unwrap(), "wav");

    let png = dir.path().join("data").join("decoded-black.png");
    let decoded = decode(&LineScanCodec::new(), &DecodeRequest::file(&wav, &png));

    assert!(decoded.success, "{:?}", decoded.error);
    assert_eq!(decoded.mode.as_deref(), Some("Robot36"));
    let image = image::open(&png).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (320, 240));

    // Black stays dark away from the edges of each scan.
    let Rgb([r, g, b]) = *image.get_pixel(160, 120);
    assert!(r < 40 && g < 40 && b < 40, "centre pixel {:?}", (r, g, b));
}

#[test]
fn test_every_mode_decodes_to_declared_size() {
    let dir = TempDir::new().unwrap();
    let codec = LineScanCodec::new();
    let mut gradient = RgbImage::new(64, 48);
    for (x, y, pixel) in gradient.enumerate_pixels_mut() {
        *pixel = Rgb([(x * 4) as u8, (y * 5) as u8, 128]);
    }
    let source = save_image(dir.path(), "gradient.png", &gradient);

    let catalog = list_modes(&codec);
    assert_eq!(catalog.len(), 17);

    for mode in catalog {
        let wav = dir.path().join(format!("{}.wav", mode.name));
        let mut request = EncodeRequest::new(&source, &wav, &mode.name);
        request.sample_rate = SWEEP_SAMPLE_RATE;
        let encoded = encode(&codec, &request);
        assert!(encoded.success, "{}: {:?}", mode.name, encoded.error);

        let png = dir.path().join(format!("{}.png", mode.name));
        let decoded = decode(&codec, &DecodeRequest::file(&wav, &png));
        assert!(decoded.success, "{}: {:?}", mode.name, decoded.error);
        assert_eq!(decoded.mode.as_deref(), Some(mode.name.as_str()));
        assert_eq!(
            image::image_dimensions(&png).unwrap(),
            (mode.width, mode.height),
            "{}",
            mode.name
        );

        std::fs::remove_file(&wav).unwrap();
    }
}

#[test]
fn test_truncated_recording_fails_without_image() {
    let dir = TempDir::new().unwrap();
    let source = save_image(dir.path(), "in.png", &RgbImage::new(32, 32));
    let wav = dir.path().join("in.wav");
    let mut request = EncodeRequest::new(&source, &wav, "Robot36");
    request.sample_rate = SWEEP_SAMPLE_RATE;
    assert!(encode(&LineScanCodec::new(), &request).success);

    // Keep the header and a few lines only.
    let mut reader = hound::WavReader::open(&wav).unwrap();
    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .take(SWEEP_SAMPLE_RATE as usize * 3)
        .map(|s| s.unwrap())
        .collect();
    let cut = dir.path().join("cut.wav");
    let mut writer = hound::WavWriter::create(&cut, spec).unwrap();
    for s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let png = dir.path().join("cut.png");
    let result = decode(&LineScanCodec::new(), &DecodeRequest::file(&cut, &png));
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::CodecError));
    assert!(result.error.unwrap().contains("Robot36"));
    assert!(!png.exists());
}

#[test]
fn test_recommend_by_size() {
    let dir = TempDir::new().unwrap();
    let policy = RecommendPolicy::default();
    let cases = [
        ((300, 200), "Robot36"),
        ((600, 480), "PD120"),
        ((1000, 800), "PD290"),
    ];
    for ((w, h), expected) in cases {
        let path = save_image(dir.path(), &format!("{}x{}.png", w, h), &RgbImage::new(w, h));
        assert_eq!(recommend(&path, &policy), expected, "{}x{}", w, h);
    }

    let corrupt = dir.path().join("corrupt.png");
    std::fs::write(&corrupt, b"\x89PNG garbage").unwrap();
    assert_eq!(recommend(&corrupt, &policy), "PD90");
}
