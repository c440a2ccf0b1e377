//! Image loading and preparation for encoding.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use std::path::Path;

use crate::error::{Result, SstvError};

/// Load an image from disk, failing with `ImageRead` on a missing or
/// undecodable file.
pub fn load(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| SstvError::image_read(path, e))
}

/// Convert to RGB and resize to exactly `width` x `height` with a Lanczos
/// filter. Aspect ratio is not preserved.
pub fn prepare(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.dimensions() == (width, height) {
        return rgb;
    }
    imageops::resize(&rgb, width, height, FilterType::Lanczos3)
}

/// Save an image; the format follows the file extension.
pub fn save(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SstvError::image_write(path, e))?;
    }
    image.save(path).map_err(|e| SstvError::image_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_prepare_exact_size_for_any_aspect() {
        let wide = DynamicImage::ImageRgb8(RgbImage::new(1000, 100));
        let tall = DynamicImage::ImageRgb8(RgbImage::new(50, 900));
        let tiny = DynamicImage::ImageRgb8(RgbImage::new(1, 1));

        for src in [&wide, &tall, &tiny] {
            assert_eq!(prepare(src, 320, 256).dimensions(), (320, 256));
            assert_eq!(prepare(src, 800, 616).dimensions(), (800, 616));
        }
    }

    #[test]
    fn test_prepare_converts_grayscale_to_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([200])));
        let rgb = prepare(&gray, 10, 10);
        assert_eq!(rgb.get_pixel(5, 5).0, [200, 200, 200]);
    }

    #[test]
    fn test_prepare_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 128])));
        let rgb = prepare(&rgba, 8, 8);
        assert_eq!(rgb.dimensions(), (8, 8));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/photo.png")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/photo.png"));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not really a png").unwrap();
        assert!(matches!(load(&path), Err(SstvError::ImageRead { .. })));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.png");
        save(&RgbImage::new(4, 4), &path).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (4, 4));
    }
}
