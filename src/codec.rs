//! SSTV codec capability.
//!
//! The pipelines never touch modulation math directly. They talk to an
//! [`SstvCodec`], which builds a [`Modulator`] for an (image, mode) pair and a
//! [`Demodulator`] that turns a sample buffer back into an image.
//!
//! [`LineScanCodec`] is the built-in implementation.

mod dsp;
mod linescan;
mod timing;

pub use linescan::LineScanCodec;

use image::RgbImage;

use crate::error::Result;
use crate::modes::SstvMode;

/// Width reported for a mode whose modulator declares none.
pub const DEFAULT_WIDTH: u32 = 320;
/// Height reported for a mode whose modulator declares none.
pub const DEFAULT_HEIGHT: u32 = 240;
/// VIS code reported for a mode whose modulator declares none.
pub const DEFAULT_VIS_CODE: u8 = 0;

/// Geometry a modulator declares for its mode. Missing fields fall back to
/// 320x240 and VIS 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeProperties {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vis_code: Option<u8>,
}

impl ModeProperties {
    pub fn width(&self) -> u32 {
        self.width.unwrap_or(DEFAULT_WIDTH)
    }

    pub fn height(&self) -> u32 {
        self.height.unwrap_or(DEFAULT_HEIGHT)
    }

    pub fn vis_code(&self) -> u8 {
        self.vis_code.unwrap_or(DEFAULT_VIS_CODE)
    }
}

/// Turns one image into an SSTV sample sequence.
pub trait Modulator {
    /// Geometry of the mode this modulator was built for.
    fn properties(&self) -> ModeProperties {
        ModeProperties::default()
    }

    /// Lazily generated samples in [-1, 1]. The sequence is finite but its
    /// length is only known once it has been drained.
    fn samples(&self) -> Box<dyn Iterator<Item = f32> + '_>;
}

/// An image recovered from SSTV audio.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub mode: SstvMode,
    pub image: RgbImage,
}

/// Reconstructs an image from 16-bit mono samples.
pub trait Demodulator {
    /// Append samples to the internal buffer.
    fn write_audio(&mut self, samples: &[i16]);

    /// Decode everything written so far.
    fn render(&self) -> Result<DecodedImage>;
}

/// Factory for modulators and demodulators.
pub trait SstvCodec {
    /// Build a modulator for `image` in `mode`.
    ///
    /// Building one has no side effects, so it doubles as a probe for the
    /// mode's declared geometry.
    fn modulator<'a>(
        &self,
        mode: SstvMode,
        image: &'a RgbImage,
        sample_rate: u32,
        bit_depth: u16,
    ) -> Result<Box<dyn Modulator + 'a>>;

    /// Build a demodulator for audio at the given rate and depth.
    fn demodulator(&self, sample_rate: u32, bit_depth: u16) -> Box<dyn Demodulator>;
}
