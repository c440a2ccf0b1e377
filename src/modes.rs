//! Mode catalog and mode recommendation.
//!
//! The catalog lists every supported SSTV mode in a fixed declaration order
//! and reads each mode's resolution and VIS code back from the codec. The
//! recommender picks a mode from an image's dimensions alone.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::codec::SstvCodec;
use crate::error::{Result, SstvError};

/// Sample rate used when probing a mode for its properties.
const PROBE_SAMPLE_RATE: u32 = 44100;
/// Bit depth used when probing a mode for its properties.
const PROBE_BIT_DEPTH: u16 = 16;
/// Side length of the blank placeholder image used for probing.
const PROBE_IMAGE_SIZE: u32 = 10;

/// Supported SSTV modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SstvMode {
    MartinM1,
    MartinM2,
    ScottieS1,
    ScottieS2,
    ScottieDx,
    Robot36,
    PasokonP3,
    PasokonP5,
    PasokonP7,
    Pd90,
    Pd120,
    Pd160,
    Pd180,
    Pd240,
    Pd290,
    WraaseSc2120,
    WraaseSc2180,
}

impl SstvMode {
    /// All modes in catalog order. Callers index into this order, so it must
    /// not be re-sorted.
    pub const ALL: [SstvMode; 17] = [
        SstvMode::MartinM1,
        SstvMode::MartinM2,
        SstvMode::ScottieS1,
        SstvMode::ScottieS2,
        SstvMode::ScottieDx,
        SstvMode::Robot36,
        SstvMode::PasokonP3,
        SstvMode::PasokonP5,
        SstvMode::PasokonP7,
        SstvMode::Pd90,
        SstvMode::Pd120,
        SstvMode::Pd160,
        SstvMode::Pd180,
        SstvMode::Pd240,
        SstvMode::Pd290,
        SstvMode::WraaseSc2120,
        SstvMode::WraaseSc2180,
    ];

    /// Catalog name of this mode.
    pub fn name(self) -> &'static str {
        match self {
            SstvMode::MartinM1 => "MartinM1",
            SstvMode::MartinM2 => "MartinM2",
            SstvMode::ScottieS1 => "ScottieS1",
            SstvMode::ScottieS2 => "ScottieS2",
            SstvMode::ScottieDx => "ScottieDX",
            SstvMode::Robot36 => "Robot36",
            SstvMode::PasokonP3 => "PasokonP3",
            SstvMode::PasokonP5 => "PasokonP5",
            SstvMode::PasokonP7 => "PasokonP7",
            SstvMode::Pd90 => "PD90",
            SstvMode::Pd120 => "PD120",
            SstvMode::Pd160 => "PD160",
            SstvMode::Pd180 => "PD180",
            SstvMode::Pd240 => "PD240",
            SstvMode::Pd290 => "PD290",
            SstvMode::WraaseSc2120 => "WraaseSC2120",
            SstvMode::WraaseSc2180 => "WraaseSC2180",
        }
    }

    /// Look up a mode by its exact catalog name.
    pub fn from_name(name: &str) -> Option<SstvMode> {
        SstvMode::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Resolve a mode name, failing with `UnknownMode`.
    pub fn resolve(name: &str) -> Result<SstvMode> {
        SstvMode::from_name(name).ok_or_else(|| SstvError::UnknownMode(name.to_string()))
    }
}

impl fmt::Display for SstvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A catalog entry: a mode and the geometry the codec declares for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeDescriptor {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub vis_code: u8,
}

/// List every mode the codec can describe, in catalog order.
///
/// Each mode is probed with a small black placeholder image. A mode the
/// codec fails to instantiate is logged and left out; the call itself
/// never fails.
pub fn list_modes(codec: &dyn SstvCodec) -> Vec<ModeDescriptor> {
    let placeholder = RgbImage::new(PROBE_IMAGE_SIZE, PROBE_IMAGE_SIZE);

    SstvMode::ALL
        .iter()
        .filter_map(|&mode| {
            match describe_mode(codec, mode, &placeholder) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    log::warn!("Skipping mode {}: {}", mode, e);
                    None
                }
            }
        })
        .collect()
}

/// Probe a single mode for its declared geometry.
pub fn describe_mode(
    codec: &dyn SstvCodec,
    mode: SstvMode,
    image: &RgbImage,
) -> Result<ModeDescriptor> {
    let modulator = codec.modulator(mode, image, PROBE_SAMPLE_RATE, PROBE_BIT_DEPTH)?;
    let props = modulator.properties();
    Ok(ModeDescriptor {
        name: mode.name().to_string(),
        width: props.width(),
        height: props.height(),
        vis_code: props.vis_code(),
    })
}

/// Size thresholds and mode choices used by [`recommend`].
///
/// These are product defaults, not codec requirements, so they are loaded
/// from the `[recommend]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendPolicy {
    /// Largest (width, height) still considered a small image.
    pub small_max: (u32, u32),
    pub small_mode: String,
    /// Largest (width, height) still considered a medium image.
    pub medium_max: (u32, u32),
    pub medium_mode: String,
    pub large_mode: String,
    /// Returned when the image cannot be read.
    pub fallback_mode: String,
}

impl Default for RecommendPolicy {
    fn default() -> Self {
        Self {
            small_max: (320, 240),
            small_mode: SstvMode::Robot36.name().to_string(),
            medium_max: (640, 496),
            medium_mode: SstvMode::Pd120.name().to_string(),
            large_mode: SstvMode::Pd290.name().to_string(),
            fallback_mode: SstvMode::Pd90.name().to_string(),
        }
    }
}

impl RecommendPolicy {
    /// Pick a mode for an image of the given size.
    pub fn mode_for_size(&self, width: u32, height: u32) -> &str {
        if width <= self.small_max.0 && height <= self.small_max.1 {
            &self.small_mode
        } else if width <= self.medium_max.0 && height <= self.medium_max.1 {
            &self.medium_mode
        } else {
            &self.large_mode
        }
    }
}

/// Recommend a mode for the image at `path`.
///
/// Only the image header is read. Any failure yields the policy's fallback
/// mode instead of an error.
pub fn recommend(path: &Path, policy: &RecommendPolicy) -> String {
    match image::image_dimensions(path) {
        Ok((width, height)) => {
            let mode = policy.mode_for_size(width, height);
            log::debug!("Recommending {} for {}x{} image", mode, width, height);
            mode.to_string()
        }
        Err(e) => {
            log::warn!(
                "Could not read '{}' for recommendation: {}",
                path.display(),
                e
            );
            policy.fallback_mode.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Demodulator, LineScanCodec, ModeProperties, Modulator};

    #[test]
    fn test_mode_names_round_trip() {
        for mode in SstvMode::ALL {
            assert_eq!(SstvMode::from_name(mode.name()), Some(mode));
        }
    }

    #[test]
    fn test_from_name_is_exact() {
        assert_eq!(SstvMode::from_name("PD120"), Some(SstvMode::Pd120));
        assert_eq!(SstvMode::from_name("pd120"), None);
        assert!(matches!(
            SstvMode::resolve("Robot99"),
            Err(SstvError::UnknownMode(name)) if name == "Robot99"
        ));
    }

    #[test]
    fn test_list_modes_keeps_declaration_order() {
        let modes = list_modes(&LineScanCodec::new());
        let names: Vec<&str> = modes.iter().map(|m| m.name.as_str()).collect();
        let expected: Vec<&str> = SstvMode::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_robot36_descriptor() {
        let modes = list_modes(&LineScanCodec::new());
        let robot = modes.iter().find(|m| m.name == "Robot36").unwrap();
        assert_eq!((robot.width, robot.height, robot.vis_code), (320, 240, 8));
    }

    /// Codec that cannot build Scottie modes and declares nothing for PD modes.
    struct PartialCodec;

    struct BareModulator;

    impl Modulator for BareModulator {
        fn samples(&self) -> Box<dyn Iterator<Item = f32> + '_> {
            Box::new(std::iter::empty())
        }
    }

    impl SstvCodec for PartialCodec {
        fn modulator<'a>(
            &self,
            mode: SstvMode,
            image: &'a RgbImage,
            sample_rate: u32,
            bit_depth: u16,
        ) -> Result<Box<dyn Modulator + 'a>> {
            match mode {
                SstvMode::ScottieS1 | SstvMode::ScottieS2 | SstvMode::ScottieDx => {
                    Err(SstvError::Codec {
                        mode: mode.name().to_string(),
                        message: "not available".to_string(),
                    })
                }
                SstvMode::Pd90 => Ok(Box::new(BareModulator)),
                _ => LineScanCodec::new().modulator(mode, image, sample_rate, bit_depth),
            }
        }

        fn demodulator(&self, sample_rate: u32, bit_depth: u16) -> Box<dyn Demodulator> {
            LineScanCodec::new().demodulator(sample_rate, bit_depth)
        }
    }

    #[test]
    fn test_list_modes_skips_failing_modes() {
        let modes = list_modes(&PartialCodec);
        assert_eq!(modes.len(), SstvMode::ALL.len() - 3);
        assert!(modes.iter().all(|m| !m.name.starts_with("Scottie")));
    }

    #[test]
    fn test_missing_properties_use_defaults() {
        let modes = list_modes(&PartialCodec);
        let pd90 = modes.iter().find(|m| m.name == "PD90").unwrap();
        let defaults = ModeProperties::default();
        assert_eq!(pd90.width, defaults.width());
        assert_eq!((pd90.width, pd90.height, pd90.vis_code), (320, 240, 0));
    }

    #[test]
    fn test_policy_thresholds() {
        let policy = RecommendPolicy::default();
        assert_eq!(policy.mode_for_size(300, 200), "Robot36");
        assert_eq!(policy.mode_for_size(320, 240), "Robot36");
        assert_eq!(policy.mode_for_size(321, 240), "PD120");
        assert_eq!(policy.mode_for_size(600, 480), "PD120");
        assert_eq!(policy.mode_for_size(640, 497), "PD290");
        assert_eq!(policy.mode_for_size(1000, 800), "PD290");
    }

    #[test]
    fn test_recommend_unreadable_path_falls_back() {
        let mode = recommend(
            Path::new("/nonexistent/definitely-missing.png"),
            &RecommendPolicy::default(),
        );
        assert_eq!(mode, "PD90");
    }
}
