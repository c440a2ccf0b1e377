//! Per-mode scan geometry and timing for the line-scan codec.

use crate::modes::SstvMode;

/// Leader tone frequency (Hz).
pub(crate) const LEADER_HZ: f64 = 1900.0;
/// Sync, break, start and stop bit frequency (Hz).
pub(crate) const SYNC_HZ: f64 = 1200.0;
/// VIS "1" bit frequency (Hz).
pub(crate) const BIT_ONE_HZ: f64 = 1100.0;
/// VIS "0" bit frequency (Hz).
pub(crate) const BIT_ZERO_HZ: f64 = 1300.0;
/// Porch and separator frequency, also the black level (Hz).
pub(crate) const BLACK_HZ: f64 = 1500.0;
/// White level (Hz).
pub(crate) const WHITE_HZ: f64 = 2300.0;

pub(crate) const LEADER_MS: f64 = 300.0;
pub(crate) const BREAK_MS: f64 = 10.0;
pub(crate) const VIS_BIT_MS: f64 = 30.0;
/// Leader, break, leader, start bit, 7 data bits, parity, stop bit.
pub(crate) const HEADER_MS: f64 = LEADER_MS * 2.0 + BREAK_MS + VIS_BIT_MS * 10.0;

/// Scan layout of one mode. Each line is sync, porch, then three colour
/// scans (green, blue, red) joined by separators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScanTiming {
    pub mode: SstvMode,
    pub vis_code: u8,
    pub width: u32,
    pub height: u32,
    pub sync_ms: f64,
    pub porch_ms: f64,
    pub scan_ms: f64,
    pub separator_ms: f64,
}

impl ScanTiming {
    pub fn line_ms(&self) -> f64 {
        self.sync_ms + self.porch_ms + self.scan_ms * 3.0 + self.separator_ms * 2.0
    }

    pub fn pixel_ms(&self) -> f64 {
        self.scan_ms / self.width as f64
    }

    /// Offset of colour channel `channel` (0 = green, 1 = blue, 2 = red)
    /// from the start of its line.
    pub fn channel_offset_ms(&self, channel: usize) -> f64 {
        self.sync_ms + self.porch_ms + channel as f64 * (self.scan_ms + self.separator_ms)
    }

    /// Length of the whole transmission including the VIS header.
    pub fn total_ms(&self) -> f64 {
        HEADER_MS + self.line_ms() * self.height as f64
    }
}

#[allow(clippy::too_many_arguments)]
const fn timing(
    mode: SstvMode,
    vis_code: u8,
    width: u32,
    height: u32,
    sync_ms: f64,
    porch_ms: f64,
    scan_ms: f64,
    separator_ms: f64,
) -> ScanTiming {
    ScanTiming {
        mode,
        vis_code,
        width,
        height,
        sync_ms,
        porch_ms,
        scan_ms,
        separator_ms,
    }
}

static TIMINGS: [ScanTiming; 17] = [
    timing(SstvMode::MartinM1, 44, 320, 256, 4.862, 0.572, 146.432, 0.572),
    timing(SstvMode::MartinM2, 40, 320, 256, 4.862, 0.572, 73.216, 0.572),
    timing(SstvMode::ScottieS1, 60, 320, 256, 9.0, 1.5, 138.24, 1.5),
    timing(SstvMode::ScottieS2, 56, 320, 256, 9.0, 1.5, 88.064, 1.5),
    timing(SstvMode::ScottieDx, 76, 320, 256, 9.0, 1.5, 345.6, 1.5),
    timing(SstvMode::Robot36, 8, 320, 240, 9.0, 3.0, 44.0, 1.5),
    timing(SstvMode::PasokonP3, 113, 640, 496, 5.208, 1.042, 133.333, 1.042),
    timing(SstvMode::PasokonP5, 114, 640, 496, 7.813, 1.563, 200.0, 1.563),
    timing(SstvMode::PasokonP7, 115, 640, 496, 10.417, 2.083, 266.666, 2.083),
    timing(SstvMode::Pd90, 99, 320, 256, 20.0, 2.08, 170.24, 0.0),
    timing(SstvMode::Pd120, 95, 640, 496, 20.0, 2.08, 121.6, 0.0),
    timing(SstvMode::Pd160, 98, 512, 400, 20.0, 2.08, 195.584, 0.0),
    timing(SstvMode::Pd180, 96, 640, 496, 20.0, 2.08, 183.04, 0.0),
    timing(SstvMode::Pd240, 97, 640, 496, 20.0, 2.08, 244.48, 0.0),
    timing(SstvMode::Pd290, 94, 800, 616, 20.0, 2.08, 228.8, 0.0),
    timing(SstvMode::WraaseSc2120, 63, 320, 256, 5.5225, 0.5, 156.5, 0.0),
    timing(SstvMode::WraaseSc2180, 55, 320, 256, 5.5225, 0.5, 235.0, 0.0),
];

pub(crate) fn timing_for(mode: SstvMode) -> &'static ScanTiming {
    TIMINGS
        .iter()
        .find(|t| t.mode == mode)
        .unwrap_or(&TIMINGS[0])
}

pub(crate) fn timing_for_vis(vis_code: u8) -> Option<&'static ScanTiming> {
    TIMINGS.iter().find(|t| t.vis_code == vis_code)
}
