//! Built-in line-sequential codec.
//!
//! Every mode is transmitted as a VIS header followed by one block per image
//! line: a sync pulse, a porch, and the green, blue and red scans. Pixel
//! brightness maps linearly onto 1500-2300 Hz.

use image::{Rgb, RgbImage};
use std::f64::consts::TAU;

use super::dsp::FrequencyEstimator;
use super::timing::{
    timing_for, timing_for_vis, ScanTiming, BIT_ONE_HZ, BIT_ZERO_HZ, BLACK_HZ, BREAK_MS,
    HEADER_MS, LEADER_HZ, LEADER_MS, SYNC_HZ, VIS_BIT_MS, WHITE_HZ,
};
use super::{DecodedImage, Demodulator, ModeProperties, Modulator, SstvCodec};
use crate::error::{Result, SstvError};
use crate::modes::SstvMode;

/// Scan order of the colour channels within a line (RGB indices).
const CHANNEL_ORDER: [usize; 3] = [1, 2, 0];
/// Allowed deviation when matching a header tone (Hz).
const TONE_TOLERANCE_HZ: f64 = 90.0;
/// Step between header search candidates (ms).
const SEARCH_STEP_MS: f64 = 1.0;
/// Amplitude below which leading samples count as silence.
const SILENCE_THRESHOLD: f32 = 0.02;

/// The built-in codec. Stateless; every call builds fresh modulators.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineScanCodec;

impl LineScanCodec {
    pub fn new() -> Self {
        Self
    }
}

impl SstvCodec for LineScanCodec {
    fn modulator<'a>(
        &self,
        mode: SstvMode,
        image: &'a RgbImage,
        sample_rate: u32,
        bit_depth: u16,
    ) -> Result<Box<dyn Modulator + 'a>> {
        if sample_rate == 0 {
            return Err(SstvError::Codec {
                mode: mode.name().to_string(),
                message: "sample rate must be positive".to_string(),
            });
        }
        Ok(Box::new(LineScanModulator {
            timing: timing_for(mode),
            image,
            sample_rate,
            bit_depth,
        }))
    }

    fn demodulator(&self, sample_rate: u32, bit_depth: u16) -> Box<dyn Demodulator> {
        Box::new(LineScanDemodulator {
            sample_rate,
            bit_depth,
            samples: Vec::new(),
        })
    }
}

struct LineScanModulator<'a> {
    timing: &'static ScanTiming,
    image: &'a RgbImage,
    sample_rate: u32,
    bit_depth: u16,
}

impl Modulator for LineScanModulator<'_> {
    fn properties(&self) -> ModeProperties {
        ModeProperties {
            width: Some(self.timing.width),
            height: Some(self.timing.height),
            vis_code: Some(self.timing.vis_code),
        }
    }

    fn samples(&self) -> Box<dyn Iterator<Item = f32> + '_> {
        log::debug!(
            "Generating {} samples at {} Hz ({}-bit target)",
            self.timing.mode,
            self.sample_rate,
            self.bit_depth
        );
        Box::new(ToneStream::new(self.timing, self.image, self.sample_rate))
    }
}

#[derive(Debug, Clone, Copy)]
struct Tone {
    hz: f64,
    secs: f64,
}

impl Tone {
    fn ms(hz: f64, ms: f64) -> Self {
        Self {
            hz,
            secs: ms / 1000.0,
        }
    }
}

fn level_to_hz(level: u8) -> f64 {
    BLACK_HZ + (WHITE_HZ - BLACK_HZ) * level as f64 / 255.0
}

fn hz_to_level(hz: f64) -> u8 {
    let level = (hz - BLACK_HZ) / (WHITE_HZ - BLACK_HZ) * 255.0;
    level.round().clamp(0.0, 255.0) as u8
}

fn header_tones(vis_code: u8) -> Vec<Tone> {
    let mut tones = vec![
        Tone::ms(LEADER_HZ, LEADER_MS),
        Tone::ms(SYNC_HZ, BREAK_MS),
        Tone::ms(LEADER_HZ, LEADER_MS),
        Tone::ms(SYNC_HZ, VIS_BIT_MS),
    ];
    let data = vis_code & 0x7f;
    for bit in 0..7 {
        let hz = if (data >> bit) & 1 == 1 {
            BIT_ONE_HZ
        } else {
            BIT_ZERO_HZ
        };
        tones.push(Tone::ms(hz, VIS_BIT_MS));
    }
    // Even parity over the seven data bits.
    let parity = if data.count_ones() % 2 == 1 {
        BIT_ONE_HZ
    } else {
        BIT_ZERO_HZ
    };
    tones.push(Tone::ms(parity, VIS_BIT_MS));
    tones.push(Tone::ms(SYNC_HZ, VIS_BIT_MS));
    tones
}

/// Lazy, phase-continuous sample generator.
///
/// Tones are planned one block at a time (the header, then each line), so
/// memory stays proportional to a single line.
struct ToneStream<'a> {
    timing: &'static ScanTiming,
    image: &'a RgbImage,
    sample_rate: f64,
    next_block: u32,
    tones: Vec<Tone>,
    tone_idx: usize,
    tone_end: f64,
    sample_idx: u64,
    phase: f64,
    finished: bool,
}

impl<'a> ToneStream<'a> {
    fn new(timing: &'static ScanTiming, image: &'a RgbImage, sample_rate: u32) -> Self {
        Self {
            timing,
            image,
            sample_rate: sample_rate as f64,
            next_block: 0,
            tones: Vec::new(),
            tone_idx: 0,
            tone_end: 0.0,
            sample_idx: 0,
            phase: 0.0,
            finished: false,
        }
    }

    /// Plan the next block. Returns false once every line has been planned.
    fn load_block(&mut self) -> bool {
        let block = self.next_block;
        if block > self.timing.height {
            return false;
        }
        self.next_block += 1;
        self.tone_idx = 0;

        if block == 0 {
            self.tones = header_tones(self.timing.vis_code);
            return true;
        }

        let t = self.timing;
        let y = block - 1;
        self.tones.clear();
        self.tones.push(Tone::ms(SYNC_HZ, t.sync_ms));
        self.tones.push(Tone::ms(BLACK_HZ, t.porch_ms));
        for (i, &channel) in CHANNEL_ORDER.iter().enumerate() {
            if i > 0 && t.separator_ms > 0.0 {
                self.tones.push(Tone::ms(BLACK_HZ, t.separator_ms));
            }
            for x in 0..t.width {
                let level = pixel_level(self.image, x, y, channel);
                self.tones.push(Tone::ms(level_to_hz(level), t.pixel_ms()));
            }
        }
        true
    }
}

/// Pixel lookup that tolerates images smaller than the mode's grid.
fn pixel_level(image: &RgbImage, x: u32, y: u32, channel: usize) -> u8 {
    if x < image.width() && y < image.height() {
        image.get_pixel(x, y)[channel]
    } else {
        0
    }
}

impl Iterator for ToneStream<'_> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished {
            return None;
        }
        let now = self.sample_idx as f64 / self.sample_rate;
        while now >= self.tone_end {
            self.tone_idx += 1;
            if self.tone_idx >= self.tones.len() && !self.load_block() {
                self.finished = true;
                return None;
            }
            self.tone_end += self.tones[self.tone_idx].secs;
        }

        let hz = self.tones[self.tone_idx].hz;
        let value = self.phase.sin() as f32;
        self.phase = (self.phase + TAU * hz / self.sample_rate) % TAU;
        self.sample_idx += 1;
        Some(value)
    }
}

struct LineScanDemodulator {
    sample_rate: u32,
    bit_depth: u16,
    samples: Vec<i16>,
}

impl Demodulator for LineScanDemodulator {
    fn write_audio(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    fn render(&self) -> Result<DecodedImage> {
        log::debug!(
            "Demodulating {} samples at {} Hz ({}-bit)",
            self.samples.len(),
            self.sample_rate,
            self.bit_depth
        );
        if self.sample_rate == 0 {
            return Err(codec_error("unknown", "sample rate must be positive"));
        }
        let signal: Vec<f32> = self.samples.iter().map(|&s| s as f32 / 32768.0).collect();
        let decoder = SignalReader::new(&signal, self.sample_rate);

        let header_start = decoder
            .find_header()
            .ok_or_else(|| codec_error("unknown", "no VIS header found in audio"))?;
        let vis_code = decoder.read_vis(header_start)?;
        let timing = timing_for_vis(vis_code).ok_or_else(|| {
            codec_error("unknown", &format!("unrecognised VIS code {}", vis_code))
        })?;
        log::info!(
            "Detected {} (VIS {}) at {:.3}s",
            timing.mode,
            vis_code,
            header_start as f64 / self.sample_rate as f64
        );

        let image = decoder.read_image(header_start, timing)?;
        Ok(DecodedImage {
            mode: timing.mode,
            image,
        })
    }
}

fn codec_error(mode: &str, message: &str) -> SstvError {
    SstvError::Codec {
        mode: mode.to_string(),
        message: message.to_string(),
    }
}

/// Reads header and scan lines out of a normalised signal.
struct SignalReader<'a> {
    estimator: FrequencyEstimator<'a>,
    signal: &'a [f32],
    sample_rate: f64,
}

impl<'a> SignalReader<'a> {
    fn new(signal: &'a [f32], sample_rate: u32) -> Self {
        Self {
            estimator: FrequencyEstimator::new(signal, sample_rate),
            signal,
            sample_rate: sample_rate as f64,
        }
    }

    fn samples_for(&self, ms: f64) -> usize {
        (ms * self.sample_rate / 1000.0).round() as usize
    }

    /// Mean frequency of the window [offset + from_ms, offset + to_ms).
    fn tone_between(&self, offset: usize, from_ms: f64, to_ms: f64) -> f64 {
        let start = offset + self.samples_for(from_ms);
        let len = self.samples_for(to_ms - from_ms);
        self.estimator.mean_frequency(start, len)
    }

    fn is_tone(&self, offset: usize, from_ms: f64, to_ms: f64, hz: f64) -> bool {
        (self.tone_between(offset, from_ms, to_ms) - hz).abs() <= TONE_TOLERANCE_HZ
    }

    fn matches_header(&self, offset: usize) -> bool {
        let break_start = LEADER_MS;
        let second_leader = LEADER_MS + BREAK_MS;
        let start_bit = second_leader + LEADER_MS;

        // Cheap checks first; most candidates fail on the break.
        self.is_tone(offset, break_start + 2.0, break_start + BREAK_MS - 2.0, SYNC_HZ)
            && self.is_tone(offset, start_bit + 3.0, start_bit + VIS_BIT_MS - 3.0, SYNC_HZ)
            && self.is_tone(offset, 10.0, LEADER_MS - 10.0, LEADER_HZ)
            && self.is_tone(offset, second_leader + 10.0, start_bit - 10.0, LEADER_HZ)
    }

    /// Sample offset where the VIS header starts, if any.
    ///
    /// Leading silence is skipped. The middle of the first run of matching
    /// candidates is then refined against the break's edges.
    fn find_header(&self) -> Option<usize> {
        let first_sound = self
            .signal
            .iter()
            .position(|s| s.abs() > SILENCE_THRESHOLD)?;
        let header_len = self.samples_for(HEADER_MS);
        let step = self.samples_for(SEARCH_STEP_MS).max(1);
        let last = self.estimator.len().checked_sub(header_len)?;

        let mut run_start: Option<usize> = None;
        let mut offset = first_sound;
        while offset <= last {
            if self.matches_header(offset) {
                run_start.get_or_insert(offset);
            } else if run_start.is_some() {
                break;
            }
            offset += step;
        }
        let start = run_start?;
        let coarse = start + (offset - step - start) / 2;
        Some(self.refine_start(coarse))
    }

    /// Align `coarse` to the sample where the leader/break/leader edges
    /// line up best.
    fn refine_start(&self, coarse: usize) -> usize {
        const EDGE_MS: f64 = 2.0;
        let span = self.samples_for(4.0);
        let falling = LEADER_MS;
        let rising = LEADER_MS + BREAK_MS;

        let mut best = coarse;
        let mut best_score = f64::MIN;
        for p in coarse.saturating_sub(span)..=coarse + span {
            let score = self.tone_between(p, falling - EDGE_MS, falling)
                - self.tone_between(p, falling, falling + EDGE_MS)
                + self.tone_between(p, rising, rising + EDGE_MS)
                - self.tone_between(p, rising - EDGE_MS, rising);
            if score > best_score {
                best_score = score;
                best = p;
            }
        }
        best
    }

    fn read_vis(&self, header_start: usize) -> Result<u8> {
        let bits_start = LEADER_MS * 2.0 + BREAK_MS + VIS_BIT_MS;
        let mut bits = [false; 8];
        for (i, bit) in bits.iter_mut().enumerate() {
            let from = bits_start + VIS_BIT_MS * i as f64;
            let hz = self.tone_between(header_start, from + 3.0, from + VIS_BIT_MS - 3.0);
            *bit = hz < SYNC_HZ;
        }

        let mut code = 0u8;
        for (i, &bit) in bits[..7].iter().enumerate() {
            if bit {
                code |= 1 << i;
            }
        }
        let parity_ok = (code.count_ones() % 2 == 1) == bits[7];
        if !parity_ok {
            return Err(codec_error(
                "unknown",
                &format!("VIS parity check failed for code {}", code),
            ));
        }
        Ok(code)
    }

    fn read_image(&self, header_start: usize, timing: &ScanTiming) -> Result<RgbImage> {
        // A couple of milliseconds of slack absorbs header alignment error.
        let needed = header_start + self.samples_for(timing.total_ms());
        if self.estimator.len() + self.samples_for(2.0) < needed {
            return Err(codec_error(
                timing.mode.name(),
                &format!(
                    "audio ends before the last line ({} of {} samples)",
                    self.estimator.len(),
                    needed
                ),
            ));
        }

        let image_start = header_start as f64 + HEADER_MS * self.sample_rate / 1000.0;
        let ms_to_samples = self.sample_rate / 1000.0;
        let pixel_len = (timing.pixel_ms() * ms_to_samples).round().max(1.0) as usize;

        let mut image = RgbImage::new(timing.width, timing.height);
        for y in 0..timing.height {
            let line_start = image_start + y as f64 * timing.line_ms() * ms_to_samples;
            for (i, &channel) in CHANNEL_ORDER.iter().enumerate() {
                let scan_start = line_start + timing.channel_offset_ms(i) * ms_to_samples;
                for x in 0..timing.width {
                    let start = scan_start + x as f64 * timing.pixel_ms() * ms_to_samples;
                    let hz = self
                        .estimator
                        .mean_frequency(start.round() as usize, pixel_len);
                    let pixel: &mut Rgb<u8> = image.get_pixel_mut(x, y);
                    pixel[channel] = hz_to_level(hz);
                }
            }
        }
        Ok(image)
    }
}
