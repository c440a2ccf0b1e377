//! Frequency estimation over sample windows.

use std::f64::consts::PI;

use super::timing::LEADER_HZ;

/// Estimates the mean tone frequency of a window by mixing the signal down
/// around a fixed carrier, smoothing it with two cascaded moving averages and
/// summing the phase advance of the resulting baseband signal.
pub(crate) struct FrequencyEstimator<'a> {
    samples: &'a [f32],
    sample_rate: f64,
    carrier_hz: f64,
    smoothing: usize,
}

impl<'a> FrequencyEstimator<'a> {
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f64;
        let carrier_hz = LEADER_HZ;
        // A moving average of this length has its first null near the
        // mixing image at twice the carrier.
        let smoothing = ((sample_rate / (2.0 * carrier_hz)).round() as usize).max(1);
        Self {
            samples,
            sample_rate,
            carrier_hz,
            smoothing,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Mean frequency in Hz of `samples[start..start + len]`.
    ///
    /// Windows are clamped to the buffer. A window too short to measure
    /// reports the carrier frequency.
    pub fn mean_frequency(&self, start: usize, len: usize) -> f64 {
        let delay = self.smoothing - 1;
        let len = len.max(2);
        let out_start = start + delay;
        let out_end = (start + len + delay).min(self.samples.len());
        if out_end <= out_start + 1 {
            return self.carrier_hz;
        }

        let from = start.saturating_sub(self.smoothing * 2);
        let omega = 2.0 * PI * self.carrier_hz / self.sample_rate;
        let width = self.smoothing as f64;

        let mut stage1 = MovingAverage::new(self.smoothing);
        let mut stage2 = MovingAverage::new(self.smoothing);
        let mut prev: Option<(f64, f64)> = None;
        let mut total_angle = 0.0;
        let mut steps = 0usize;

        for n in from..out_end {
            let x = self.samples[n] as f64;
            let (sin, cos) = (omega * n as f64).sin_cos();
            let (i1, q1) = stage1.push(x * cos, -x * sin);
            let (i2, q2) = stage2.push(i1 / width, q1 / width);
            let z = (i2 / width, q2 / width);

            if n >= out_start {
                if let Some((pi, pq)) = prev {
                    let re = z.0 * pi + z.1 * pq;
                    let im = z.1 * pi - z.0 * pq;
                    total_angle += im.atan2(re);
                    steps += 1;
                }
            }
            prev = Some(z);
        }

        if steps == 0 {
            return self.carrier_hz;
        }
        self.carrier_hz + total_angle / steps as f64 * self.sample_rate / (2.0 * PI)
    }
}

/// Running sum over the last `len` complex values.
struct MovingAverage {
    ring: Vec<(f64, f64)>,
    pos: usize,
    sum: (f64, f64),
}

impl MovingAverage {
    fn new(len: usize) -> Self {
        Self {
            ring: vec![(0.0, 0.0); len],
            pos: 0,
            sum: (0.0, 0.0),
        }
    }

    fn push(&mut self, re: f64, im: f64) -> (f64, f64) {
        let old = self.ring[self.pos];
        self.ring[self.pos] = (re, im);
        self.pos = (self.pos + 1) % self.ring.len();
        self.sum.0 += re - old.0;
        self.sum.1 += im - old.1;
        self.sum
    }
}
