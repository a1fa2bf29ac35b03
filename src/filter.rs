//! Filter Module
//!
//! A voice's only filter stage is a resonant lowpass whose cutoff is
//! expressed in absolute cents rather than Hz, following the `initialFilterFc`
//! generator. Coefficients only need recomputing when the integer-truncated
//! cutoff actually changes, so this is a Direct Form I biquad that caches its
//! last cutoff alongside the coefficients.

use crate::units::abs_cents_to_hz;
use std::f32::consts::PI;

/// Centibel-to-linear floor for `initialFilterQ`; SoundFont2 defines Q in
/// centibels as `initialFilterQ / 10` dB of resonant gain at the cutoff.
fn q_from_centibels(initial_filter_q_cb: f32) -> f32 {
    let db = initial_filter_q_cb / 10.0;
    10f32.powf(db / 20.0).max(0.5)
}

/// One voice's resonant lowpass: RBJ cookbook coefficients, Direct Form I
/// state. Coefficients and the cached cutoff persist across blocks; the
/// delay line is zeroed at voice birth and otherwise carries over.
#[derive(Debug, Clone, Copy)]
pub struct BiquadLowpass {
    a0: f32,
    a1: f32,
    a2: f32,
    a3: f32,
    a4: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
    last_cutoff_cents: i32,
    last_cutoff_hz: f32,
}

impl BiquadLowpass {
    /// An all-pass identity filter (unit gain, zeroed delay line), the
    /// state a freshly-built voice starts from before its first
    /// coefficient recompute.
    pub fn identity() -> Self {
        Self {
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            a4: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            last_cutoff_cents: i32::MIN,
            last_cutoff_hz: 0.0,
        }
    }

    /// Recomputes coefficients if the integer-truncated `cutoff_cents`
    /// differs from the last value used, leaving the delay line
    /// untouched. `output_rate` bounds the resulting Hz cutoff to
    /// `[1, outputRate/2 - 100]` to keep the filter stable near Nyquist.
    pub fn set_cutoff(&mut self, cutoff_cents: f32, initial_filter_q_cb: f32, output_rate: f32) {
        let truncated = cutoff_cents as i32;
        if truncated == self.last_cutoff_cents {
            return;
        }
        self.last_cutoff_cents = truncated;

        let nyquist_margin = output_rate / 2.0 - 100.0;
        let cutoff_hz = abs_cents_to_hz(cutoff_cents).clamp(1.0, nyquist_margin.max(1.0));
        self.last_cutoff_hz = cutoff_hz;

        let q = q_from_centibels(initial_filter_q_cb);
        let omega = 2.0 * PI * cutoff_hz / output_rate;
        let cos_omega = omega.cos();
        let sin_omega = omega.sin();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        self.a0 = b0 / a0;
        self.a1 = b1 / a0;
        self.a2 = b2 / a0;
        self.a3 = a1 / a0;
        self.a4 = a2 / a0;
    }

    /// Cutoff in Hz the filter is currently operating at.
    pub fn cutoff_hz(&self) -> f32 {
        self.last_cutoff_hz
    }

    /// Direct Form I: `y[n] = a0·x[n] + a1·x[n-1] + a2·x[n-2] - a3·y[n-1] - a4·y[n-2]`.
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.a0 * input + self.a1 * self.x1 + self.a2 * self.x2
            - self.a3 * self.y1
            - self.a4 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Filters `buf` in place, sample by sample.
    pub fn process_buffer(&mut self, buf: &mut [f32]) {
        for sample in buf.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Zeroes the delay line without touching the cached coefficients --
    /// used when rebuilding a voice in place from the per-channel voice
    /// cache.
    pub fn reset_delay_line(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for BiquadLowpass {
    fn default() -> Self {
        Self::identity()
    }
}
