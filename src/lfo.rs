//! LFO (Low-Frequency Oscillator) Module
//!
//! SoundFont LFOs are a single shape -- a triangle wave -- parameterized
//! by a start time and frequency, shared by a voice's vibrato LFO and mod
//! LFO and by a channel's NRPN-driven vibrato. Like the envelopes in
//! [`crate::envelope`], an LFO is evaluated as a pure function of elapsed
//! time rather than stepped incrementally.

use std::f32::consts::PI;

/// Triangle wave in `[-1, 1]` at `freq_hz`, with phase zero at
/// `start_sec`. Returns `0.0` for any `now` before `start_sec` -- this is
/// what gives an LFO its `delay` generator: the LFO simply hasn't started
/// yet.
pub fn lfo_value(start_sec: f64, freq_hz: f32, now: f64) -> f32 {
    if now < start_sec || freq_hz <= 0.0 {
        return 0.0;
    }
    let t = (now - start_sec) as f32;
    let phase = (t * freq_hz).fract();
    triangle(phase)
}

/// Unit triangle wave over one period `phase ∈ [0, 1)`: rises from -1 to
/// 1 over the first half, falls back over the second.
fn triangle(phase: f32) -> f32 {
    let p = phase.rem_euclid(1.0);
    if p < 0.5 {
        4.0 * p - 1.0
    } else {
        3.0 - 4.0 * p
    }
}

/// A voice's vibrato LFO contribution in cents, applied to pitch:
/// `vibLfoToPitch · lfoValue(startTime + delayVibLFO, freqVibLFO, now)`.
pub fn vibrato_pitch_cents(start_time: f64, delay_secs: f32, freq_hz: f32, now: f64, vib_lfo_to_pitch: f32) -> f32 {
    vib_lfo_to_pitch * lfo_value(start_time + delay_secs as f64, freq_hz, now)
}

/// A voice's mod LFO output, to be scaled independently by
/// `modLfoToPitch` (cents), `modLfoToVolume` (centibels), and
/// `modLfoToFilterFc` (cents) by the caller.
pub fn mod_lfo_value(start_time: f64, delay_secs: f32, freq_hz: f32, now: f64) -> f32 {
    lfo_value(start_time + delay_secs as f64, freq_hz, now)
}

/// A channel's NRPN-driven vibrato, added on top of the voice's own
/// vibrato LFO: `depth · lfoValue(startTime + delay, rate, now)` cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelVibrato {
    pub delay_secs: f32,
    pub depth_cents: f32,
    pub rate_hz: f32,
}

impl ChannelVibrato {
    pub const NONE: ChannelVibrato = ChannelVibrato {
        delay_secs: 0.0,
        depth_cents: 0.0,
        rate_hz: 0.0,
    };

    pub fn pitch_cents(&self, start_time: f64, now: f64) -> f32 {
        self.depth_cents * lfo_value(start_time + self.delay_secs as f64, self.rate_hz, now)
    }
}

impl Default for ChannelVibrato {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_start_reads_zero() {
        assert_eq!(lfo_value(5.0, 4.0, 4.9), 0.0);
    }

    #[test]
    fn zero_frequency_reads_zero() {
        assert_eq!(lfo_value(0.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn phase_zero_at_start_is_trough() {
        assert!((lfo_value(0.0, 1.0, 0.0) - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn quarter_period_is_peak() {
        let v = lfo_value(0.0, 1.0, 0.5);
        assert!((v - 1.0).abs() < 1e-5);
    }

    #[test]
    fn triangle_stays_in_unit_range() {
        for i in 0..1000 {
            let now = i as f64 * 0.0013;
            let v = lfo_value(0.0, 3.7, now);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn vibrato_pitch_scales_by_depth_generator() {
        let cents = vibrato_pitch_cents(0.0, 0.0, 1.0, 0.5, 50.0);
        assert!((cents - 50.0).abs() < 1e-3);
    }

    #[test]
    fn channel_vibrato_none_contributes_nothing() {
        assert_eq!(ChannelVibrato::NONE.pitch_cents(0.0, 100.0), 0.0);
    }

    #[test]
    fn channel_vibrato_respects_its_own_delay() {
        let vib = ChannelVibrato {
            delay_secs: 1.0,
            depth_cents: 10.0,
            rate_hz: 2.0,
        };
        assert_eq!(vib.pitch_cents(0.0, 0.5), 0.0);
    }
}
