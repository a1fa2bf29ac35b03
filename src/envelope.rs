//! Envelope Module
//!
//! Two distinct envelope shapes live here: the six-state DAHDSR volume
//! envelope that drives a voice's attenuation in dB, and the five-stage
//! modulation envelope that drives a unit-ranged value fed into pitch and
//! filter-cutoff generators. Both are pure functions of elapsed time
//! rather than incrementally-stepped state machines, matching the rest of
//! this crate's time-driven components (see [`crate::lfo`]).

use crate::units::timecents_to_seconds;

/// A voice's attenuation is initialized to 100 dB (silence) and the
/// release stage ramps back to this floor.
pub const SILENCE_DB: f32 = 100.0;

/// A voice whose pre-envelope attenuation exceeds this many centibels is
/// inaudible and should be skipped rather than rendered.
pub const OVER_ATTENUATION_THRESHOLD_CENTIBELS: f32 = 2500.0;

/// Which of the six DAHDSR stages a volume envelope is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeEnvelopeStage {
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

/// Durations (seconds) and sustain level (dB attenuation) for one voice's
/// volume envelope, already key-tracked (see [`key_tracked_seconds`]) and
/// unit-converted by the caller.
#[derive(Debug, Clone, Copy)]
pub struct VolumeEnvelopeParams {
    pub delay_secs: f32,
    pub attack_secs: f32,
    pub hold_secs: f32,
    pub decay_secs: f32,
    pub sustain_db: f32,
    pub release_secs: f32,
}

/// Result of evaluating a volume envelope at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeEnvelopeOutput {
    pub attenuation_db: f32,
    pub stage: VolumeEnvelopeStage,
    pub finished: bool,
}

/// Evaluates the DAHDSR volume envelope at `now`.
///
/// `start_time` is when the voice was born. `release` is `Some((start,
/// start_db))` once the voice has entered release, where `start_db` is
/// the attenuation captured at the instant release began — release ramps
/// from *that* value back to [`SILENCE_DB`], not from the sustain level,
/// since a note can be released mid-attack or mid-decay.
pub fn volume_envelope(
    params: &VolumeEnvelopeParams,
    start_time: f64,
    now: f64,
    release: Option<(f64, f32)>,
) -> VolumeEnvelopeOutput {
    if let Some((release_start, release_start_db)) = release {
        let elapsed = (now - release_start).max(0.0) as f32;
        if params.release_secs <= 0.0 || elapsed >= params.release_secs {
            return VolumeEnvelopeOutput {
                attenuation_db: SILENCE_DB,
                stage: VolumeEnvelopeStage::Release,
                finished: true,
            };
        }
        let t = elapsed / params.release_secs;
        return VolumeEnvelopeOutput {
            attenuation_db: release_start_db + (SILENCE_DB - release_start_db) * t,
            stage: VolumeEnvelopeStage::Release,
            finished: false,
        };
    }

    let mut elapsed = (now - start_time).max(0.0) as f32;

    if elapsed < params.delay_secs {
        return VolumeEnvelopeOutput {
            attenuation_db: SILENCE_DB,
            stage: VolumeEnvelopeStage::Delay,
            finished: false,
        };
    }
    elapsed -= params.delay_secs;

    if elapsed < params.attack_secs {
        // Linear in linear gain, not in dB -- produces the convex dB
        // ramp a real envelope-over-VCA attack stage has.
        let gain = if params.attack_secs > 0.0 {
            elapsed / params.attack_secs
        } else {
            1.0
        };
        let attenuation_db = if gain <= 0.0001 {
            SILENCE_DB
        } else {
            (-20.0 * gain.log10()).clamp(0.0, SILENCE_DB)
        };
        return VolumeEnvelopeOutput {
            attenuation_db,
            stage: VolumeEnvelopeStage::Attack,
            finished: false,
        };
    }
    elapsed -= params.attack_secs;

    if elapsed < params.hold_secs {
        return VolumeEnvelopeOutput {
            attenuation_db: 0.0,
            stage: VolumeEnvelopeStage::Hold,
            finished: false,
        };
    }
    elapsed -= params.hold_secs;

    if elapsed < params.decay_secs {
        let t = if params.decay_secs > 0.0 {
            elapsed / params.decay_secs
        } else {
            1.0
        };
        return VolumeEnvelopeOutput {
            attenuation_db: params.sustain_db * t,
            stage: VolumeEnvelopeStage::Decay,
            finished: false,
        };
    }

    VolumeEnvelopeOutput {
        attenuation_db: params.sustain_db,
        stage: VolumeEnvelopeStage::Sustain,
        finished: false,
    }
}

/// Applies the `keyNumToVolEnvHold`/`keyNumToVolEnvDecay`-style key
/// tracking adjustment to a timecents duration before converting to
/// seconds: `baseTimecents + keyToEnvGen · (60 − key) / 1200` in log2
/// space, i.e. the generator value scales linearly with distance from
/// key 60 (middle C).
pub fn key_tracked_seconds(base_timecents: f32, key_to_env_generator: f32, key: u8) -> f32 {
    let adjusted = base_timecents + key_to_env_generator * (60.0 - key as f32);
    timecents_to_seconds(adjusted)
}

/// The five-stage modulation envelope: same stage shape as the volume
/// envelope but with a unit-ranged `[0, 1]` output and no independent
/// attenuation-floor concept -- it feeds `modEnvToPitch`/
/// `modEnvToFilterFc`, not attenuation.
#[derive(Debug, Clone, Copy)]
pub struct ModEnvelopeParams {
    pub delay_secs: f32,
    pub attack_secs: f32,
    pub hold_secs: f32,
    pub decay_secs: f32,
    pub sustain_level: f32,
    pub release_secs: f32,
}

/// Evaluates the modulation envelope at `now`. `release` is `Some((start,
/// value_at_release))`, mirroring [`volume_envelope`]: release ramps from
/// the value captured at release onset back to zero.
pub fn mod_envelope(params: &ModEnvelopeParams, start_time: f64, now: f64, release: Option<(f64, f32)>) -> f32 {
    if let Some((release_start, release_start_value)) = release {
        let elapsed = (now - release_start).max(0.0) as f32;
        if params.release_secs <= 0.0 || elapsed >= params.release_secs {
            return 0.0;
        }
        let t = elapsed / params.release_secs;
        return release_start_value * (1.0 - t);
    }

    let mut elapsed = (now - start_time).max(0.0) as f32;

    if elapsed < params.delay_secs {
        return 0.0;
    }
    elapsed -= params.delay_secs;

    if elapsed < params.attack_secs {
        return if params.attack_secs > 0.0 {
            elapsed / params.attack_secs
        } else {
            1.0
        };
    }
    elapsed -= params.attack_secs;

    if elapsed < params.hold_secs {
        return 1.0;
    }
    elapsed -= params.hold_secs;

    if elapsed < params.decay_secs {
        let t = if params.decay_secs > 0.0 {
            elapsed / params.decay_secs
        } else {
            1.0
        };
        // Exponential decay curve, matching the spec's "linear attack,
        // exponential decay" shape for the modulation envelope.
        return 1.0 + (params.sustain_level - 1.0) * (1.0 - (1.0 - t).powi(2));
    }

    params.sustain_level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VolumeEnvelopeParams {
        VolumeEnvelopeParams {
            delay_secs: 0.1,
            attack_secs: 0.2,
            hold_secs: 0.1,
            decay_secs: 0.3,
            sustain_db: 20.0,
            release_secs: 0.5,
        }
    }

    #[test]
    fn delay_stage_is_silent() {
        let out = volume_envelope(&params(), 0.0, 0.05, None);
        assert_eq!(out.stage, VolumeEnvelopeStage::Delay);
        assert_eq!(out.attenuation_db, SILENCE_DB);
    }

    #[test]
    fn attack_stage_ends_near_zero_db() {
        let p = params();
        let out = volume_envelope(&p, 0.0, p.delay_secs as f64 + p.attack_secs as f64 - 0.001, None);
        assert_eq!(out.stage, VolumeEnvelopeStage::Attack);
        assert!(out.attenuation_db < 1.0);
    }

    #[test]
    fn hold_stage_holds_at_zero_db() {
        let p = params();
        let now = (p.delay_secs + p.attack_secs) as f64 + 0.05;
        let out = volume_envelope(&p, 0.0, now, None);
        assert_eq!(out.stage, VolumeEnvelopeStage::Hold);
        assert_eq!(out.attenuation_db, 0.0);
    }

    #[test]
    fn sustain_stage_holds_at_sustain_level() {
        let p = params();
        let now = (p.delay_secs + p.attack_secs + p.hold_secs + p.decay_secs) as f64 + 1.0;
        let out = volume_envelope(&p, 0.0, now, None);
        assert_eq!(out.stage, VolumeEnvelopeStage::Sustain);
        assert_eq!(out.attenuation_db, p.sustain_db);
    }

    #[test]
    fn release_ramps_from_capture_point_to_silence() {
        let p = params();
        let release_start = 2.0;
        let out_start = volume_envelope(&p, 0.0, release_start, Some((release_start, 10.0)));
        assert_eq!(out_start.attenuation_db, 10.0);
        let out_end = volume_envelope(
            &p,
            0.0,
            release_start + p.release_secs as f64 + 1.0,
            Some((release_start, 10.0)),
        );
        assert!(out_end.finished);
        assert_eq!(out_end.attenuation_db, SILENCE_DB);
    }

    #[test]
    fn key_tracking_shortens_hold_above_middle_c() {
        let base = -1000.0;
        let at_60 = key_tracked_seconds(base, -100.0, 60);
        let at_72 = key_tracked_seconds(base, -100.0, 72);
        assert!(at_72 < at_60);
    }

    #[test]
    fn mod_envelope_attack_is_linear_and_decay_is_not() {
        let p = ModEnvelopeParams {
            delay_secs: 0.0,
            attack_secs: 1.0,
            hold_secs: 0.0,
            decay_secs: 1.0,
            sustain_level: 0.2,
            release_secs: 0.5,
        };
        assert!((mod_envelope(&p, 0.0, 0.5, None) - 0.5).abs() < 1e-6);
        let mid_decay = mod_envelope(&p, 0.0, 1.5, None);
        let linear_mid = 1.0 + (p.sustain_level - 1.0) * 0.5;
        assert!((mid_decay - linear_mid).abs() > 1e-3);
    }

    #[test]
    fn mod_envelope_release_ramps_to_zero() {
        let p = ModEnvelopeParams {
            delay_secs: 0.0,
            attack_secs: 1.0,
            hold_secs: 0.0,
            decay_secs: 1.0,
            sustain_level: 0.2,
            release_secs: 0.5,
        };
        let value = mod_envelope(&p, 0.0, 2.0, Some((2.0, 0.2)));
        assert!((value - 0.2).abs() < 1e-6);
        let value_end = mod_envelope(&p, 0.0, 2.6, Some((2.0, 0.2)));
        assert_eq!(value_end, 0.0);
    }
}
