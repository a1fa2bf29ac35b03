//! Oscillator Module
//!
//! Unlike a classic synthesizer oscillator that generates a waveform from a
//! formula, a SoundFont voice's oscillator reads back previously decoded
//! PCM sample data at a variable rate, looping over a sustain region while
//! a key is held. This module is the per-block sample-playback engine:
//! linear interpolation between adjacent frames, fractional-cursor
//! advance, and the three SoundFont loop modes.

/// How a voice's cursor behaves once it reaches the sample's loop region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play through once and stop; no looping.
    #[default]
    None,
    /// Loop the `[loopStart, loopEnd)` region indefinitely.
    Continuous,
    /// Loop while the voice has not entered its release stage, then play
    /// out the remainder like [`LoopMode::None`].
    UntilRelease,
}

impl LoopMode {
    /// Maps the 2-bit `sampleModes` generator value (0..3) to a loop mode.
    /// SoundFont2 reserves value 2 (unused) to mean "no loop".
    pub fn from_sample_modes(sample_modes: i16) -> Self {
        match sample_modes & 0x3 {
            1 => LoopMode::Continuous,
            3 => LoopMode::UntilRelease,
            _ => LoopMode::None,
        }
    }
}

/// The sample-playback parameters an oscillator needs from its voice.
/// Cheap to copy per block; the voice owns the authoritative state.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackState {
    pub cursor: f32,
    pub end: f32,
    pub loop_start: f32,
    pub loop_end: f32,
    pub loop_mode: LoopMode,
    pub playback_step: f32,
    pub tuning_calculated: f32,
    pub is_in_release: bool,
}

/// Outcome of filling one block: how far the cursor ended up, and whether
/// the voice ran off the end of a non-looping sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillResult {
    pub cursor: f32,
    pub finished: bool,
}

/// Fills `buf` with `buf.len()` output frames read from `sample_data`
/// starting at `state.cursor`, advancing the cursor by
/// `playback_step * tuning_calculated` each frame and applying the
/// configured loop policy.
///
/// If `sample_data` is `None` (the sample hasn't been dumped into the
/// store yet), the call is a no-op: `buf` is left untouched (the caller
/// is expected to have zeroed it) and the cursor does not advance, so the
/// voice picks up exactly where it left off once the sample arrives.
pub fn fill(state: &PlaybackState, sample_data: Option<&[f32]>, buf: &mut [f32]) -> FillResult {
    let Some(sample_data) = sample_data else {
        return FillResult {
            cursor: state.cursor,
            finished: false,
        };
    };

    let mut cursor = state.cursor;
    let mut finished = false;

    for sample in buf.iter_mut() {
        if finished {
            *sample = 0.0;
            continue;
        }

        let i = cursor.floor() as isize;
        let frac = cursor - i as f32;
        let a = read_frame(sample_data, i);
        let b = read_frame(sample_data, i + 1);
        *sample = (1.0 - frac) * a + frac * b;

        cursor += state.playback_step * state.tuning_calculated;

        match state.loop_mode {
            LoopMode::None => {
                if cursor >= state.end {
                    cursor = state.end;
                    finished = true;
                }
            }
            LoopMode::Continuous => {
                let span = state.loop_end - state.loop_start;
                while cursor >= state.loop_end && span > 0.0 {
                    cursor -= span;
                }
            }
            LoopMode::UntilRelease => {
                if state.is_in_release {
                    if cursor >= state.end {
                        cursor = state.end;
                        finished = true;
                    }
                } else {
                    let span = state.loop_end - state.loop_start;
                    while cursor >= state.loop_end && span > 0.0 {
                        cursor -= span;
                    }
                }
            }
        }
    }

    FillResult { cursor, finished }
}

fn read_frame(sample_data: &[f32], index: isize) -> f32 {
    if index < 0 {
        0.0
    } else {
        sample_data.get(index as usize).copied().unwrap_or(0.0)
    }
}

/// `playbackStep = (sampleRate / outputRate) · 2^(pitchCorrectionCents / 1200)`.
/// The base frames-per-output-frame rate before per-voice tuning is applied.
pub fn playback_step(sample_rate: f32, output_rate: f32, pitch_correction_cents: f32) -> f32 {
    (sample_rate / output_rate) * 2f32.powf(pitch_correction_cents / 1200.0)
}
