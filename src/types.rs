//! Types Module
//!
//! Slim collaborator-contract records standing in for a SoundFont2/3
//! file parser: this crate never reads `.sf2`/`.sf3`/Vorbis bytes, it
//! only consumes [`Sample`], [`Preset`], [`Generators`](crate::generator::Generators)
//! and [`Modulator`](crate::modulator::Modulator) records handed to it by
//! whatever loads the font file.

use crate::generator::Generators;
use crate::modulator::Modulator;
use serde::{Deserialize, Serialize};

/// An immutable sample record: either inline PCM frames or a handle a
/// voice can carry around before the frames have actually arrived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub sample_id: u64,
    pub sample_rate: f32,
    pub root_pitch: u8,
    pub pitch_correction_cents: f32,
    pub loop_start_frames: u32,
    pub loop_end_frames: u32,
    pub is_compressed: bool,
    /// Mono float PCM, normalized to `[-1, 1]`. `None` when the frames
    /// haven't been dumped into the [`crate::sample_store::SampleStore`]
    /// yet -- the voice still knows the sample's metadata (root pitch,
    /// loop points) from this record even before its audio arrives.
    pub data: Option<Vec<f32>>,
}

/// One (sample, preset-zone generators, instrument-zone generators,
/// modulators) quadruple a preset lookup yields for a given
/// (midiNote, velocity) pair. A preset can yield more than one of these
/// for a single note (layered instruments).
#[derive(Debug, Clone)]
pub struct VoiceSpec {
    pub sample: Sample,
    pub preset_generators: Generators,
    pub instrument_generators: Generators,
    pub modulators: Vec<Modulator>,
}

/// A preset: given a MIDI note and velocity, yields the zones that
/// should sound. The real implementation of key/velocity range
/// filtering and zone overlay lives in the font-parsing collaborator;
/// this trait is the seam this crate calls through.
pub trait Preset {
    /// Returns every voice spec that should sound for `(midi_note, velocity)`.
    fn lookup(&self, midi_note: u8, velocity: u8) -> Vec<VoiceSpec>;
}
