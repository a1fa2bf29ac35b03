//! Voice Builder Module
//!
//! Turns a preset lookup into one or more live [`Voice`]s: resolves the
//! combined generator vector, the sample's loop geometry, the initial
//! playback cursor, and seeds every piece of per-voice state a fresh
//! voice needs before its first `render_block`. Voices built for the
//! same `(midiNote, velocity)` pair are cached per channel so a repeated
//! note doesn't redo this work every strike.

use std::collections::HashMap;

use crate::filter::BiquadLowpass;
use crate::generator::{combine, GeneratorId};
use crate::modulator::{compute_modulators, ControllerSnapshot};
use crate::oscillator::{self, LoopMode};
use crate::sample_store::SampleStore;
use crate::types::{Preset, VoiceSpec};
use crate::voice::Voice;

/// `initialAttenuation`'s EMU-reference scale factor, applied once after
/// combining the preset and instrument generator layers.
const EMU_ATTENUATION_SCALE: f32 = 0.4;

/// Builds every voice a `(channel, midiNote, velocity)` note-on yields,
/// consulting and (when safe) populating `cache`.
///
/// `controllers` is the owning channel's current controller snapshot
/// source -- used to seed each voice's `modulatedGenerators` at birth.
/// Any sample referenced by the preset lookup that isn't yet in
/// `sample_store` has its id appended to `pending_dumps` so the caller
/// can ask the host to deliver it; the resulting voice still builds (it
/// just renders silence until the dump arrives), but the whole group is
/// withheld from the cache since its `end` would otherwise be wrong.
#[allow(clippy::too_many_arguments)]
pub fn build_voices(
    cache: &mut HashMap<(u8, u8), Vec<Voice>>,
    preset: &dyn Preset,
    channel_index: u8,
    midi_note: u8,
    velocity: u8,
    now: f64,
    output_rate: f32,
    sample_store: &SampleStore,
    controller_snapshot_for: impl Fn(u8, u8) -> ControllerSnapshot,
    pending_dumps: &mut Vec<u64>,
) -> Vec<Voice> {
    let key = (midi_note, velocity);
    if let Some(cached) = cache.get(&key) {
        return cached
            .iter()
            .cloned()
            .map(|mut voice| {
                voice.start_time = now;
                voice
            })
            .collect();
    }

    let specs = preset.lookup(midi_note, velocity);
    let mut voices = Vec::with_capacity(specs.len());
    let mut all_loaded = true;

    for spec in &specs {
        if !sample_store.contains(spec.sample.sample_id) {
            pending_dumps.push(spec.sample.sample_id);
            all_loaded = false;
        }
        let controllers = controller_snapshot_for(velocity, midi_note);
        voices.push(build_one_voice(
            spec,
            channel_index,
            midi_note,
            velocity,
            now,
            output_rate,
            &controllers,
        ));
    }

    if all_loaded && !voices.is_empty() {
        cache.insert(key, voices.clone());
    }

    voices
}

fn build_one_voice(
    spec: &VoiceSpec,
    channel_index: u8,
    midi_note: u8,
    incoming_velocity: u8,
    now: f64,
    output_rate: f32,
    controllers: &ControllerSnapshot,
) -> Voice {
    let mut generators = combine(&spec.preset_generators, &spec.instrument_generators);
    let scaled_attenuation =
        (generators.get(GeneratorId::InitialAttenuation) as f32 * EMU_ATTENUATION_SCALE) as i16;
    generators.set(GeneratorId::InitialAttenuation, scaled_attenuation);

    let overriding_root_key = generators.get(GeneratorId::OverridingRootKey);
    let root_key = if overriding_root_key >= 0 {
        overriding_root_key as u8
    } else {
        spec.sample.root_pitch
    };

    let key_num = generators.get(GeneratorId::KeyNum);
    let target_key = if key_num >= 0 { key_num as u8 } else { midi_note };

    let velocity_gen = generators.get(GeneratorId::Velocity);
    let velocity = if velocity_gen >= 0 {
        velocity_gen as u8
    } else {
        incoming_velocity
    };

    let loop_start = spec.sample.loop_start_frames as f32
        + generators.get(GeneratorId::StartloopAddrsOffset) as f32
        + 32768.0 * generators.get(GeneratorId::StartloopAddrsCoarseOffset) as f32;
    let loop_end = spec.sample.loop_end_frames as f32
        + generators.get(GeneratorId::EndloopAddrsOffset) as f32
        + 32768.0 * generators.get(GeneratorId::EndloopAddrsCoarseOffset) as f32;

    let looping_mode = if loop_end - loop_start < 1.0 {
        LoopMode::None
    } else {
        LoopMode::from_sample_modes(generators.get(GeneratorId::SampleModes))
    };

    let playback_step = oscillator::playback_step(
        spec.sample.sample_rate,
        output_rate,
        spec.sample.pitch_correction_cents,
    );

    let cursor = generators.get(GeneratorId::StartAddrsOffset) as f32
        + 32768.0 * generators.get(GeneratorId::StartAddrsCoarseOffset) as f32;

    let sample_len = spec.sample.data.as_ref().map(|d| d.len() as i32).unwrap_or(0);
    let end = (sample_len - 1) as f32
        + generators.get(GeneratorId::EndAddrsOffset) as f32
        + 32768.0 * generators.get(GeneratorId::EndAddrsCoarseOffset) as f32;

    let exclusive_class = generators.get(GeneratorId::ExclusiveClass);
    let modulated_generators = compute_modulators(&generators, &spec.modulators, controllers);

    Voice {
        channel_index,
        midi_note,
        velocity,
        target_key,
        start_time: now,
        sample_id: spec.sample.sample_id,
        cursor,
        playback_step,
        root_key,
        loop_start,
        loop_end,
        end,
        looping_mode,
        generators,
        modulated_generators,
        modulators: spec.modulators.clone(),
        release_start_time: f64::INFINITY,
        release_start_attenuation_db: None,
        release_start_mod_env: None,
        current_attenuation_db: crate::envelope::SILENCE_DB,
        current_mod_env_value: 0.0,
        current_tuning_cents: 0,
        current_tuning_calculated: 1.0,
        filter: BiquadLowpass::identity(),
        is_in_release: false,
        finished: false,
        exclusive_class,
    }
}
