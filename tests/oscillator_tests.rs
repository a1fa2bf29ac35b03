//! Integration tests for the wavetable oscillator driven through a real
//! built [`sfcore::Voice`], rather than the bare [`sfcore::oscillator::fill`]
//! unit tests living alongside the module itself.

mod common;

use common::{calculate_rms, sine_sample, SingleZonePreset};
use sfcore::generator::GeneratorId;
use sfcore::oscillator::LoopMode;
use sfcore::sample_store::SampleStore;
use sfcore::voice_builder::build_voices;
use std::collections::HashMap;

const OUTPUT_RATE: f32 = 48000.0;

#[test]
fn continuous_loop_produces_a_steady_tone_across_block_boundaries() {
    let sample = sine_sample(1, 44100.0, 440.0, 100);
    let preset = SingleZonePreset::new(sample).with_instrument_gen(GeneratorId::SampleModes, 1);

    let mut store = SampleStore::new();
    store.dump(1, preset.sample.data.clone().unwrap());
    let mut cache = HashMap::new();
    let mut pending = Vec::new();
    let mut voices = build_voices(
        &mut cache,
        &preset,
        0,
        60,
        100,
        0.0,
        OUTPUT_RATE,
        &store,
        |_, _| sfcore::modulator::ControllerSnapshot::defaults(),
        &mut pending,
    );
    assert!(pending.is_empty());
    assert_eq!(voices[0].looping_mode, LoopMode::Continuous);

    let gain_table = sfcore::units::CentibelGainTable::new();
    let vibrato = sfcore::lfo::ChannelVibrato::NONE;
    let block_len = 4096;
    let mut scratch = vec![0.0f32; block_len];
    let mut main_l = vec![0.0f32; block_len];
    let mut main_r = vec![0.0f32; block_len];
    let mut rev_l = vec![0.0f32; block_len];
    let mut rev_r = vec![0.0f32; block_len];
    let mut cho_l = vec![0.0f32; block_len];
    let mut cho_r = vec![0.0f32; block_len];

    voices[0].render_block(
        store.get(1).map(|f| f.as_slice()),
        &gain_table,
        OUTPUT_RATE,
        0.0,
        block_len,
        &vibrato,
        &mut scratch,
        &mut main_l,
        &mut main_r,
        &mut rev_l,
        &mut rev_r,
        &mut cho_l,
        &mut cho_r,
    );

    // Many periods of a 44.1kHz-sourced 440Hz tone resampled to 48kHz
    // over nearly a tenth of a second: the loop must have wrapped many
    // times without ever finishing, and the result should carry real
    // energy rather than decaying to silence.
    assert!(!voices[0].finished);
    assert!(voices[0].cursor >= 0.0 && voices[0].cursor < 100.0);
    assert!(calculate_rms(&main_l) > 0.05);
}

#[test]
fn non_looping_sample_finishes_once_cursor_passes_its_end() {
    let sample = sine_sample(2, 48000.0, 220.0, 64);
    let preset = SingleZonePreset::new(sample);

    let mut store = SampleStore::new();
    store.dump(2, preset.sample.data.clone().unwrap());
    let mut cache = HashMap::new();
    let mut pending = Vec::new();
    let mut voices = build_voices(
        &mut cache,
        &preset,
        0,
        60,
        100,
        0.0,
        OUTPUT_RATE,
        &store,
        |_, _| sfcore::modulator::ControllerSnapshot::defaults(),
        &mut pending,
    );
    assert_eq!(voices[0].looping_mode, LoopMode::None);

    let gain_table = sfcore::units::CentibelGainTable::new();
    let vibrato = sfcore::lfo::ChannelVibrato::NONE;
    let block_len = 256;
    let mut scratch = vec![0.0f32; block_len];
    let mut main_l = vec![0.0f32; block_len];
    let mut main_r = vec![0.0f32; block_len];
    let mut rev_l = vec![0.0f32; block_len];
    let mut rev_r = vec![0.0f32; block_len];
    let mut cho_l = vec![0.0f32; block_len];
    let mut cho_r = vec![0.0f32; block_len];

    voices[0].render_block(
        store.get(2).map(|f| f.as_slice()),
        &gain_table,
        OUTPUT_RATE,
        0.0,
        block_len,
        &vibrato,
        &mut scratch,
        &mut main_l,
        &mut main_r,
        &mut rev_l,
        &mut rev_r,
        &mut cho_l,
        &mut cho_r,
    );

    assert!(voices[0].finished);
}

#[test]
fn degenerate_loop_bounds_force_no_looping_regardless_of_sample_modes() {
    let mut sample = sine_sample(3, 44100.0, 440.0, 2000);
    sample.loop_start_frames = 1000;
    sample.loop_end_frames = 1000;
    let preset = SingleZonePreset::new(sample).with_instrument_gen(GeneratorId::SampleModes, 1);

    let mut store = SampleStore::new();
    store.dump(3, preset.sample.data.clone().unwrap());
    let mut cache = HashMap::new();
    let mut pending = Vec::new();
    let voices = build_voices(
        &mut cache,
        &preset,
        0,
        60,
        100,
        0.0,
        OUTPUT_RATE,
        &store,
        |_, _| sfcore::modulator::ControllerSnapshot::defaults(),
        &mut pending,
    );

    assert_eq!(voices[0].looping_mode, LoopMode::None);
}

#[test]
fn playback_step_scales_with_sample_rate_ratio_not_output_rate() {
    let fast = sfcore::oscillator::playback_step(96000.0, OUTPUT_RATE, 0.0);
    let slow = sfcore::oscillator::playback_step(24000.0, OUTPUT_RATE, 0.0);
    assert!(fast > 1.0);
    assert!(slow < 1.0);
    assert!((fast / slow - 4.0).abs() < 1e-4);
}
