//! Voice Module
//!
//! A `Voice` is the one mutable entity synthesis revolves around: one
//! active instance of one sample, combining the oscillator, both
//! envelopes, both LFOs, the filter, and the panner every block. Nothing
//! here allocates or blocks -- a voice's working state (filter delay
//! line, cursor, envelope stage inputs) lives entirely in its fields.

use crate::envelope::{
    key_tracked_seconds, mod_envelope, volume_envelope, ModEnvelopeParams, VolumeEnvelopeParams,
    OVER_ATTENUATION_THRESHOLD_CENTIBELS, SILENCE_DB,
};
use crate::filter::BiquadLowpass;
use crate::generator::{GeneratorId, Generators};
use crate::lfo::{mod_lfo_value, vibrato_pitch_cents, ChannelVibrato};
use crate::modulator::Modulator;
use crate::oscillator::{fill, LoopMode, PlaybackState};
use crate::panner::{pan_gains, PanGains};
use crate::units::{cents_to_lfo_hz, timecents_to_seconds, CentibelGainTable};

/// A voice's sample-loop policy -- re-exported so callers building voices
/// don't need to reach into [`crate::oscillator`] directly.
pub use crate::oscillator::LoopMode as VoiceLoopMode;

/// The central per-note synthesis entity.
#[derive(Debug, Clone)]
pub struct Voice {
    // Identification
    pub channel_index: u8,
    pub midi_note: u8,
    pub velocity: u8,
    pub target_key: u8,
    pub start_time: f64,

    // Sample slice
    pub sample_id: u64,
    pub cursor: f32,
    pub playback_step: f32,
    pub root_key: u8,
    pub loop_start: f32,
    pub loop_end: f32,
    pub end: f32,
    pub looping_mode: LoopMode,

    // Generators
    pub generators: Generators,
    pub modulated_generators: Generators,
    pub modulators: Vec<Modulator>,

    // Envelope state
    pub release_start_time: f64,
    pub release_start_attenuation_db: Option<f32>,
    pub release_start_mod_env: Option<f32>,
    pub current_attenuation_db: f32,
    pub current_mod_env_value: f32,

    // Tuning cache
    pub current_tuning_cents: i32,
    pub current_tuning_calculated: f32,

    // Filter
    pub filter: BiquadLowpass,

    // Flags
    pub is_in_release: bool,
    pub finished: bool,
    pub exclusive_class: i16,
}

impl Voice {
    /// Whether this voice's channel/key match a note-off / kill-note
    /// target and it hasn't already begun releasing.
    pub fn matches_note(&self, channel_index: u8, midi_note: u8) -> bool {
        self.channel_index == channel_index && self.midi_note == midi_note && !self.is_in_release
    }

    /// Puts the voice into its RELEASE stage, capturing the attenuation
    /// and mod-envelope value it had at this instant -- release always
    /// ramps from *here*, not from the sustain level, since a note can be
    /// cut off mid-attack.
    pub fn begin_release(&mut self, now: f64) {
        if self.is_in_release {
            return;
        }
        self.is_in_release = true;
        self.release_start_time = now;
        self.release_start_attenuation_db = Some(self.current_attenuation_db);
        self.release_start_mod_env = Some(self.current_mod_env_value);
    }

    /// Forces an immediate (near-instant) release, as used for
    /// exclusive-class cutoff and `killNote`: overrides `releaseVolEnv`
    /// to the given cents value before releasing.
    pub fn force_release(&mut self, release_vol_env_cents: i16, now: f64) {
        self.modulated_generators.set(GeneratorId::ReleaseVolEnv, release_vol_env_cents);
        self.begin_release(now);
    }

    fn volume_envelope_params(&self) -> VolumeEnvelopeParams {
        let g = &self.modulated_generators;
        VolumeEnvelopeParams {
            delay_secs: timecents_to_seconds(g.get(GeneratorId::DelayVolEnv) as f32),
            attack_secs: timecents_to_seconds(g.get(GeneratorId::AttackVolEnv) as f32),
            hold_secs: key_tracked_seconds(
                g.get(GeneratorId::HoldVolEnv) as f32,
                g.get(GeneratorId::KeyNumToVolEnvHold) as f32,
                self.target_key,
            ),
            decay_secs: key_tracked_seconds(
                g.get(GeneratorId::DecayVolEnv) as f32,
                g.get(GeneratorId::KeyNumToVolEnvDecay) as f32,
                self.target_key,
            ),
            sustain_db: g.get(GeneratorId::SustainVolEnv) as f32 / 10.0,
            release_secs: timecents_to_seconds(g.get(GeneratorId::ReleaseVolEnv) as f32),
        }
    }

    fn mod_envelope_params(&self) -> ModEnvelopeParams {
        let g = &self.modulated_generators;
        ModEnvelopeParams {
            delay_secs: timecents_to_seconds(g.get(GeneratorId::DelayModEnv) as f32),
            attack_secs: timecents_to_seconds(g.get(GeneratorId::AttackModEnv) as f32),
            hold_secs: key_tracked_seconds(
                g.get(GeneratorId::HoldModEnv) as f32,
                g.get(GeneratorId::KeyNumToModEnvHold) as f32,
                self.target_key,
            ),
            decay_secs: key_tracked_seconds(
                g.get(GeneratorId::DecayModEnv) as f32,
                g.get(GeneratorId::KeyNumToModEnvDecay) as f32,
                self.target_key,
            ),
            sustain_level: 1.0 - (g.get(GeneratorId::SustainModEnv) as f32 / 1000.0),
            release_secs: timecents_to_seconds(g.get(GeneratorId::ReleaseModEnv) as f32),
        }
    }

    fn release_pair(&self, captured: Option<f32>) -> Option<(f64, f32)> {
        captured.map(|value| (self.release_start_time, value))
    }

    /// Renders `block_len` output frames into `scratch`, advancing every
    /// piece of per-voice state (cursor, envelopes, filter, tuning) along
    /// the way, then mixes the result into the output planes through the
    /// panner. `sample_data` is `None` until the sample store has the
    /// voice's sample; in that case the voice still advances its
    /// envelope/LFO clocks (so it starts in the right place once the
    /// sample arrives) but contributes silence.
    #[allow(clippy::too_many_arguments)]
    pub fn render_block(
        &mut self,
        sample_data: Option<&[f32]>,
        gain_table: &CentibelGainTable,
        output_rate: f32,
        block_start_now: f64,
        block_len: usize,
        channel_vibrato: &ChannelVibrato,
        scratch: &mut [f32],
        main_left: &mut [f32],
        main_right: &mut [f32],
        reverb_left: &mut [f32],
        reverb_right: &mut [f32],
        chorus_left: &mut [f32],
        chorus_right: &mut [f32],
    ) {
        debug_assert!(scratch.len() >= block_len);
        let vol_params = self.volume_envelope_params();
        let mod_params = self.mod_envelope_params();
        let g = self.modulated_generators;

        // Pre-envelope initial attenuation, in centibels. Gates the whole
        // voice regardless of where the running envelope attenuation is.
        let initial_attenuation_cb = g.get(GeneratorId::InitialAttenuation) as f32;
        let over_attenuated = initial_attenuation_cb >= OVER_ATTENUATION_THRESHOLD_CENTIBELS;

        let frame_dt = 1.0 / output_rate as f64;

        for i in 0..block_len {
            let now = block_start_now + i as f64 * frame_dt;

            let mod_env_release = self.release_pair(self.release_start_mod_env);
            self.current_mod_env_value = mod_envelope(&mod_params, self.start_time, now, mod_env_release);

            let vol_release = self.release_pair(self.release_start_attenuation_db);
            let vol_out = volume_envelope(&vol_params, self.start_time, now, vol_release);
            self.current_attenuation_db = vol_out.attenuation_db;
            if vol_out.finished {
                self.finished = true;
            }

            let mod_lfo = mod_lfo_value(
                self.start_time,
                timecents_to_seconds(g.get(GeneratorId::DelayModLfo) as f32),
                cents_to_lfo_hz(g.get(GeneratorId::FreqModLfo) as f32),
                now,
            );
            let vib_cents = vibrato_pitch_cents(
                self.start_time,
                timecents_to_seconds(g.get(GeneratorId::DelayVibLfo) as f32),
                cents_to_lfo_hz(g.get(GeneratorId::FreqVibLfo) as f32),
                now,
                g.get(GeneratorId::VibLfoToPitch) as f32,
            );

            let tuning_cents_f = g.get(GeneratorId::CoarseTune) as f32 * 100.0
                + g.get(GeneratorId::FineTune) as f32
                + g.get(GeneratorId::ModEnvToPitch) as f32 * self.current_mod_env_value
                + g.get(GeneratorId::ModLfoToPitch) as f32 * mod_lfo
                + vib_cents
                + channel_vibrato.pitch_cents(self.start_time, now);
            let truncated = tuning_cents_f as i32;
            if truncated != self.current_tuning_cents {
                self.current_tuning_cents = truncated;
                self.current_tuning_calculated = 2f32.powf(tuning_cents_f / 1200.0);
            }

            let cutoff_cents = g.get(GeneratorId::InitialFilterFc) as f32
                + g.get(GeneratorId::ModEnvToFilterFc) as f32 * self.current_mod_env_value
                + g.get(GeneratorId::ModLfoToFilterFc) as f32 * mod_lfo;
            self.filter
                .set_cutoff(cutoff_cents, g.get(GeneratorId::InitialFilterQ) as f32, output_rate);

            let playback_state = PlaybackState {
                cursor: self.cursor,
                end: self.end,
                loop_start: self.loop_start,
                loop_end: self.loop_end,
                loop_mode: self.looping_mode,
                playback_step: self.playback_step,
                tuning_calculated: self.current_tuning_calculated,
                is_in_release: self.is_in_release,
            };
            let mut one = [0.0f32];
            let fill_result = fill(&playback_state, sample_data, &mut one);
            self.cursor = fill_result.cursor;
            if fill_result.finished {
                self.finished = true;
            }

            let raw = if sample_data.is_some() { one[0] } else { 0.0 };
            let filtered = self.filter.process_sample(raw);

            let mod_lfo_volume_cb = g.get(GeneratorId::ModLfoToVolume) as f32 * mod_lfo;
            let centibels = self.current_attenuation_db * 10.0 + initial_attenuation_cb + mod_lfo_volume_cb;
            let gain = if over_attenuated { 0.0 } else { gain_table.lookup(centibels.max(0.0)) };

            scratch[i] = filtered * gain;
        }

        if over_attenuated && self.is_in_release {
            self.finished = true;
        }

        let gains = pan_gains(
            g.get(GeneratorId::Pan),
            g.get(GeneratorId::ReverbEffectsSend),
            g.get(GeneratorId::ChorusEffectsSend),
        );
        crate::panner::mix_into(
            &scratch[..block_len],
            &gains,
            main_left,
            main_right,
            reverb_left,
            reverb_right,
            chorus_left,
            chorus_right,
        );
    }

    /// Whether this voice is audible right now -- used by voice stealing
    /// and by the muted-channel skip, which still calls [`Self::render_block`]
    /// for clock-advance purposes but discards its mix.
    pub fn pan_gains(&self) -> PanGains {
        pan_gains(
            self.modulated_generators.get(GeneratorId::Pan),
            self.modulated_generators.get(GeneratorId::ReverbEffectsSend),
            self.modulated_generators.get(GeneratorId::ChorusEffectsSend),
        )
    }
}
