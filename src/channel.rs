//! Channel Module
//!
//! One MIDI-style channel: its controller table, hold-pedal sustain
//! list, active voices, mute flag, and the per-`(note, velocity)` voice
//! cache the voice builder consults. Every method here is the
//! implementation of one row of the channel-manager event table; the
//! [`crate::processor::Processor`] is the thing that actually drains the
//! event queue and calls into these.

use std::collections::HashMap;

use crate::lfo::ChannelVibrato;
use crate::modulator::{compute_modulators, ControllerSnapshot};
use crate::voice::Voice;

/// Number of slots in a channel's controller table: the 128 standard
/// MIDI CCs plus a tail of non-CC values.
pub const CONTROLLER_TABLE_SIZE: usize = 147;

/// Index of the first non-CC slot in the controller table.
pub const NON_CC_INDEX_OFFSET: usize = 128;

/// A released voice is held open at least this long after its birth,
/// so a note-on immediately followed by a note-off still produces an
/// audible transient instead of being silently swallowed.
pub const MIN_NOTE_LENGTH: f64 = 0.07;

const CC_MAIN_VOLUME: usize = 7;
const CC_PAN: usize = 10;
const CC_EXPRESSION: usize = 11;
const CC_SUSTAIN: usize = 64;
const CC_RELEASE_TIME: usize = 72;
const CC_BRIGHTNESS: usize = 74;

const IDX_PITCH_WHEEL: usize = NON_CC_INDEX_OFFSET;
const IDX_PITCH_WHEEL_RANGE: usize = NON_CC_INDEX_OFFSET + 1;
const IDX_CHANNEL_PRESSURE: usize = NON_CC_INDEX_OFFSET + 2;
const IDX_CHANNEL_TUNING: usize = NON_CC_INDEX_OFFSET + 3;
const IDX_CHANNEL_TRANSPOSE: usize = NON_CC_INDEX_OFFSET + 4;

fn default_controllers() -> [u16; CONTROLLER_TABLE_SIZE] {
    let mut c = [0u16; CONTROLLER_TABLE_SIZE];
    c[CC_MAIN_VOLUME] = 100 << 7;
    c[CC_EXPRESSION] = 127 << 7;
    c[CC_PAN] = 64 << 7;
    c[CC_RELEASE_TIME] = 64 << 7;
    c[CC_BRIGHTNESS] = 64 << 7;
    c[IDX_PITCH_WHEEL] = 8192;
    c[IDX_PITCH_WHEEL_RANGE] = 2 << 7;
    c[IDX_CHANNEL_PRESSURE] = 127 << 7;
    c[IDX_CHANNEL_TUNING] = 0;
    c
}

fn enforce_min_note_length(voice: &Voice, now: f64) -> f64 {
    now.max(voice.start_time + MIN_NOTE_LENGTH)
}

/// One synthesizer channel. Owns its voices outright -- a `Voice` is
/// never aliased or shared across channels.
#[derive(Debug)]
pub struct Channel {
    pub controllers: [u16; CONTROLLER_TABLE_SIZE],
    pub hold_pedal: bool,
    pub channel_vibrato: ChannelVibrato,
    pub voices: Vec<Voice>,
    pub sustained_voices: Vec<Voice>,
    pub is_muted: bool,
    /// `(midiNote, velocity) -> built voices`, short-circuiting the
    /// voice builder. Forbidden to populate until every sample a group
    /// references has been resolved -- see [`crate::voice_builder`].
    pub voice_cache: HashMap<(u8, u8), Vec<Voice>>,
}

impl Channel {
    pub fn new() -> Self {
        Self {
            controllers: default_controllers(),
            hold_pedal: false,
            channel_vibrato: ChannelVibrato::NONE,
            voices: Vec::new(),
            sustained_voices: Vec::new(),
            is_muted: false,
            voice_cache: HashMap::new(),
        }
    }

    /// Total live voices this channel is carrying, including sustained
    /// (hold-pedal-held) ones.
    pub fn live_voice_count(&self) -> usize {
        self.voices.len() + self.sustained_voices.len()
    }

    fn raw_cc(&self, cc: u8) -> u8 {
        (self.controllers[cc as usize] >> 7) as u8
    }

    /// Builds the controller snapshot a specific voice's modulators read
    /// from: the channel's live controller state, plus that voice's own
    /// fixed-at-birth note-on velocity and key (a modulator's "note-on
    /// velocity" source is not a live value -- it's whatever the note
    /// started with).
    pub fn controller_snapshot_for_voice(&self, voice: &Voice) -> ControllerSnapshot {
        self.controller_snapshot_for(voice.velocity, voice.midi_note)
    }

    /// Same as [`Self::controller_snapshot_for_voice`], but for a note
    /// that hasn't become a `Voice` yet -- the voice builder calls this
    /// with the incoming `(velocity, midiNote)` pair at birth, before any
    /// `Voice` exists to borrow fields from.
    pub fn controller_snapshot_for(&self, velocity: u8, midi_note: u8) -> ControllerSnapshot {
        let mut cc = [0u8; 128];
        for (i, slot) in cc.iter_mut().enumerate() {
            *slot = self.raw_cc(i as u8);
        }
        ControllerSnapshot {
            cc,
            note_on_velocity: velocity,
            note_on_key: midi_note,
            channel_pressure: (self.controllers[IDX_CHANNEL_PRESSURE] >> 7) as u8,
            poly_pressure: 0,
            pitch_wheel: self.controllers[IDX_PITCH_WHEEL],
            pitch_wheel_range_semitones: (self.controllers[IDX_PITCH_WHEEL_RANGE] >> 7) as u8,
        }
    }

    /// Recomputes `modulatedGenerators` for every currently-live voice
    /// (both sounding and sustained) against the channel's current
    /// controller state. Called after any controller change and after
    /// an exclusive-class forced release.
    pub fn recompute_all_modulators(&mut self) {
        for voice in self.voices.iter_mut().chain(self.sustained_voices.iter_mut()) {
            let snapshot = Self::snapshot_for(&self.controllers, voice);
            voice.modulated_generators = compute_modulators(&voice.generators, &voice.modulators, &snapshot);
        }
    }

    /// Free-standing twin of [`Self::controller_snapshot_for_voice`] that
    /// borrows only the raw table, so it can run inside a loop that's
    /// already holding `&mut self.voices`.
    fn snapshot_for(controllers: &[u16; CONTROLLER_TABLE_SIZE], voice: &Voice) -> ControllerSnapshot {
        let mut cc = [0u8; 128];
        for (i, slot) in cc.iter_mut().enumerate() {
            *slot = (controllers[i] >> 7) as u8;
        }
        ControllerSnapshot {
            cc,
            note_on_velocity: voice.velocity,
            note_on_key: voice.midi_note,
            channel_pressure: (controllers[IDX_CHANNEL_PRESSURE] >> 7) as u8,
            poly_pressure: 0,
            pitch_wheel: controllers[IDX_PITCH_WHEEL],
            pitch_wheel_range_semitones: (controllers[IDX_PITCH_WHEEL_RANGE] >> 7) as u8,
        }
    }

    /// `noteOn(voices[])`: exclusive-class cutoff, then append. Voice-cap
    /// enforcement is global (across channels), so the processor runs
    /// that step itself after this returns.
    pub fn note_on(&mut self, new_voices: Vec<Voice>, now: f64) {
        for incoming in &new_voices {
            if incoming.exclusive_class != 0 {
                let class = incoming.exclusive_class;
                let channel_index = incoming.channel_index;
                for voice in self.voices.iter_mut().chain(self.sustained_voices.iter_mut()) {
                    if voice.exclusive_class == class && !voice.is_in_release {
                        log::debug!(
                            "exclusive-class cutoff: channel={channel_index} class={class} note={}",
                            voice.midi_note
                        );
                        voice.force_release(-7200, now);
                        let snapshot = Self::snapshot_for(&self.controllers, voice);
                        voice.modulated_generators =
                            compute_modulators(&voice.generators, &voice.modulators, &snapshot);
                    }
                }
            }
        }
        log::debug!("voice birth: channel={} count={}", new_voices.first().map(|v| v.channel_index).unwrap_or(0), new_voices.len());
        self.voices.extend(new_voices);
    }

    /// `noteOff(note)`: releases matching voices, or parks them on the
    /// sustain list if the hold pedal is down.
    pub fn note_off(&mut self, midi_note: u8, now: f64) {
        let channel_index = self.channel_index_hint();
        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].matches_note(channel_index, midi_note) {
                if self.hold_pedal {
                    let voice = self.voices.remove(i);
                    self.sustained_voices.push(voice);
                    continue;
                } else {
                    let effective_now = enforce_min_note_length(&self.voices[i], now);
                    self.voices[i].begin_release(effective_now);
                }
            }
            i += 1;
        }
    }

    /// `killNote(note)`: near-instant forced release, bypassing the hold
    /// pedal entirely.
    pub fn kill_note(&mut self, midi_note: u8, now: f64) {
        let channel_index = self.channel_index_hint();
        for voice in self.voices.iter_mut() {
            if voice.matches_note(channel_index, midi_note) {
                let effective_now = enforce_min_note_length(voice, now);
                voice.force_release(-12000, effective_now);
            }
        }
    }

    /// Any live voice carries its channel index; falls back to 0 for an
    /// empty channel (note-off/kill-note on an empty channel is a no-op
    /// regardless).
    fn channel_index_hint(&self) -> u8 {
        self.voices.first().or(self.sustained_voices.first()).map(|v| v.channel_index).unwrap_or(0)
    }

    /// `ccChange([index, value])`. `index < NON_CC_INDEX_OFFSET` is a
    /// standard 7-bit CC (`value` is the raw 0..127 CC value); beyond
    /// that it addresses the non-CC tail (pitch wheel is already a
    /// 14-bit value, the rest are 7-bit values in the same convention as
    /// standard CCs). `now` is only consulted when this crosses the
    /// sustain-pedal (CC 64) threshold, to stamp the resulting releases.
    pub fn cc_change(&mut self, index: usize, value: u16, now: f64) {
        if index >= CONTROLLER_TABLE_SIZE {
            log::warn!("ccChange: controller index {index} out of range, discarding");
            return;
        }

        let stored = if index == IDX_PITCH_WHEEL {
            value
        } else {
            (value.min(127)) << 7
        };
        self.controllers[index] = stored;

        if index == CC_SUSTAIN {
            let new_hold = value >= 64;
            if self.hold_pedal && !new_hold {
                for mut voice in self.sustained_voices.drain(..).collect::<Vec<_>>() {
                    let effective_now = enforce_min_note_length(&voice, now);
                    voice.begin_release(effective_now);
                    self.voices.push(voice);
                }
            }
            self.hold_pedal = new_hold;
        }

        self.recompute_all_modulators();
    }

    /// `ccReset(excluded[])`: back to MIDI power-on defaults, preserving
    /// `channelTranspose` and any explicitly excluded indices.
    pub fn cc_reset(&mut self, excluded: &[usize]) {
        let transpose = self.controllers[IDX_CHANNEL_TRANSPOSE];
        let defaults = default_controllers();
        for i in 0..CONTROLLER_TABLE_SIZE {
            if i == IDX_CHANNEL_TRANSPOSE || excluded.contains(&i) {
                continue;
            }
            self.controllers[i] = defaults[i];
        }
        self.controllers[IDX_CHANNEL_TRANSPOSE] = transpose;
        self.hold_pedal = false;
        self.channel_vibrato = ChannelVibrato::NONE;
        self.recompute_all_modulators();
    }

    pub fn set_channel_vibrato(&mut self, vibrato: ChannelVibrato) {
        self.channel_vibrato = vibrato;
    }

    /// `stopAll(mode)`: `DropImmediately` discards every voice outright;
    /// `ReleaseAll` begins release on everything not already releasing.
    pub fn stop_all(&mut self, mode: crate::events::StopMode, now: f64) {
        match mode {
            crate::events::StopMode::DropImmediately => {
                self.voices.clear();
                self.sustained_voices.clear();
            }
            crate::events::StopMode::ReleaseAll => {
                for voice in self.voices.iter_mut().chain(self.sustained_voices.iter_mut()) {
                    if !voice.is_in_release {
                        let effective_now = enforce_min_note_length(voice, now);
                        voice.begin_release(effective_now);
                    }
                }
            }
        }
    }

    pub fn mute(&mut self, muted: bool) {
        self.is_muted = muted;
    }

    /// Drops every finished voice, keeping the rest in relative order.
    pub fn retain_unfinished(&mut self) {
        self.voices.retain(|v| !v.finished);
        self.sustained_voices.retain(|v| !v.finished);
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}
