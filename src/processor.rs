//! Processor Module
//!
//! The top-level block renderer: owns every channel, the shared sample
//! store, and the inbound/outbound control-plane queues, and turns one
//! `process()` call per audio block into a drain of pending events
//! followed by a render pass over every live voice.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::channel::Channel;
use crate::errors::CoreError;
use crate::events::{AckKind, InboundEvent, OutboundEvent};
use crate::generator::GeneratorId;
use crate::sample_store::{rehome_cursor, SampleStore};
use crate::types::Preset;
use crate::units::CentibelGainTable;
use crate::voice::Voice;
use crate::voice_builder;

/// Fixed channel arena size; `addChannel` beyond this is a [`CoreError`].
pub const MAX_CHANNELS: usize = 16;

/// Largest block size [`Processor::new`] accepts.
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Global live-voice ceiling (summed across every channel). A `noteOn`
/// that pushes the total over this triggers voice stealing within the
/// same event-handling step.
pub const VOICE_CAP: usize = 400;

/// Depth of the bounded inbound/outbound control-plane queues.
const EVENT_QUEUE_DEPTH: usize = 1024;

/// Owns the full channel arena and drives block-at-a-time synthesis.
pub struct Processor {
    channels: Vec<Channel>,
    sample_store: SampleStore,
    output_rate: f32,
    block_size: usize,
    gain_table: CentibelGainTable,
    scratch: Vec<f32>,
    inbound_tx: Sender<InboundEvent>,
    inbound_rx: Receiver<InboundEvent>,
    outbound_tx: Sender<OutboundEvent>,
    outbound_rx: Receiver<OutboundEvent>,
    last_voice_counts: Vec<usize>,
}

impl Processor {
    /// Builds a processor with one initial channel. `block_size` bounds
    /// the largest block [`Self::process`] will be asked to render.
    pub fn new(output_rate: f32, block_size: usize) -> Result<Self, CoreError> {
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(CoreError::InvalidBlockSize {
                size: block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        let (inbound_tx, inbound_rx) = bounded(EVENT_QUEUE_DEPTH);
        let (outbound_tx, outbound_rx) = bounded(EVENT_QUEUE_DEPTH);
        Ok(Self {
            channels: vec![Channel::new()],
            sample_store: SampleStore::new(),
            output_rate,
            block_size,
            gain_table: CentibelGainTable::new(),
            scratch: vec![0.0; block_size],
            inbound_tx,
            inbound_rx,
            outbound_tx,
            outbound_rx,
            last_voice_counts: vec![0],
        })
    }

    /// A clonable handle the host posts [`InboundEvent`]s through, from
    /// outside the audio callback.
    pub fn inbound_sender(&self) -> Sender<InboundEvent> {
        self.inbound_tx.clone()
    }

    /// A clonable handle the host drains [`OutboundEvent`]s from.
    pub fn outbound_receiver(&self) -> Receiver<OutboundEvent> {
        self.outbound_rx.clone()
    }

    pub fn output_rate(&self) -> f32 {
        self.output_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Registers a freshly-initialized channel, failing once the fixed
    /// arena is full.
    pub fn add_channel(&mut self) -> Result<u8, CoreError> {
        if self.channels.len() >= MAX_CHANNELS {
            return Err(CoreError::ChannelCapExceeded { max: MAX_CHANNELS });
        }
        self.channels.push(Channel::new());
        Ok((self.channels.len() - 1) as u8)
    }

    /// Host-facing voice construction: resolves (and caches) the voices a
    /// `(channelIndex, midiNote, velocity)` note-on yields from `preset`,
    /// posting a `SampleRequested` outbound event for every sample the
    /// lookup referenced but the store doesn't have yet. Called outside
    /// the inbound event queue, since it needs a `Preset` the queue
    /// itself never carries.
    pub fn build_voices(
        &mut self,
        channel_index: u8,
        midi_note: u8,
        velocity: u8,
        preset: &dyn Preset,
        now: f64,
    ) -> Vec<Voice> {
        let Some(channel) = self.channels.get_mut(channel_index as usize) else {
            log::warn!("build_voices: channel {channel_index} out of range");
            return Vec::new();
        };
        let mut pending = Vec::new();
        let voices = voice_builder::build_voices(
            &mut channel.voice_cache,
            preset,
            channel_index,
            midi_note,
            velocity,
            now,
            self.output_rate,
            &self.sample_store,
            |vel, key| channel.controller_snapshot_for(vel, key),
            &mut pending,
        );
        for sample_id in pending {
            if self.outbound_tx.try_send(OutboundEvent::SampleRequested(sample_id)).is_err() {
                log::warn!("outbound queue full, dropping sample request for {sample_id}");
            }
        }
        voices
    }

    /// Renders one block: drains every pending inbound event, then
    /// renders each channel's live voices into the six output planes.
    /// All six output slices must have equal length, capped at the
    /// processor's configured block size; any fewer frames than handed
    /// in are simply not written.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &mut self,
        now: f64,
        main_left: &mut [f32],
        main_right: &mut [f32],
        reverb_left: &mut [f32],
        reverb_right: &mut [f32],
        chorus_left: &mut [f32],
        chorus_right: &mut [f32],
    ) {
        let block_len = [
            main_left.len(),
            main_right.len(),
            reverb_left.len(),
            reverb_right.len(),
            chorus_left.len(),
            chorus_right.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
        .min(self.block_size);

        main_left[..block_len].fill(0.0);
        main_right[..block_len].fill(0.0);
        reverb_left[..block_len].fill(0.0);
        reverb_right[..block_len].fill(0.0);
        chorus_left[..block_len].fill(0.0);
        chorus_right[..block_len].fill(0.0);

        self.drain_inbound_events(now);

        for channel in self.channels.iter_mut() {
            if channel.is_muted || channel.live_voice_count() == 0 {
                continue;
            }
            for voice in channel.voices.iter_mut().chain(channel.sustained_voices.iter_mut()) {
                let sample_data = self.sample_store.get(voice.sample_id).map(|f| f.as_slice());
                voice.render_block(
                    sample_data,
                    &self.gain_table,
                    self.output_rate,
                    now,
                    block_len,
                    &channel.channel_vibrato,
                    &mut self.scratch,
                    main_left,
                    main_right,
                    reverb_left,
                    reverb_right,
                    chorus_left,
                    chorus_right,
                );
            }
            channel.retain_unfinished();
        }

        let counts: Vec<usize> = self.channels.iter().map(|c| c.live_voice_count()).collect();
        if counts != self.last_voice_counts {
            if self.outbound_tx.try_send(OutboundEvent::VoiceCounts(counts.clone())).is_err() {
                log::warn!("outbound queue full, dropping voice-count update");
            }
            self.last_voice_counts = counts;
        }
    }

    fn drain_inbound_events(&mut self, now: f64) {
        while let Ok(event) = self.inbound_rx.try_recv() {
            self.handle_event(event, now);
        }
    }

    fn handle_event(&mut self, event: InboundEvent, now: f64) {
        match event {
            InboundEvent::NoteOn { channel_index, voices } => {
                let Some(channel) = self.channels.get_mut(channel_index as usize) else {
                    log::warn!("noteOn: channel {channel_index} out of range");
                    return;
                };
                channel.note_on(voices, now);
                self.enforce_voice_cap();
            }
            InboundEvent::NoteOff { channel_index, midi_note } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.note_off(midi_note, now);
                } else {
                    log::warn!("noteOff: channel {channel_index} out of range");
                }
            }
            InboundEvent::KillNote { channel_index, midi_note } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.kill_note(midi_note, now);
                } else {
                    log::warn!("killNote: channel {channel_index} out of range");
                }
            }
            InboundEvent::CcChange { channel_index, index, value } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.cc_change(index, value, now);
                } else {
                    log::warn!("ccChange: channel {channel_index} out of range");
                }
            }
            InboundEvent::CcReset { channel_index, excluded } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.cc_reset(&excluded);
                } else {
                    log::warn!("ccReset: channel {channel_index} out of range");
                }
            }
            InboundEvent::SetChannelVibrato { channel_index, vibrato } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.set_channel_vibrato(vibrato);
                } else {
                    log::warn!("setChannelVibrato: channel {channel_index} out of range");
                }
            }
            InboundEvent::SampleDump { sample_id, frames } => {
                self.sample_store.dump(sample_id, frames);
                self.rehome_voices_for(sample_id, now);
            }
            InboundEvent::ClearCache => {
                self.sample_store.clear();
            }
            InboundEvent::StopAll { channel_index, mode } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.stop_all(mode, now);
                    let ack = OutboundEvent::Ack(AckKind::StoppedAll { channel_index });
                    if self.outbound_tx.try_send(ack).is_err() {
                        log::warn!("outbound queue full, dropping stopAll ack");
                    }
                } else {
                    log::warn!("stopAll: channel {channel_index} out of range");
                }
            }
            InboundEvent::KillNotes { count } => {
                let stolen = steal_voices(&mut self.channels, count);
                log::debug!("killNotes: requested={count} stole={stolen}");
            }
            InboundEvent::MuteChannel { channel_index, muted } => {
                if let Some(channel) = self.channels.get_mut(channel_index as usize) {
                    channel.mute(muted);
                } else {
                    log::warn!("muteChannel: channel {channel_index} out of range");
                }
            }
            InboundEvent::AddChannel => match self.add_channel() {
                Ok(channel_index) => {
                    let ack = OutboundEvent::Ack(AckKind::ChannelAdded { channel_index });
                    if self.outbound_tx.try_send(ack).is_err() {
                        log::warn!("outbound queue full, dropping addChannel ack");
                    }
                }
                Err(err) => log::warn!("addChannel failed: {err}"),
            },
        }
    }

    /// Steals globally down to [`VOICE_CAP`] if a `noteOn` just pushed the
    /// total live count over it.
    fn enforce_voice_cap(&mut self) {
        let total: usize = self.channels.iter().map(Channel::live_voice_count).sum();
        if total > VOICE_CAP {
            let excess = total - VOICE_CAP;
            let stolen = steal_voices(&mut self.channels, excess);
            log::debug!("voice cap exceeded: total={total} cap={VOICE_CAP} stole={stolen}");
        }
    }

    /// After a sample's frames arrive, rehomes every live voice across
    /// every channel that referenced it, so its cursor lands where it
    /// would have been had the sample been present since the voice's
    /// birth.
    fn rehome_voices_for(&mut self, sample_id: u64, now: f64) {
        let Some(frames) = self.sample_store.get(sample_id) else {
            return;
        };
        let frame_count = frames.len();
        for channel in self.channels.iter_mut() {
            for voice in channel.voices.iter_mut().chain(channel.sustained_voices.iter_mut()) {
                if voice.sample_id != sample_id {
                    continue;
                }
                let result = rehome_cursor(
                    frame_count,
                    voice.generators.get(GeneratorId::EndAddrsOffset) as i32,
                    voice.generators.get(GeneratorId::EndAddrsCoarseOffset) as i32,
                    voice.playback_step,
                    self.output_rate,
                    voice.start_time,
                    now,
                    voice.looping_mode != crate::oscillator::LoopMode::None,
                    voice.loop_start,
                    voice.loop_end,
                );
                voice.end = result.end;
                voice.cursor = result.cursor;
                if result.finished {
                    voice.finished = true;
                }
            }
        }
    }
}

/// Steals up to `n` voices globally, lowest-velocity first, by removing
/// them outright (not a release -- a stolen voice never sounds again).
/// Only sounding, not-yet-releasing voices are eligible. Returns how many
/// were actually stolen (`min(n, eligible voice count)`).
fn steal_voices(channels: &mut [Channel], n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut candidates: Vec<(usize, usize, u8)> = Vec::new();
    for (channel_idx, channel) in channels.iter().enumerate() {
        for (voice_idx, voice) in channel.voices.iter().enumerate() {
            if !voice.is_in_release {
                candidates.push((channel_idx, voice_idx, voice.velocity));
            }
        }
    }
    candidates.sort_by_key(|&(_, _, velocity)| velocity);
    let to_steal = candidates.into_iter().take(n);

    let mut by_channel: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    let mut stolen = 0;
    for (channel_idx, voice_idx, _) in to_steal {
        by_channel.entry(channel_idx).or_default().push(voice_idx);
        stolen += 1;
    }
    for (channel_idx, mut voice_indices) in by_channel {
        voice_indices.sort_unstable_by(|a, b| b.cmp(a));
        for voice_idx in voice_indices {
            channels[channel_idx].voices.remove(voice_idx);
        }
    }
    stolen
}
