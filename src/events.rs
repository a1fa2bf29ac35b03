//! Events Module
//!
//! The tagged unions carried on the inbound/outbound control-plane
//! queues (see [`crate::processor`]). Fields mirror the event table in
//! the channel manager design one-for-one; nothing here is synthesized
//! or interpreted, it's just the wire shape.

use crate::lfo::ChannelVibrato;
use crate::voice::Voice;

/// What happens to a channel's voices on `stopAll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Drop every voice on the channel immediately, no fade.
    DropImmediately,
    /// Release every voice that hasn't already started releasing.
    ReleaseAll,
}

/// One control-plane event, posted by the host from outside the audio
/// callback and drained at the start of the next [`crate::processor::Processor::process`] call.
///
/// `NoteOn` deliberately carries already-built [`Voice`]s rather than a
/// `(note, velocity)` pair: building a voice needs a `Preset` lookup and
/// the sample store, both of which the host drives explicitly through
/// [`crate::processor::Processor::build_voices`] before constructing this event.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    NoteOn {
        channel_index: u8,
        voices: Vec<Voice>,
    },
    NoteOff {
        channel_index: u8,
        midi_note: u8,
    },
    KillNote {
        channel_index: u8,
        midi_note: u8,
    },
    /// `index` addresses the channel's controller table directly: `0..128`
    /// are standard 7-bit MIDI CCs (value shifted into the table's 14-bit
    /// convention internally); `>= NON_CC_INDEX_OFFSET` address the
    /// non-CC tail (pitch wheel, pitch wheel range, channel pressure,
    /// channel tuning/transpose).
    CcChange {
        channel_index: u8,
        index: usize,
        value: u16,
    },
    CcReset {
        channel_index: u8,
        excluded: Vec<usize>,
    },
    SetChannelVibrato {
        channel_index: u8,
        vibrato: ChannelVibrato,
    },
    SampleDump {
        sample_id: u64,
        frames: Vec<f32>,
    },
    ClearCache,
    StopAll {
        channel_index: u8,
        mode: StopMode,
    },
    /// Steal exactly `count` voices, lowest-velocity first, across every
    /// channel.
    KillNotes {
        count: usize,
    },
    MuteChannel {
        channel_index: u8,
        muted: bool,
    },
    AddChannel,
}

/// Acknowledgement payloads that may follow `addChannel`/`stopAll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    ChannelAdded { channel_index: u8 },
    StoppedAll { channel_index: u8 },
}

/// Events the processor posts back to the host: voice-count updates and
/// acknowledgements, plus a request to dump a sample that a just-built
/// voice referenced but the store didn't have yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Live voice count per channel, emitted only when it changed since
    /// the last block.
    VoiceCounts(Vec<usize>),
    SampleRequested(u64),
    Ack(AckKind),
}
