//! sfcore - Realtime SoundFont2/3 Voice Synthesis Core
//!
//! A sample-accurate, realtime-safe synthesis core implementing the
//! SoundFont2/3 generator/modulator model: wavetable playback, the
//! biquad resonant lowpass filter, DAHDSR volume and modulation
//! envelopes, triangle LFOs, equal-power panning with effects sends, and
//! a multi-channel voice manager with stealing, hold-pedal sustain, and
//! exclusive-class cutoff.
//!
//! # Architecture
//!
//! - [`units`] / [`generator`] / [`modulator`] / [`types`] — the
//!   SoundFont unit conversions and generator/modulator data model.
//! - [`oscillator`] / [`envelope`] / [`lfo`] / [`filter`] / [`panner`] —
//!   the per-voice DSP building blocks.
//! - [`voice`] — the per-note synthesis entity combining all of the above.
//! - [`voice_builder`] — turns a preset lookup into live [`voice::Voice`]s.
//! - [`sample_store`] — the async sample-dump/rehome hand-off.
//! - [`channel`] — per-channel controller state and voice lifecycle.
//! - [`processor`] — the top-level block renderer and event-queue drain.
//! - [`events`] / [`errors`] — the control-plane wire types and the
//!   handful of truly-fallible, non-hot-path operations.
//!
//! This crate never parses `.sf2`/`.sf3`/Vorbis bytes itself -- it
//! consumes [`types::Sample`], [`types::Preset`], [`generator::Generators`]
//! and [`modulator::Modulator`] records from whatever loads the font file.

pub mod channel;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod filter;
pub mod generator;
pub mod lfo;
pub mod modulator;
pub mod oscillator;
pub mod panner;
pub mod processor;
pub mod sample_store;
pub mod types;
pub mod units;
pub mod voice;
pub mod voice_builder;

pub use channel::Channel;
pub use errors::CoreError;
pub use events::{InboundEvent, OutboundEvent, StopMode};
pub use generator::{GeneratorId, Generators};
pub use modulator::{ControllerSnapshot, Modulator};
pub use processor::Processor;
pub use types::{Preset, Sample, VoiceSpec};
pub use voice::Voice;
