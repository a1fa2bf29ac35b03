//! Modulator Module
//!
//! A SoundFont "modulator" is a tiny routing rule: read a source controller
//! (and optionally scale it by a second "amount source" controller), pass
//! the result through a transform curve, multiply by a fixed amount, and
//! add the result into one generator slot. A voice carries a list of these
//! and recomputes its *modulated* generator vector from them whenever the
//! controller snapshot it reads from changes.
//!
//! # Architecture
//!
//! - [`ModulatorSource`] — where a modulator reads its raw controller value
//! - [`ModulatorTransform`] — the curve applied to a source value
//! - [`Modulator`] — one `{source, amountSource, destination, amount, transform}` rule
//! - [`ControllerSnapshot`] — the per-channel values modulators read from
//! - [`compute_modulators`] — folds a voice's modulator list into a generator vector

use crate::generator::{GeneratorId, Generators};

/// Where a modulator reads its raw (unscaled) value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulatorSource {
    /// A 7-bit MIDI continuous controller, by CC number.
    Cc(u8),
    /// Note-on velocity, 0..127.
    NoteOnVelocity,
    /// Note-on velocity, inverted (`127 - velocity`) -- the SoundFont2
    /// "negative polarity" reading the default velocity→attenuation
    /// modulator uses, so a soft strike reads as a large source value.
    NoteOnVelocityInverted,
    /// Note-on key number, 0..127.
    NoteOnKey,
    /// Channel (monophonic) pressure, 0..127.
    ChannelPressure,
    /// Polyphonic key pressure, 0..127.
    PolyPressure,
    /// 14-bit pitch wheel position, centered at 8192.
    PitchWheel,
    /// Pitch wheel sensitivity range, in semitones.
    PitchWheelRange,
    /// A constant source that always reads as fully on; used for
    /// default modulators that should always contribute their amount.
    NoController,
}

/// Curve applied to a source's normalized `[0, 1]` (or `[-1, 1]` for
/// bipolar sources) reading before it is multiplied by a modulator's
/// amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulatorTransform {
    /// Output equals input.
    Linear,
    /// Output is input squared, sign-preserving for bipolar sources.
    Concave,
    /// `1 - (1 - input)^2`, sign-preserving for bipolar sources.
    Convex,
    /// Output is 0 below the midpoint, 1 (or -1) above it.
    Switch,
}

impl ModulatorTransform {
    fn apply(self, x: f32) -> f32 {
        match self {
            ModulatorTransform::Linear => x,
            ModulatorTransform::Concave => x.signum() * x.abs() * x.abs(),
            ModulatorTransform::Convex => {
                let mag = 1.0 - (1.0 - x.abs()).powi(2);
                x.signum() * mag
            }
            ModulatorTransform::Switch => {
                if x.abs() < 0.5 {
                    0.0
                } else {
                    x.signum()
                }
            }
        }
    }
}

/// A single `{source, amountSource, destinationGenerator, amount,
/// transform}` modulator rule, as carried on a voice's modulator list.
#[derive(Debug, Clone, Copy)]
pub struct Modulator {
    pub source: ModulatorSource,
    pub amount_source: ModulatorSource,
    pub destination: GeneratorId,
    pub amount: i16,
    pub transform: ModulatorTransform,
}

impl Modulator {
    pub fn new(
        source: ModulatorSource,
        amount_source: ModulatorSource,
        destination: GeneratorId,
        amount: i16,
        transform: ModulatorTransform,
    ) -> Self {
        Self {
            source,
            amount_source,
            destination,
            amount,
            transform,
        }
    }

    /// The default velocity-to-initial-attenuation modulator every
    /// SoundFont voice carries unless a preset/instrument overrides it:
    /// louder strikes attenuate less, via a concave curve on
    /// `127 - velocity`.
    pub fn default_velocity_to_attenuation() -> Self {
        Modulator::new(
            ModulatorSource::NoteOnVelocityInverted,
            ModulatorSource::NoController,
            GeneratorId::InitialAttenuation,
            960,
            ModulatorTransform::Concave,
        )
    }

    /// The default modulation-wheel-to-vibrato-LFO-depth modulator.
    pub fn default_modwheel_to_vib_lfo() -> Self {
        Modulator::new(
            ModulatorSource::Cc(1),
            ModulatorSource::NoController,
            GeneratorId::VibLfoToPitch,
            50,
            ModulatorTransform::Linear,
        )
    }

    /// The default channel-pressure-to-vibrato-LFO-depth modulator.
    pub fn default_channel_pressure_to_vib_lfo() -> Self {
        Modulator::new(
            ModulatorSource::ChannelPressure,
            ModulatorSource::NoController,
            GeneratorId::VibLfoToPitch,
            50,
            ModulatorTransform::Linear,
        )
    }

    /// Evaluates this modulator against a controller snapshot, returning
    /// its contribution to [`GeneratorId::destination`](Modulator::destination).
    fn evaluate(&self, controllers: &ControllerSnapshot) -> f32 {
        let source_value = controllers.read_normalized(self.source);
        let amount_value = controllers.read_normalized(self.amount_source);
        self.transform.apply(source_value) * amount_value * self.amount as f32
    }
}

/// The subset of a channel's controller state modulators can read from.
///
/// Deliberately narrow: a modulator never reads anything beyond what the
/// SoundFont2 source enumeration names, so this is not simply "the whole
/// channel".
#[derive(Debug, Clone, Copy)]
pub struct ControllerSnapshot {
    /// Raw 7-bit CC values, indexed by CC number (0..127).
    pub cc: [u8; 128],
    pub note_on_velocity: u8,
    pub note_on_key: u8,
    pub channel_pressure: u8,
    pub poly_pressure: u8,
    /// 14-bit, centered at 8192.
    pub pitch_wheel: u16,
    pub pitch_wheel_range_semitones: u8,
}

impl ControllerSnapshot {
    /// A snapshot with every controller at its MIDI power-on default.
    pub fn defaults() -> Self {
        Self {
            cc: [0u8; 128],
            note_on_velocity: 0,
            note_on_key: 0,
            channel_pressure: 0,
            poly_pressure: 0,
            pitch_wheel: 8192,
            pitch_wheel_range_semitones: 2,
        }
    }

    /// Reads a source, normalized to `[0, 1]` for unipolar sources
    /// (velocity, pressure, CCs) or `[-1, 1]` for the bipolar pitch
    /// wheel. Unknown/unsupported sources read as `0`.
    fn read_normalized(&self, source: ModulatorSource) -> f32 {
        match source {
            ModulatorSource::Cc(cc) => self.cc[cc as usize] as f32 / 127.0,
            ModulatorSource::NoteOnVelocity => self.note_on_velocity as f32 / 127.0,
            ModulatorSource::NoteOnVelocityInverted => (127 - self.note_on_velocity) as f32 / 127.0,
            ModulatorSource::NoteOnKey => self.note_on_key as f32 / 127.0,
            ModulatorSource::ChannelPressure => self.channel_pressure as f32 / 127.0,
            ModulatorSource::PolyPressure => self.poly_pressure as f32 / 127.0,
            ModulatorSource::PitchWheel => (self.pitch_wheel as f32 - 8192.0) / 8192.0,
            ModulatorSource::PitchWheelRange => self.pitch_wheel_range_semitones as f32 / 24.0,
            ModulatorSource::NoController => 1.0,
        }
    }
}

/// Rebuilds a voice's modulated generator vector: starts from `generators`
/// and, for every modulator in `modulators`, adds
/// `transform(source) · amountSource · amount` into its destination slot,
/// clamped to that slot's valid range.
///
/// Must be re-run on voice birth, on any controller change affecting the
/// voice's channel, and after an exclusive-class forced release.
pub fn compute_modulators(
    generators: &Generators,
    modulators: &[Modulator],
    controllers: &ControllerSnapshot,
) -> Generators {
    let mut out = *generators;
    for modulator in modulators {
        let contribution = modulator.evaluate(controllers);
        let (min, max) = modulator.destination.range();
        let current = out.get(modulator.destination) as f32;
        let combined = (current + contribution).clamp(min as f32, max as f32);
        out.set(modulator.destination, combined as i16);
    }
    out
}
