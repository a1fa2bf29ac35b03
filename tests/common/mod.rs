// Test utilities shared across the integration test suite.

use sfcore::generator::{GeneratorId, Generators};
use sfcore::modulator::Modulator;
use sfcore::types::{Preset, Sample, VoiceSpec};

/// Calculates the Root Mean Square (RMS) of a signal.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|&s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Calculates the peak absolute value of a signal.
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|&s| s.abs()).fold(0.0, f32::max)
}

/// Checks that every sample is finite (not NaN or infinity).
pub fn assert_samples_are_finite(samples: &[f32]) {
    for (i, &sample) in samples.iter().enumerate() {
        assert!(sample.is_finite(), "sample {i} is not finite: {sample}");
    }
}

/// Asserts that two floating point values are approximately equal.
pub fn assert_approx_eq(actual: f32, expected: f32, epsilon: f32) {
    assert!(
        (actual - expected).abs() <= epsilon,
        "values not approximately equal: actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}

/// A sine-wave sample loop: `loop_start`..`loop_end` forms one exact
/// period so a continuous-looping voice produces a steady tone with no
/// audible seam, which keeps filter/oscillator assertions simple.
pub fn sine_sample(sample_id: u64, sample_rate: f32, frequency: f32, frame_count: usize) -> Sample {
    let data: Vec<f32> = (0..frame_count)
        .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
        .collect();
    Sample {
        sample_id,
        sample_rate,
        root_pitch: 60,
        pitch_correction_cents: 0.0,
        loop_start_frames: 0,
        loop_end_frames: frame_count as u32,
        is_compressed: false,
        data: Some(data),
    }
}

/// A single-zone preset with no generator overrides beyond what the
/// caller supplies -- good enough to drive [`sfcore::voice_builder::build_voices`]
/// or a full [`sfcore::Processor`] in isolation.
pub struct SingleZonePreset {
    pub sample: Sample,
    pub preset_generators: Generators,
    pub instrument_generators: Generators,
    pub modulators: Vec<Modulator>,
}

impl SingleZonePreset {
    pub fn new(sample: Sample) -> Self {
        Self {
            sample,
            // The preset layer is a pure zero-offset (no preset-level
            // overrides); the instrument layer carries the SoundFont2
            // nominal defaults a real parser folds into an unset zone
            // before `combine()` ever sees it -- otherwise every
            // non-overridden generator (filter cutoff, envelope timing)
            // would clamp to its range floor instead of behaving as if
            // unset.
            preset_generators: Generators::zeroed(),
            instrument_generators: Generators::defaults(),
            modulators: vec![Modulator::default_velocity_to_attenuation()],
        }
    }

    /// Sets an instrument-layer generator, the usual place a zone's
    /// per-sample parameters (loop offsets, envelope timing, exclusive
    /// class) live.
    pub fn with_instrument_gen(mut self, id: GeneratorId, value: i16) -> Self {
        self.instrument_generators.set(id, value);
        self
    }
}

impl Preset for SingleZonePreset {
    fn lookup(&self, _midi_note: u8, _velocity: u8) -> Vec<VoiceSpec> {
        vec![VoiceSpec {
            sample: self.sample.clone(),
            preset_generators: self.preset_generators,
            instrument_generators: self.instrument_generators,
            modulators: self.modulators.clone(),
        }]
    }
}
