//! End-to-end [`sfcore::Processor`] benchmarks.
//!
//! Block rendering cost scales with the live voice count, which is the
//! number that actually matters to a host deciding how many notes it can
//! afford per callback; these benches sweep it alongside block size.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sfcore::events::InboundEvent;
use sfcore::generator::Generators;
use sfcore::modulator::Modulator;
use sfcore::processor::Processor;
use sfcore::types::{Preset, Sample, VoiceSpec};

const OUTPUT_RATE: f32 = 48000.0;
const SAMPLE_ID: u64 = 1;

struct SingleZonePreset {
    sample: Sample,
}

impl Preset for SingleZonePreset {
    fn lookup(&self, _midi_note: u8, _velocity: u8) -> Vec<VoiceSpec> {
        vec![VoiceSpec {
            sample: self.sample.clone(),
            preset_generators: Generators::zeroed(),
            instrument_generators: Generators::zeroed(),
            modulators: vec![Modulator::default_velocity_to_attenuation()],
        }]
    }
}

fn looping_sample(frames: usize) -> Sample {
    let data: Vec<f32> = (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
        .collect();
    Sample {
        sample_id: SAMPLE_ID,
        sample_rate: 44100.0,
        root_pitch: 60,
        pitch_correction_cents: 0.0,
        loop_start_frames: 0,
        loop_end_frames: frames as u32,
        is_compressed: false,
        data: Some(data),
    }
}

/// Builds a processor with `voice_count` sounding voices spread across
/// one channel, ready for repeated `process()` calls.
fn processor_with_voices(voice_count: usize, block_size: usize) -> Processor {
    let sample = looping_sample(4096);
    let preset = SingleZonePreset { sample: sample.clone() };
    let mut processor = Processor::new(OUTPUT_RATE, block_size).unwrap();
    processor
        .inbound_sender()
        .try_send(InboundEvent::SampleDump {
            sample_id: SAMPLE_ID,
            frames: sample.data.unwrap(),
        })
        .unwrap();

    for i in 0..voice_count {
        let note = 30 + (i % 90) as u8;
        let voices = processor.build_voices(0, note, 100, &preset, i as f64 * 1e-6);
        processor
            .inbound_sender()
            .try_send(InboundEvent::NoteOn { channel_index: 0, voices })
            .unwrap();
    }

    let mut main_l = vec![0.0f32; block_size];
    let mut main_r = vec![0.0f32; block_size];
    let mut rev_l = vec![0.0f32; block_size];
    let mut rev_r = vec![0.0f32; block_size];
    let mut cho_l = vec![0.0f32; block_size];
    let mut cho_r = vec![0.0f32; block_size];
    processor.process(0.0, &mut main_l, &mut main_r, &mut rev_l, &mut rev_r, &mut cho_l, &mut cho_r);
    processor
}

fn bench_process_voice_counts(c: &mut Criterion) {
    let block_size = 512;
    let mut group = c.benchmark_group("processor_process_by_voice_count");
    for &voice_count in &[1usize, 16, 64, 256] {
        let mut processor = processor_with_voices(voice_count, block_size);
        let mut main_l = vec![0.0f32; block_size];
        let mut main_r = vec![0.0f32; block_size];
        let mut rev_l = vec![0.0f32; block_size];
        let mut rev_r = vec![0.0f32; block_size];
        let mut cho_l = vec![0.0f32; block_size];
        let mut cho_r = vec![0.0f32; block_size];
        let mut now = 1.0;

        group.bench_function(format!("{voice_count}_voices"), |b| {
            b.iter(|| {
                processor.process(
                    black_box(now),
                    &mut main_l,
                    &mut main_r,
                    &mut rev_l,
                    &mut rev_r,
                    &mut cho_l,
                    &mut cho_r,
                );
                now += block_size as f64 / OUTPUT_RATE as f64;
            })
        });
    }
    group.finish();
}

fn bench_process_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("processor_process_by_block_size");
    for &block_size in &[64usize, 256, 1024, 4096] {
        let mut processor = processor_with_voices(32, block_size);
        let mut main_l = vec![0.0f32; block_size];
        let mut main_r = vec![0.0f32; block_size];
        let mut rev_l = vec![0.0f32; block_size];
        let mut rev_r = vec![0.0f32; block_size];
        let mut cho_l = vec![0.0f32; block_size];
        let mut cho_r = vec![0.0f32; block_size];
        let mut now = 1.0;

        group.bench_function(format!("block_{block_size}"), |b| {
            b.iter(|| {
                processor.process(
                    black_box(now),
                    &mut main_l,
                    &mut main_r,
                    &mut rev_l,
                    &mut rev_r,
                    &mut cho_l,
                    &mut cho_r,
                );
                now += block_size as f64 / OUTPUT_RATE as f64;
            })
        });
    }
    group.finish();
}

fn bench_build_voices(c: &mut Criterion) {
    let sample = looping_sample(4096);
    let preset = SingleZonePreset { sample: sample.clone() };
    let mut processor = Processor::new(OUTPUT_RATE, 512).unwrap();
    processor
        .inbound_sender()
        .try_send(InboundEvent::SampleDump {
            sample_id: SAMPLE_ID,
            frames: sample.data.unwrap(),
        })
        .unwrap();
    let mut main_l = vec![0.0f32; 512];
    let mut main_r = vec![0.0f32; 512];
    let mut rev_l = vec![0.0f32; 512];
    let mut rev_r = vec![0.0f32; 512];
    let mut cho_l = vec![0.0f32; 512];
    let mut cho_r = vec![0.0f32; 512];
    processor.process(0.0, &mut main_l, &mut main_r, &mut rev_l, &mut rev_r, &mut cho_l, &mut cho_r);

    c.bench_function("processor_build_voices_cached_hit", |b| {
        b.iter(|| {
            black_box(processor.build_voices(0, 60, 100, &preset, 1.0));
        })
    });
}

criterion_group!(
    processor_benches,
    bench_process_voice_counts,
    bench_process_block_sizes,
    bench_build_voices,
);

criterion_main!(processor_benches);
