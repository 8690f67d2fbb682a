//! Chunk planning, recombination and stem mixing throughput

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array1;
use remaster::audio::{AudioFormat, WavAudio, mix_stems};
use remaster::pipeline::{chunker, recombiner};
use std::path::Path;

fn synth_mono(seconds: usize, sample_rate: u32) -> WavAudio {
    let frames = seconds * sample_rate as usize;
    let samples: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.001).sin() * 0.5).collect();
    WavAudio::new_mono(sample_rate, Array1::from(samples), AudioFormat::Float32)
}

fn bench_chunk_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");
    let audio = synth_mono(300, 44_100); // 5 minutes

    group.bench_function("plan_5min_10s_chunks", |b| {
        b.iter(|| {
            let plan = chunker::plan(black_box(&audio), Path::new("bench.wav"), 10.0).unwrap();
            black_box(plan.len());
        });
    });

    group.bench_function("slice_and_concat_5min", |b| {
        let plan = chunker::plan(&audio, Path::new("bench.wav"), 10.0).unwrap();
        b.iter(|| {
            let chunks: Vec<WavAudio> = plan
                .chunks
                .iter()
                .map(|chunk| {
                    WavAudio::from_data(
                        audio.sample_rate(),
                        audio
                            .data()
                            .slice_frames(chunk.start_frame, chunk.end_frame),
                        audio.format(),
                    )
                })
                .collect();
            let joined = recombiner::concat_chunks(black_box(&chunks)).unwrap();
            black_box(joined.frames());
        });
    });

    group.finish();
}

fn bench_stem_mixing(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixing");
    group.sample_size(20);

    let stems: Vec<(String, WavAudio)> = ["vocals", "drums", "bass", "other"]
        .iter()
        .map(|name| (name.to_string(), synth_mono(60, 44_100)))
        .collect();

    group.bench_function("mix_four_stems_1min", |b| {
        b.iter(|| {
            let mixed = mix_stems(black_box(&stems)).unwrap();
            black_box(mixed.frames());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chunk_planning, bench_stem_mixing);
criterion_main!(benches);
