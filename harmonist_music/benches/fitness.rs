//! Benchmarks for the search hot path.
//!
//! Run with: cargo bench -p harmonist_music
//!
//! Benchmark groups:
//!   - fitness/*     Scoring a whole population (sequential and rayon)
//!   - evolution/*   One full generation: selection, breeding, scoring, truncation

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use harmonist_music::chord::Accompaniment;
use harmonist_music::evolution::{Evolution, EvolutionConfig};
use harmonist_music::fitness::{FitnessEvaluator, FitnessWeights};
use harmonist_music::key::Key;
use harmonist_music::melody::{Melody, MelodyEvent};
use harmonist_music::pitch::PitchClass;
use harmonist_prng::HarmonyRng;
use rayon::prelude::*;
use std::hint::black_box;

/// A 32-bar C major melody, four eighth notes per bar.
fn melody() -> Melody {
    let scale = Key::parse("C").unwrap();
    let mut rng = HarmonyRng::new(3);
    let events = (0..128)
        .map(|i| {
            let pitch = *rng.choose(scale.cyclic_pitches()).unwrap();
            MelodyEvent::note(pitch, 4, 80, i as f64 * 0.25, 0.25)
        })
        .collect();
    Melody::new(events, scale).unwrap()
}

fn population(melody: &Melody, size: usize) -> Vec<Accompaniment> {
    let pool = melody.key().get_chords(false);
    let mut rng = HarmonyRng::new(11);
    (0..size)
        .map(|_| {
            (0..melody.size_in_bars())
                .map(|_| *rng.choose(pool.chords()).unwrap())
                .collect()
        })
        .collect()
}

fn bench_fitness(c: &mut Criterion) {
    let melody = melody();
    let evaluator = FitnessEvaluator::new(&melody, FitnessWeights::default());
    let population = population(&melody, 1000);

    let mut group = c.benchmark_group("fitness");
    group.bench_function("population_1000_sequential", |b| {
        b.iter(|| {
            let scores: Vec<f64> = population.iter().map(|a| evaluator.evaluate(a)).collect();
            black_box(scores)
        })
    });
    group.bench_function("population_1000_parallel", |b| {
        b.iter(|| {
            let scores: Vec<f64> = population
                .par_iter()
                .map(|a| evaluator.evaluate(a))
                .collect();
            black_box(scores)
        })
    });
    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let melody = melody();
    let config = EvolutionConfig {
        generations: 1,
        seed: Some(1),
        ..Default::default()
    };

    let mut group = c.benchmark_group("evolution");
    group.sample_size(20);
    group.bench_function("generation_1000", |b| {
        b.iter_batched(
            || {
                let mut evolution =
                    Evolution::new(&melody, config.clone(), FitnessWeights::default()).unwrap();
                evolution.initialize().unwrap();
                evolution
            },
            |mut evolution| black_box(evolution.step().unwrap()),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_fitness, bench_generation);
criterion_main!(benches);
