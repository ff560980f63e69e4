// End-to-end tests: melody in, accompaniment out.
//
// These drive the same path as the `accompany` binary (key detection, the
// full generational loop, MIDI rendering and re-import) with populations
// small enough for debug builds.

use harmonist_music::chord::Accompaniment;
use harmonist_music::config::GeneratorConfig;
use harmonist_music::evolution::{Evolution, EvolutionConfig, Phase};
use harmonist_music::fitness::{FitnessWeights, progression_score};
use harmonist_music::melody::{Melody, MelodyEvent};
use harmonist_music::midi::{ImportOptions, parse_melody, read_melody, render, write_midi};
use harmonist_music::pitch::PitchClass::{self, *};
use harmonist_music::style::Style;

/// Four bars of arpeggios outlining C, Am, F and G.
fn c_am_f_g() -> Melody {
    let bars: [[PitchClass; 3]; 4] = [[C, E, G], [A, C, E], [F, A, C], [G, B, D]];
    let mut events = Vec::new();
    for (bar, notes) in bars.iter().enumerate() {
        for (i, &pitch) in notes.iter().enumerate() {
            events.push(MelodyEvent::note(
                pitch,
                4,
                80,
                bar as f64 + i as f64 / 3.0,
                1.0 / 3.0,
            ));
        }
    }
    Melody::with_detected_key(events).unwrap()
}

fn config(seed: u64, generations: usize, population_size: usize) -> EvolutionConfig {
    EvolutionConfig {
        generations,
        population_size,
        new_members_percentage: 30,
        seed: Some(seed),
        ..Default::default()
    }
}

#[test]
fn arpeggios_are_detected_in_c_major() {
    assert_eq!(c_am_f_g().key().to_string(), "C");
}

#[test]
fn converges_to_a_known_progression() {
    let melody = c_am_f_g();
    let triads = melody.key().diatonic_triads();
    let mut converged = 0;
    for seed in [1, 2, 3] {
        let best = Evolution::new(&melody, config(seed, 50, 100), FitnessWeights::default())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(best.accompaniment.len(), 4);
        if progression_score(&best.accompaniment, &triads, 100.0) >= 100.0 {
            converged += 1;
        }
    }
    assert!(converged >= 2, "only {converged} of 3 runs found a progression");
}

#[test]
fn population_size_is_invariant() {
    let melody = c_am_f_g();
    for (size, percentage) in [(10, 50), (33, 30), (50, 0), (64, 1)] {
        let config = EvolutionConfig {
            new_members_percentage: percentage,
            ..config(9, 5, size)
        };
        let mut evolution = Evolution::new(&melody, config, FitnessWeights::default()).unwrap();
        evolution.initialize().unwrap();
        assert_eq!(evolution.population().len(), size);
        while evolution.phase() != Phase::Terminal {
            evolution.step().unwrap();
            assert_eq!(evolution.population().len(), size);
        }
    }
}

#[test]
fn seed_reproduces_the_run() {
    let melody = c_am_f_g();
    let run = |seed| {
        let mut evolution =
            Evolution::new(&melody, config(seed, 20, 60), FitnessWeights::default()).unwrap();
        let best = evolution.run().unwrap();
        (best, evolution.fitnesses().to_vec())
    };
    let (a, fitnesses_a) = run(77);
    let (b, fitnesses_b) = run(77);
    assert_eq!(a, b);
    assert_eq!(fitnesses_a, fitnesses_b);
}

#[test]
fn rest_chords_only_with_permission() {
    let melody = c_am_f_g();
    let without = Evolution::new(&melody, config(1, 1, 10), FitnessWeights::default()).unwrap();
    assert!(without.pool().chords().iter().all(|c| !c.is_rest()));

    let allowed = EvolutionConfig {
        allow_rest_chords: true,
        ..config(1, 1, 10)
    };
    let with = Evolution::new(&melody, allowed, FitnessWeights::default()).unwrap();
    assert_eq!(with.pool().chords().iter().filter(|c| c.is_rest()).count(), 1);
}

#[test]
fn invalid_config_fails_before_search() {
    let melody = c_am_f_g();
    let config = EvolutionConfig {
        new_members_percentage: 80,
        ..config(1, 10, 10)
    };
    assert!(Evolution::new(&melody, config, FitnessWeights::default()).is_err());
}

#[test]
fn midi_round_trip_through_file() {
    let melody = c_am_f_g();
    let best = Evolution::new(&melody, config(5, 10, 40), FitnessWeights::default())
        .unwrap()
        .run()
        .unwrap();

    let path = std::env::temp_dir().join(format!("harmonist-e2e-{}.mid", std::process::id()));
    let options = ImportOptions::default();
    write_midi(&path, &melody, &best.accompaniment, Style::Orchestra, &options, 600_000).unwrap();
    let track = read_melody(&path, &options);
    std::fs::remove_file(&path).ok();
    let track = track.unwrap();

    assert_eq!(track.tempo, 600_000);
    assert_eq!(track.events.len(), melody.events().len());
    for (read, original) in track.events.iter().zip(melody.events()) {
        assert_eq!(read.sound, original.sound);
        assert!((read.start - original.start).abs() < 1e-2);
        assert!((read.duration - original.duration).abs() < 1e-2);
    }
    let reread = Melody::with_detected_key(track.events).unwrap();
    assert_eq!(reread.key(), melody.key());
    assert_eq!(reread.size_in_bars(), 4);
}

#[test]
fn rendered_chord_track_has_one_chord_per_bar() {
    let melody = c_am_f_g();
    let accompaniment: Accompaniment = melody.key().diatonic_triads()[..4].iter().copied().collect();
    let config = GeneratorConfig::default();
    let smf = render(
        &melody,
        &accompaniment,
        config.style,
        &config.import_options(),
        500_000,
    );
    assert_eq!(smf.tracks.len(), 3);

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    // The melody track comes first, so import ignores the chord track.
    let track = parse_melody(&bytes, &config.import_options()).unwrap();
    assert_eq!(track.events.len(), 12);
}
