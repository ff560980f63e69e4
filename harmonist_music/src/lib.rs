// Harmonist: genetic search for a chord accompaniment to a melody.
//
// Given a monophonic melody, finds one chord per bar so that the chords are
// consonant with the melody, move smoothly, and form familiar progressions.
// The search is a plain generational genetic algorithm over chord sequences
// drawn from the melody's key.
//
// Architecture:
// - pitch.rs: Pitch classes, names and interval arithmetic
// - chord.rs: Chord and accompaniment (chromosome) types
// - key.rs: Keys, scales, diatonic triads and the candidate chord pool
// - melody.rs: Melody events and melody statistics
// - key_detect.rs: Heuristic key classification of a melody
// - fitness.rs: Consonance, repetition and progression scoring
// - selection.rs: Roulette-wheel parent selection without replacement
// - variation.rs: Uniform crossover and per-bar mutation
// - evolution.rs: The generational loop (rayon-parallel scoring and breeding)
// - style.rs: Instrument, octave and volume choices for rendering
// - midi.rs: MIDI import (monophonic melody) and export (melody + chords)
// - config.rs: JSON-loadable run configuration
// - error.rs: Library error type
//
// The search is deterministic given a seed, regardless of thread count.

pub mod chord;
pub mod config;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod key;
pub mod key_detect;
pub mod melody;
pub mod midi;
pub mod pitch;
pub mod selection;
pub mod style;
pub mod variation;

pub use error::{Error, Result};
