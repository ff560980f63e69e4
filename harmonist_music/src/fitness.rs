// Fitness model: how well one accompaniment fits the melody.
//
// The score is a weighted sum of three layers:
//
// Consonance (weight 1): every melody event overlapping a bar is compared
//   with the bar's chord, scaled by how long it overlaps. Unison, fifth and
//   fourth earn the most; thirds and sixths a little; seconds and sevenths a
//   token amount; the sharp dissonances nothing. A rest chord under a
//   sounding note is penalized and a rest chord under a melody rest earns a
//   small bonus. The layer is floored at 1 so selection weights stay positive.
// Repetition (weight 25): a chord doubled with a neighbour earns a point per
//   bar, but runs longer than two stop earning in their middle bars.
// Progression (weight 5): every 4-bar window of diatonic triads whose degree
//   pattern is a known progression earns a flat bonus. Windows overlap and
//   their bonuses add.
//
// Evaluation is a pure function of (accompaniment, melody), so the loop can
// score a population in parallel and cache results between generations.

use crate::chord::{Accompaniment, Chord};
use crate::error::{Error, Result};
use crate::melody::{Melody, Sound};
use serde::{Deserialize, Serialize};

/// Scale-degree patterns (0 = tonic) recognised as progressions.
pub const PROGRESSIONS: [[usize; 4]; 11] = [
    [0, 0, 0, 0],
    [0, 3, 4, 4],
    [0, 0, 3, 4],
    [0, 3, 0, 4],
    [0, 3, 4, 3],
    [0, 3, 4, 0],
    [0, 5, 1, 4],
    [3, 3, 0, 0],
    [4, 4, 0, 0],
    [5, 3, 0, 4],
    [0, 5, 3, 4],
];

/// Layer weights and per-interval rewards. Defaults are the tuned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub consonance: f64,
    pub repetition: f64,
    pub progression: f64,

    /// Flat reward per matching 4-bar window (before `progression`).
    pub progression_bonus: f64,
    /// Per bar of sounding melody over a rest chord.
    pub rest_penalty: f64,
    /// Per bar of melody rest over a rest chord.
    pub rest_match_bonus: f64,

    /// Unison, fifth and fourth earn 3x, 2x and 1x this per bar.
    pub strong_consonance: f64,
    /// Thirds and sixths.
    pub mild_consonance: f64,
    /// Major second and minor seventh.
    pub mild_dissonance: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        FitnessWeights {
            consonance: 1.0,
            repetition: 25.0,
            progression: 5.0,

            progression_bonus: 100.0,
            rest_penalty: 10.0,
            rest_match_bonus: 1.0,

            strong_consonance: 5.0,
            mild_consonance: 1.0,
            mild_dissonance: 0.1,
        }
    }
}

impl FitnessWeights {
    /// Every weight must be finite and non-negative. `consonance` must be
    /// positive so the consonance floor keeps every total above zero.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("consonance", self.consonance),
            ("repetition", self.repetition),
            ("progression", self.progression),
            ("progression_bonus", self.progression_bonus),
            ("rest_penalty", self.rest_penalty),
            ("rest_match_bonus", self.rest_match_bonus),
            ("strong_consonance", self.strong_consonance),
            ("mild_consonance", self.mild_consonance),
            ("mild_dissonance", self.mild_dissonance),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Config(format!(
                    "weight {name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.consonance == 0.0 {
            return Err(Error::Config("weight consonance must be positive".into()));
        }
        Ok(())
    }

    /// Reward per bar of overlap for a chord-to-melody interval (0-11).
    fn interval_reward(&self, interval: u8) -> f64 {
        match interval {
            0 => self.strong_consonance * 3.0,
            7 => self.strong_consonance * 2.0,
            5 => self.strong_consonance,
            4 | 3 | 9 | 8 => self.mild_consonance,
            2 | 10 => self.mild_dissonance,
            // 11, 1, 6
            _ => 0.0,
        }
    }
}

/// Weighted layer values for one accompaniment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    pub consonance: f64,
    pub repetition: f64,
    pub progression: f64,
    pub total: f64,
}

/// Scores accompaniments against one melody.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator<'a> {
    melody: &'a Melody,
    triads: [Chord; 7],
    weights: FitnessWeights,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(melody: &'a Melody, weights: FitnessWeights) -> Self {
        FitnessEvaluator {
            melody,
            triads: melody.key().diatonic_triads(),
            weights,
        }
    }

    /// Total fitness. Higher is better.
    pub fn evaluate(&self, accompaniment: &Accompaniment) -> f64 {
        self.breakdown(accompaniment).total
    }

    pub fn breakdown(&self, accompaniment: &Accompaniment) -> FitnessBreakdown {
        let w = &self.weights;
        let consonance = w.consonance * consonance_score(accompaniment, self.melody, w);
        let repetition = w.repetition * repetition_score(accompaniment);
        let progression =
            w.progression * progression_score(accompaniment, &self.triads, w.progression_bonus);
        FitnessBreakdown {
            consonance,
            repetition,
            progression,
            total: consonance + repetition + progression,
        }
    }
}

/// Unweighted consonance layer, floored at 1.
pub fn consonance_score(
    accompaniment: &Accompaniment,
    melody: &Melody,
    weights: &FitnessWeights,
) -> f64 {
    let mut score = 0.0;
    for (bar, chord) in accompaniment.chords().iter().enumerate() {
        let bar_start = bar as f64;
        let bar_end = bar_start + 1.0;
        let notes = chord.note_names();
        for event in melody.events() {
            // Events are sorted by onset.
            if event.start >= bar_end {
                break;
            }
            let overlap = event.overlap(bar_start, bar_end);
            if overlap <= 0.0 {
                continue;
            }
            match (event.sound, notes) {
                (Sound::Note { pitch, .. }, Some(chord_notes)) => {
                    for chord_pitch in chord_notes {
                        score += weights.interval_reward(chord_pitch.interval_to(pitch)) * overlap;
                    }
                }
                (Sound::Note { .. }, None) => score -= weights.rest_penalty * overlap,
                (Sound::Rest, None) => score += weights.rest_match_bonus * overlap,
                (Sound::Rest, Some(_)) => {}
            }
        }
    }
    score.max(1.0)
}

/// Unweighted repetition layer.
///
/// Each bar earns one point for a repeat on one side. A bar repeated on both
/// sides gives the second point back, so the middle of a run earns nothing.
pub fn repetition_score(accompaniment: &Accompaniment) -> f64 {
    let chords = accompaniment.chords();
    let mut total = 0i64;
    for i in 0..chords.len() {
        let mut bonus = 0i64;
        if i > 0 && chords[i - 1].repeats(&chords[i]) {
            bonus += 1;
        }
        if i + 1 < chords.len() && chords[i].repeats(&chords[i + 1]) {
            if bonus > 0 {
                bonus -= 1;
            } else {
                bonus += 1;
            }
        }
        total += bonus;
    }
    total as f64
}

/// Unweighted progression layer: `bonus` per matching 4-bar window.
///
/// A bar counts only when its chord is one of the key's diatonic triads (in
/// any inversion); sus chords and rests break the window.
pub fn progression_score(accompaniment: &Accompaniment, triads: &[Chord; 7], bonus: f64) -> f64 {
    let degrees: Vec<Option<usize>> = accompaniment
        .chords()
        .iter()
        .map(|chord| triads.iter().position(|t| t.same_harmony(chord)))
        .collect();
    let mut score = 0.0;
    for window in degrees.windows(4) {
        let Some(pattern) = window_pattern(window) else {
            continue;
        };
        if PROGRESSIONS.contains(&pattern) {
            score += bonus;
        }
    }
    score
}

fn window_pattern(window: &[Option<usize>]) -> Option<[usize; 4]> {
    let mut pattern = [0; 4];
    for (slot, degree) in pattern.iter_mut().zip(window) {
        *slot = (*degree)?;
    }
    Some(pattern)
}
