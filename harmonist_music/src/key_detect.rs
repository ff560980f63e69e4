// Key classification heuristic.
//
// Scores every plausible major key (and its relative minor) by how well the
// melody's first note, last note and most frequent note line up with the
// key's tonic, dominant, mediant and subdominant. Candidate keys are the
// major scales that cover the melody's pitch set, with some slack for
// melodies that use fewer than seven distinct pitches.

use crate::error::{Error, Result};
use crate::key::{Key, Scale};
use crate::melody::MelodyEvent;
use crate::pitch::PitchClass;
use tracing::{debug, warn};

/// Multipliers for (tonic, dominant, mediant, subdominant).
const LAST_NOTE_WEIGHTS: [f64; 4] = [3.0, 2.5, 2.25, 1.5];
const FIRST_NOTE_WEIGHTS: [f64; 4] = [2.0, 1.75, 1.75, 1.25];
const MOST_USED_WEIGHTS: [f64; 4] = [2.5, 2.0, 1.75, 1.5];

/// Classify a melody's notes into a key.
pub fn detect_key(events: &[MelodyEvent]) -> Result<Key> {
    let pitches: Vec<PitchClass> = events.iter().filter_map(MelodyEvent::pitch).collect();
    let (Some(&first), Some(&last)) = (pitches.first(), pitches.last()) else {
        return Err(Error::EmptyMelody);
    };

    let mut used = [false; 12];
    let mut counts = [0usize; 12];
    let mut appearance: Vec<PitchClass> = Vec::new();
    for &p in &pitches {
        if !used[p.index() as usize] {
            appearance.push(p);
        }
        used[p.index() as usize] = true;
        counts[p.index() as usize] += 1;
    }
    let distinct = appearance.len();
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let most_used = appearance
        .iter()
        .copied()
        .find(|p| counts[p.index() as usize] == max_count)
        .unwrap_or(first);

    let mut candidates: Vec<(Key, f64)> = Vec::new();
    for tonic in PitchClass::ALL {
        if !used[tonic.index() as usize] {
            continue;
        }
        let major = Key::new(tonic, Scale::Major);
        let missing = major
            .cyclic_pitches()
            .iter()
            .filter(|p| !used[p.index() as usize])
            .count();
        if missing == 0 || (distinct < 7 && missing <= 7 - distinct) {
            candidates.push((major, 1.0));
            candidates.push((Key::new(tonic.transpose(9), Scale::Minor), 1.0));
        }
    }

    if candidates.is_empty() {
        let fallback = Key::new(most_used, Scale::Major);
        warn!(key = %fallback, "no scale covers the melody; falling back to the most used pitch");
        return Ok(fallback);
    }

    for (key, weight) in candidates.iter_mut() {
        *weight *= role_weight(key, last, &LAST_NOTE_WEIGHTS);
        *weight *= role_weight(key, first, &FIRST_NOTE_WEIGHTS);
        *weight *= role_weight(key, most_used, &MOST_USED_WEIGHTS);
    }

    let mut best = candidates[0];
    for &candidate in &candidates[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    debug!(key = %best.0, weight = best.1, candidates = candidates.len(), "detected key");
    Ok(best.0)
}

/// Weight for the first role (tonic, dominant, mediant, subdominant) that
/// `pitch` plays in `key`, or 1.0 if it plays none.
fn role_weight(key: &Key, pitch: PitchClass, weights: &[f64; 4]) -> f64 {
    let degrees = key.cyclic_pitches();
    // Tonic, dominant, mediant, subdominant.
    let roles = [degrees[0], degrees[4], degrees[2], degrees[3]];
    roles
        .iter()
        .position(|&r| r == pitch)
        .map_or(1.0, |i| weights[i])
}
