// Variation operators: uniform crossover and per-gene mutation.
//
// Crossover builds a fresh child from two parents, taking each bar's chord
// from either parent with equal probability. Mutation then replaces each bar
// with a uniformly random pool chord at a fixed rate. Mutation is the only
// way a chord absent from the current population can enter it.

use crate::chord::Accompaniment;
use crate::key::ChordPool;
use harmonist_prng::HarmonyRng;

/// Per-bar probability that mutation replaces a chord.
pub const MUTATION_RATE: f64 = 0.13;

/// Uniform gene-wise crossover. The child has the length of the shorter
/// parent (parents of one run always share a length).
pub fn crossover(
    father: &Accompaniment,
    mother: &Accompaniment,
    rng: &mut HarmonyRng,
) -> Accompaniment {
    father
        .chords()
        .iter()
        .zip(mother.chords())
        .map(|(f, m)| if rng.random_bool(0.5) { *f } else { *m })
        .collect()
}

/// Replace each chord with a random pool member with probability `rate`.
/// Mutates in place and hands the same value back.
pub fn mutate(
    mut child: Accompaniment,
    pool: &ChordPool,
    rate: f64,
    rng: &mut HarmonyRng,
) -> Accompaniment {
    for bar in 0..child.len() {
        if rng.random_bool(rate) {
            if let Some(&chord) = rng.choose(pool.chords()) {
                child.replace(bar, chord);
            }
        }
    }
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::{Chord, ChordType};
    use crate::key::Key;
    use crate::pitch::PitchClass;

    fn uniform(root: PitchClass, bars: usize) -> Accompaniment {
        Accompaniment::new(vec![Chord::triad(root, ChordType::Major); bars])
    }

    #[test]
    fn test_crossover_genes_come_from_parents() {
        let father = uniform(PitchClass::C, 32);
        let mother = uniform(PitchClass::G, 32);
        let mut rng = HarmonyRng::new(8);
        let child = crossover(&father, &mother, &mut rng);
        assert_eq!(child.len(), 32);
        let from_father = child
            .chords()
            .iter()
            .filter(|c| c.root() == Some(PitchClass::C))
            .count();
        let from_mother = child
            .chords()
            .iter()
            .filter(|c| c.root() == Some(PitchClass::G))
            .count();
        assert_eq!(from_father + from_mother, 32);
        assert!(from_father > 0 && from_mother > 0, "32 fair coin flips all landed one way");
    }

    #[test]
    fn test_crossover_leaves_parents_untouched() {
        let father = uniform(PitchClass::C, 8);
        let mother = uniform(PitchClass::D, 8);
        let before = (father.clone(), mother.clone());
        let mut rng = HarmonyRng::new(2);
        let _child = crossover(&father, &mother, &mut rng);
        assert_eq!((father, mother), before);
    }

    #[test]
    fn test_mutation_rate_one_replaces_every_gene() {
        // A pool that cannot contain the original chord.
        let pool = Key::parse("C").unwrap().get_chords(false);
        let child = uniform(PitchClass::CSharp, 16);
        let mut rng = HarmonyRng::new(4);
        let mutated = mutate(child, &pool, 1.0, &mut rng);
        assert_eq!(mutated.len(), 16);
        for chord in mutated.chords() {
            assert!(pool.contains(chord), "{chord} is not a pool member");
        }
    }

    #[test]
    fn test_mutation_rate_zero_is_identity() {
        let pool = Key::parse("C").unwrap().get_chords(true);
        let child = uniform(PitchClass::CSharp, 16);
        let mut rng = HarmonyRng::new(4);
        assert_eq!(mutate(child.clone(), &pool, 0.0, &mut rng), child);
    }
}
