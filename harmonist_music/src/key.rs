// Keys and the candidate chord pool derived from them.
//
// A key is a tonic plus a major or minor scale. The scale's step pattern
// fixes the seven "cyclic pitches" (scale degrees) and the triad type sitting
// on each degree; both are computed once at construction.
//
// `Key::get_chords` enumerates the legal gene alphabet for the search: the
// seven diatonic triads, then inversions and position-gated sus variants of
// every non-diminished degree, then optionally one rest chord. The pool is
// deterministic for a given (tonic, scale, allow_rest).

use crate::chord::{Chord, ChordType, Inversion};
use crate::error::{Error, Result};
use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    /// Semitone steps from each degree to the next, wrapping at the octave.
    pub fn steps(self) -> [u8; 7] {
        match self {
            Scale::Major => [2, 2, 1, 2, 2, 2, 1],
            Scale::Minor => [2, 1, 2, 2, 1, 2, 2],
        }
    }

    /// Triad type on each scale degree.
    pub fn triad_types(self) -> [ChordType; 7] {
        use ChordType::*;
        match self {
            Scale::Major => [Major, Minor, Minor, Major, Major, Minor, Diminished],
            Scale::Minor => [Minor, Diminished, Major, Minor, Minor, Major, Major],
        }
    }

    /// A sus2 on a degree needs a whole step above the root.
    pub fn sus2_allowed(self, degree: usize) -> bool {
        self.steps()[degree] != 1
    }

    /// A sus4 is ruled out where the fourth above the root is not perfect
    /// (major: 4th and 7th degrees, minor: 2nd and 6th).
    pub fn sus4_allowed(self, degree: usize) -> bool {
        match self {
            Scale::Major => degree != 3 && degree != 6,
            Scale::Minor => degree != 1 && degree != 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    tonic: PitchClass,
    scale: Scale,
    cyclic_pitches: [PitchClass; 7],
}

impl Key {
    pub fn new(tonic: PitchClass, scale: Scale) -> Self {
        let mut cyclic_pitches = [tonic; 7];
        let mut offset = 0i32;
        for (degree, step) in scale.steps().iter().enumerate() {
            cyclic_pitches[degree] = tonic.transpose(offset);
            offset += *step as i32;
        }
        Key {
            tonic,
            scale,
            cyclic_pitches,
        }
    }

    /// Parse short key notation: a tonic optionally followed by `m`.
    pub fn parse(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        let (tonic, scale) = match trimmed.strip_suffix('m') {
            Some(tonic) => (tonic, Scale::Minor),
            None => (trimmed, Scale::Major),
        };
        let tonic = tonic
            .parse::<PitchClass>()
            .map_err(|_| Error::InvalidKey(name.to_string()))?;
        Ok(Key::new(tonic, scale))
    }

    pub fn tonic(&self) -> PitchClass {
        self.tonic
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// The seven scale-degree pitches, tonic first.
    pub fn cyclic_pitches(&self) -> &[PitchClass; 7] {
        &self.cyclic_pitches
    }

    /// Scale degree (0-6) of a pitch class, or `None` if it is not diatonic.
    pub fn scale_degree(&self, pitch: PitchClass) -> Option<usize> {
        self.cyclic_pitches.iter().position(|&p| p == pitch)
    }

    /// Root-position diatonic triad on a scale degree (0-6).
    pub fn triad(&self, degree: usize) -> Chord {
        let degree = degree % 7;
        Chord::triad(
            self.cyclic_pitches[degree],
            self.scale.triad_types()[degree],
        )
    }

    /// The seven diatonic triads in degree order.
    pub fn diatonic_triads(&self) -> [Chord; 7] {
        std::array::from_fn(|degree| self.triad(degree))
    }

    /// Enumerate the candidate chord pool for this key.
    pub fn get_chords(&self, allow_rest: bool) -> ChordPool {
        let mut chords: Vec<Chord> = self.diatonic_triads().to_vec();
        let types = self.scale.triad_types();
        for degree in 0..7 {
            let root = self.cyclic_pitches[degree];
            let kind = types[degree];
            if kind == ChordType::Diminished {
                continue;
            }
            chords.push(Chord::new(root, kind, Inversion::First));
            chords.push(Chord::new(root, kind, Inversion::Second));
            if self.scale.sus2_allowed(degree) {
                chords.push(Chord::triad(root, ChordType::Sus2));
            }
            if self.scale.sus4_allowed(degree) {
                chords.push(Chord::triad(root, ChordType::Sus4));
            }
        }
        if allow_rest {
            chords.push(Chord::Rest);
        }
        ChordPool { chords }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scale {
            Scale::Major => write!(f, "{}", self.tonic),
            Scale::Minor => write!(f, "{}m", self.tonic),
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Key::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Key::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> String {
        key.to_string()
    }
}

/// The immutable gene alphabet for one key. The first seven entries are
/// always the diatonic triads in degree order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordPool {
    chords: Vec<Chord>,
}

impl ChordPool {
    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn contains(&self, chord: &Chord) -> bool {
        self.chords.contains(chord)
    }

    pub fn base_triads(&self) -> &[Chord] {
        &self.chords[..self.chords.len().min(7)]
    }
}
