// Chords and accompaniments (the search's genes and chromosomes).
//
// A chord is either silence for one bar or a three-note chord built from a
// root, a type (major, minor, diminished, sus2, sus4) and an inversion. The
// three notes are pitch classes plus an octave offset relative to the chord's
// rendering octave; inversion is encoded by raising the lowest one or two
// notes by an octave, so inversions never change pitch-class content.
//
// An `Accompaniment` is an owned sequence of chords, one per bar. Children
// are always built as fresh values; crossover and mutation never alias a
// parent's storage.

use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Triad type. The rest "type" is modelled by `Chord::Rest` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Sus2,
    Sus4,
}

impl ChordType {
    /// Semitone offsets of the three notes above the root.
    pub fn offsets(self) -> [u8; 3] {
        match self {
            ChordType::Major => [0, 4, 7],
            ChordType::Minor => [0, 3, 7],
            ChordType::Sus2 => [0, 2, 7],
            ChordType::Sus4 => [0, 5, 7],
            ChordType::Diminished => [0, 3, 6],
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ChordType::Major => "",
            ChordType::Minor => "m",
            ChordType::Diminished => "dim",
            ChordType::Sus2 => "sus2",
            ChordType::Sus4 => "sus4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inversion {
    Root,
    First,
    Second,
}

impl Inversion {
    pub fn number(self) -> u8 {
        match self {
            Inversion::Root => 0,
            Inversion::First => 1,
            Inversion::Second => 2,
        }
    }

    /// Number of low notes raised by an octave.
    fn raised_notes(self) -> usize {
        self.number() as usize
    }
}

/// One constituent note of a sounding chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordNote {
    pub pitch: PitchClass,
    /// Octaves above the chord's base rendering octave (0, 1 or 2).
    pub octave_offset: u8,
}

/// One bar of accompaniment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chord {
    /// Silence for the whole bar.
    Rest,
    Sounding {
        root: PitchClass,
        kind: ChordType,
        inversion: Inversion,
    },
}

impl Chord {
    pub fn new(root: PitchClass, kind: ChordType, inversion: Inversion) -> Self {
        Chord::Sounding {
            root,
            kind,
            inversion,
        }
    }

    /// Root-position chord.
    pub fn triad(root: PitchClass, kind: ChordType) -> Self {
        Chord::new(root, kind, Inversion::Root)
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Chord::Rest)
    }

    pub fn root(&self) -> Option<PitchClass> {
        match *self {
            Chord::Rest => None,
            Chord::Sounding { root, .. } => Some(root),
        }
    }

    pub fn kind(&self) -> Option<ChordType> {
        match *self {
            Chord::Rest => None,
            Chord::Sounding { kind, .. } => Some(kind),
        }
    }

    /// The three notes of a sounding chord in root, third, fifth order; `None`
    /// for a rest.
    pub fn notes(&self) -> Option<[ChordNote; 3]> {
        let Chord::Sounding {
            root,
            kind,
            inversion,
        } = *self
        else {
            return None;
        };
        let offsets = kind.offsets();
        let mut notes = [ChordNote {
            pitch: root,
            octave_offset: 0,
        }; 3];
        for (i, &offset) in offsets.iter().enumerate() {
            let wraps = root.index() + offset >= 12;
            let raised = i < inversion.raised_notes();
            notes[i] = ChordNote {
                pitch: root.transpose(offset as i32),
                octave_offset: u8::from(wraps) + u8::from(raised),
            };
        }
        Some(notes)
    }

    /// Pitch classes of the chord's notes in chord order.
    pub fn note_names(&self) -> Option<[PitchClass; 3]> {
        self.notes().map(|notes| notes.map(|n| n.pitch))
    }

    /// True when both chords sound the same note names. Rests never repeat.
    pub fn repeats(&self, other: &Chord) -> bool {
        match (self.note_names(), other.note_names()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// True when both chords share root and type, ignoring inversion.
    pub fn same_harmony(&self, other: &Chord) -> bool {
        match (self, other) {
            (
                Chord::Sounding {
                    root: ra, kind: ka, ..
                },
                Chord::Sounding {
                    root: rb, kind: kb, ..
                },
            ) => ra == rb && ka == kb,
            _ => false,
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chord::Rest => f.write_str("rest"),
            Chord::Sounding {
                root,
                kind,
                inversion,
            } => {
                write!(f, "{}{}", root, kind.suffix())?;
                match inversion {
                    Inversion::Root => Ok(()),
                    inv => write!(f, "/{}", inv.number()),
                }
            }
        }
    }
}

/// A chromosome: one chord per bar of the melody.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accompaniment {
    chords: Vec<Chord>,
}

impl Accompaniment {
    pub fn new(chords: Vec<Chord>) -> Self {
        Accompaniment { chords }
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Replace the whole chord at `bar`. Panics if `bar` is out of range.
    pub fn replace(&mut self, bar: usize, chord: Chord) {
        self.chords[bar] = chord;
    }
}

impl FromIterator<Chord> for Accompaniment {
    fn from_iter<I: IntoIterator<Item = Chord>>(iter: I) -> Self {
        Accompaniment::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Accompaniment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chord) in self.chords.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{chord}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PitchClass::*;

    #[test]
    fn test_triad_notes() {
        let c = Chord::triad(C, ChordType::Major);
        assert_eq!(c.note_names(), Some([C, E, G]));
        let am = Chord::triad(A, ChordType::Minor);
        assert_eq!(am.note_names(), Some([A, C, E]));
        let bdim = Chord::triad(B, ChordType::Diminished);
        assert_eq!(bdim.note_names(), Some([B, D, F]));
        assert_eq!(Chord::Rest.notes(), None);
    }

    #[test]
    fn test_wrapped_notes_sit_an_octave_up() {
        // A minor: C and E are above B, so they belong to the next octave.
        let am = Chord::triad(A, ChordType::Minor).notes().unwrap();
        let offsets: Vec<u8> = am.iter().map(|n| n.octave_offset).collect();
        assert_eq!(offsets, vec![0, 1, 1]);
    }

    #[test]
    fn test_inversions_raise_low_notes() {
        let first = Chord::new(C, ChordType::Major, Inversion::First).notes().unwrap();
        assert_eq!(first.map(|n| n.octave_offset), [1, 0, 0]);
        let second = Chord::new(C, ChordType::Major, Inversion::Second).notes().unwrap();
        assert_eq!(second.map(|n| n.octave_offset), [1, 1, 0]);
    }

    #[test]
    fn test_repeats_ignores_inversion_and_rests() {
        let c = Chord::triad(C, ChordType::Major);
        let c1 = Chord::new(C, ChordType::Major, Inversion::First);
        assert!(c.repeats(&c1));
        assert!(!c.repeats(&Chord::triad(C, ChordType::Minor)));
        assert!(!Chord::Rest.repeats(&Chord::Rest));
    }

    #[test]
    fn test_display() {
        assert_eq!(Chord::triad(FSharp, ChordType::Minor).to_string(), "F#m");
        assert_eq!(
            Chord::new(G, ChordType::Major, Inversion::Second).to_string(),
            "G/2"
        );
        assert_eq!(Chord::triad(D, ChordType::Sus4).to_string(), "Dsus4");
        assert_eq!(Chord::Rest.to_string(), "rest");
        let acc: Accompaniment = vec![Chord::triad(C, ChordType::Major), Chord::Rest]
            .into_iter()
            .collect();
        assert_eq!(acc.to_string(), "C | rest");
    }
}
